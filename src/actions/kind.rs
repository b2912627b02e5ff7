//! Sync action kinds and activity states

use serde::{Deserialize, Serialize};

/// Opaque identifier of a sync action
pub type ActionId = u64;

/// Type of request a sync action serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    AcknowledgeNewMessages,
    TransmitMessages,
    RetrieveFolderList,
    RetrieveMessageList,
    RetrieveMessages,
    RetrieveMessagePart,
    RetrieveMessageRange,
    RetrieveMessagePartRange,
    RetrieveAll,
    ExportUpdates,
    Synchronize,
    CopyMessages,
    MoveMessages,
    FlagMessages,
    CreateFolder,
    RenameFolder,
    DeleteFolder,
    CancelTransfer,
    DeleteMessages,
    SearchMessages,
    CancelSearch,
    ListActions,
    ProtocolRequest,
    RetrieveNewMessages,
}

impl RequestKind {
    /// Long running sync operations the user should hear about.
    ///
    /// Quick bookkeeping (exporting updates, flags) and fetches that only run
    /// while the mail UI is open (message parts, inline images) are left out.
    pub fn is_notification_worthy(self) -> bool {
        matches!(
            self,
            RequestKind::TransmitMessages
                | RequestKind::RetrieveFolderList
                | RequestKind::RetrieveMessageList
                | RequestKind::RetrieveMessages
                | RequestKind::RetrieveMessageRange
                | RequestKind::RetrieveAll
                | RequestKind::Synchronize
                | RequestKind::RetrieveNewMessages
        )
    }

    /// Human readable description for logs
    pub fn description(self) -> &'static str {
        match self {
            RequestKind::AcknowledgeNewMessages => "Acknowledging new messages",
            RequestKind::TransmitMessages => "Transmitting new messages",
            RequestKind::RetrieveFolderList => "Retrieving a list of folders",
            RequestKind::RetrieveMessageList => "Retrieving a list of messages",
            RequestKind::RetrieveMessages => "Retrieving messages",
            RequestKind::RetrieveMessagePart => "Retrieving part of a message",
            RequestKind::RetrieveMessageRange => "Retrieving a range of messages",
            RequestKind::RetrieveMessagePartRange => "Retrieving parts of a message",
            RequestKind::RetrieveAll => "Retrieving everything",
            RequestKind::ExportUpdates => "Exporting updates",
            RequestKind::Synchronize => "Synchronizing",
            RequestKind::CopyMessages => "Copying messages",
            RequestKind::MoveMessages => "Moving messages",
            RequestKind::FlagMessages => "Flagging messages",
            RequestKind::CreateFolder => "Creating a folder",
            RequestKind::RenameFolder => "Renaming a folder",
            RequestKind::DeleteFolder => "Deleting a folder",
            RequestKind::CancelTransfer => "Cancelling a transfer",
            RequestKind::DeleteMessages => "Deleting messages",
            RequestKind::SearchMessages => "Searching",
            RequestKind::CancelSearch => "Cancelling search",
            RequestKind::ListActions => "Listing actions",
            RequestKind::ProtocolRequest => "Direct protocol request",
            RequestKind::RetrieveNewMessages => "Retrieving new messages",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Activity reported by a running action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Pending,
    InProgress,
    Successful,
    Failed,
}

/// Action as listed by the action facility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSnapshot {
    pub id: ActionId,
    pub kind: RequestKind,
}
