//! Mail store collaborator: message metadata, accounts and lookup.

pub mod accounts;
pub mod memory;

pub use accounts::{AccountProperties, AccountsCache};
pub use memory::SnapshotStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a message in the mail store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a mail account. Zero is never a valid account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl AccountId {
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of message held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Email,
    Sms,
    Mms,
    Instant,
    System,
}

/// Status bits relevant to notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MessageStatus {
    pub read: bool,
    pub temporary: bool,
    pub trash: bool,
    /// Set by the sync engine on old mail that must not be announced
    pub no_notification: bool,
    /// Message is queued for sending
    pub outbox: bool,
}

/// Message metadata as reported by the mail store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMeta {
    pub id: MessageId,
    pub account_id: AccountId,
    #[serde(default)]
    pub from_name: String,
    #[serde(default)]
    pub from_address: String,
    #[serde(default)]
    pub subject: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub status: MessageStatus,
}

impl MessageMeta {
    /// Whether a notification should be shown for this message.
    ///
    /// Only unread emails that are neither temporary, trashed nor explicitly
    /// suppressed qualify.
    pub fn is_eligible(&self) -> bool {
        self.message_type == MessageType::Email
            && !self.status.read
            && !self.status.temporary
            && !self.status.trash
            && !self.status.no_notification
    }

    /// Queued for sending and not deleted
    pub fn is_queued(&self) -> bool {
        self.status.outbox && !self.status.trash
    }
}

/// Account as reported by the account manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: AccountId,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Synchronous view of the mail store.
pub trait MailStore {
    /// Look up message metadata by id.
    fn message(&self, id: MessageId) -> Option<MessageMeta>;

    /// Enabled email accounts.
    fn enabled_accounts(&self) -> Vec<AccountId>;

    /// Account details by id.
    fn account(&self, id: AccountId) -> Option<AccountRecord>;

    /// Number of messages waiting in the outbox of an account (trash excluded).
    fn count_queued(&self, account: AccountId) -> usize;
}
