//! Messages eligible for notification

use chrono::{DateTime, Utc};

use crate::store::{AccountId, MessageId, MessageMeta};

/// Notification-relevant view of an eligible message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishableMessage {
    pub id: MessageId,
    pub account_id: AccountId,
    /// Sender display name, may be empty
    pub sender: String,
    /// Lowercased sender address
    pub origin: String,
    pub subject: String,
    pub timestamp: DateTime<Utc>,
}

impl PublishableMessage {
    pub fn from_meta(meta: &MessageMeta) -> Self {
        Self {
            id: meta.id,
            account_id: meta.account_id,
            sender: meta.from_name.clone(),
            origin: meta.from_address.to_lowercase(),
            subject: meta.subject.clone(),
            timestamp: meta.date,
        }
    }

    /// Name to show for the sender, falling back to the address
    pub fn display_sender(&self) -> &str {
        if self.sender.is_empty() {
            &self.origin
        } else {
            &self.sender
        }
    }
}
