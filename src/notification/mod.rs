//! Notification model and the platform notification service seam.

pub mod format;
pub mod memory;

#[cfg(all(unix, not(target_os = "macos")))]
pub mod desktop;

pub use memory::{MemoryNotifications, ServiceCall};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;

/// Platform handle of a published notification
pub type NotificationId = u32;

/// Category of persistent new-mail notifications
pub const CATEGORY_MESSAGE: &str = "x-mailbox.email";
/// Category of transient new-mail banners
pub const CATEGORY_SUMMARY: &str = "x-mailbox.email.summary";
/// Category of send-failure notifications
pub const CATEGORY_ERROR: &str = "x-mailbox.email.error";

/// Encoded group key of a message notification
pub const HINT_GROUP: &str = "x-mailbox.email.published-group";
/// Comma separated message ids covered by a message notification
pub const HINT_MESSAGE_IDS: &str = "x-mailbox.email.published-message-ids";
/// Account id of a send-failure notification
pub const HINT_SEND_FAILED_ACCOUNT: &str = "x-mailbox.email.send-failed-account";
/// Marks a notification the service does not keep after display
pub const HINT_TRANSIENT: &str = "transient";

/// D-Bus style endpoint of the mail UI, target of remote actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiEndpoint {
    pub service: String,
    pub path: String,
    pub interface: String,
}

impl Default for UiEndpoint {
    fn default() -> Self {
        Self {
            service: "org.mailbox.ui".to_string(),
            path: "/org/mailbox/ui".to_string(),
            interface: "org.mailbox.ui".to_string(),
        }
    }
}

impl UiEndpoint {
    /// Bind a method of the mail UI to a notification action
    pub fn action(&self, name: &str, method: &str, arguments: Vec<u64>) -> RemoteAction {
        RemoteAction {
            name: name.to_string(),
            display_name: String::new(),
            service: self.service.clone(),
            path: self.path.clone(),
            interface: self.interface.clone(),
            method: method.to_string(),
            arguments,
        }
    }
}

/// Remote call invoked when the user activates a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAction {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub service: String,
    pub path: String,
    pub interface: String,
    pub method: String,
    #[serde(default)]
    pub arguments: Vec<u64>,
}

/// A notification, either about to be published or as held by the service.
///
/// `id` is the replace-id: `None` asks the service for a new notification,
/// `Some` updates that notification in place.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Notification {
    pub id: Option<NotificationId>,
    pub app_name: String,
    pub category: String,
    pub summary: String,
    pub body: String,
    pub preview_summary: String,
    pub preview_body: String,
    pub icon: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub item_count: u32,
    pub hints: BTreeMap<String, String>,
    pub remote_actions: Vec<RemoteAction>,
}

impl Notification {
    pub fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
            ..Default::default()
        }
    }

    pub fn hint(&self, key: &str) -> Option<&str> {
        self.hints.get(key).map(String::as_str)
    }

    pub fn set_hint(&mut self, key: &str, value: impl Into<String>) {
        self.hints.insert(key.to_string(), value.into());
    }

    pub fn is_transient(&self) -> bool {
        self.hint(HINT_TRANSIENT) == Some("true")
    }
}

/// Platform notification service.
///
/// Implementations only expose notifications published by this process (or
/// a previous instance of it), never those of other applications.
pub trait NotificationService {
    /// Publish or replace a notification, returning its id.
    fn publish(&mut self, notification: &Notification) -> Result<NotificationId>;

    /// Close a published notification.
    fn close(&mut self, id: NotificationId) -> Result<()>;

    /// Currently live notifications, each with `id` set.
    fn notifications(&self) -> Result<Vec<Notification>>;
}
