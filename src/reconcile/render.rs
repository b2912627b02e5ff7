//! Rendering of notification content

use std::collections::BTreeSet;

use super::grouping::{format_message_ids, GroupKey};
use super::message::PublishableMessage;
use crate::notification::format::{self, MAX_SUBJECT_CHARS};
use crate::notification::{
    Notification, NotificationId, RemoteAction, UiEndpoint, CATEGORY_ERROR, CATEGORY_MESSAGE,
    CATEGORY_SUMMARY, HINT_GROUP, HINT_MESSAGE_IDS, HINT_SEND_FAILED_ACCOUNT, HINT_TRANSIENT,
};
use crate::store::{AccountId, AccountProperties};

/// Builds notifications from message groups
#[derive(Debug, Clone)]
pub struct Renderer {
    pub endpoint: UiEndpoint,
    pub app_name: String,
    pub error_app_name: String,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            endpoint: UiEndpoint::default(),
            app_name: "Email".to_string(),
            error_app_name: "Warnings".to_string(),
        }
    }
}

/// The single account a set of messages belongs to, if there is one
pub fn single_account<'a>(
    messages: impl IntoIterator<Item = &'a PublishableMessage>,
) -> Option<AccountId> {
    let accounts: BTreeSet<AccountId> = messages.into_iter().map(|m| m.account_id).collect();
    if accounts.len() == 1 {
        accounts.into_iter().next()
    } else {
        None
    }
}

impl Renderer {
    /// Persistent notification of one message group.
    ///
    /// `branding` holds the properties of the group's account when all its
    /// messages belong to the same one. `messages` must not be empty.
    pub fn group(
        &self,
        key: &GroupKey,
        messages: &[&PublishableMessage],
        branding: Option<&AccountProperties>,
        replaces: Option<NotificationId>,
    ) -> Notification {
        let mut n = Notification::new(CATEGORY_MESSAGE);
        n.id = replaces;
        n.app_name = self.app_name.clone();
        n.icon = branding.and_then(|b| b.icon.clone());
        n.item_count = messages.len() as u32;
        n.set_hint(HINT_GROUP, key.encode());
        n.set_hint(HINT_MESSAGE_IDS, format_message_ids(messages.iter().map(|m| &m.id)));

        if let [message] = messages {
            n.summary = message.display_sender().to_string();
            n.body = format::truncate(&message.subject, MAX_SUBJECT_CHARS);
            n.timestamp = Some(message.timestamp);
            n.remote_actions = self.action_list("openMessage", vec![message.id.0]);
            return n;
        }

        n.summary = match key {
            GroupKey::Sender(origin) => {
                let name = messages
                    .iter()
                    .map(|m| m.sender.as_str())
                    .find(|s| !s.is_empty())
                    .unwrap_or(origin.as_str());
                format::new_emails_from(messages.len(), name)
            }
            _ => format::new_emails(messages.len()),
        };
        if let GroupKey::Account(_) = key {
            n.body = branding.map(|b| b.display_name.clone()).unwrap_or_default();
        }
        n.timestamp = messages.iter().map(|m| m.timestamp).max();
        n.remote_actions = match single_account(messages.iter().copied()) {
            Some(account) => self.action_list("openInbox", vec![account.0]),
            None => self.action_list("openCombinedInbox", Vec::new()),
        };
        n
    }

    /// Transient banner announcing newly arrived messages.
    ///
    /// While the mail UI is on screen the banner carries no text at all.
    pub fn banner(&self, new_messages: &[&PublishableMessage], on_screen: bool) -> Notification {
        let mut n = Notification::new(CATEGORY_SUMMARY);
        n.app_name = self.app_name.clone();
        n.set_hint(HINT_TRANSIENT, "true");
        if on_screen {
            return n;
        }

        n.item_count = new_messages.len() as u32;
        if let [message] = new_messages {
            n.preview_summary = message.display_sender().to_string();
            n.preview_body = format::truncate(&message.subject, MAX_SUBJECT_CHARS);
            n.remote_actions = vec![self.endpoint.action("default", "openMessage", vec![message.id.0])];
        } else {
            n.preview_summary = format::banner_summary(new_messages.len());
            n.remote_actions = vec![match single_account(new_messages.iter().copied()) {
                Some(account) => self.endpoint.action("default", "openInbox", vec![account.0]),
                None => self.endpoint.action("default", "openCombinedInbox", Vec::new()),
            }];
        }
        n
    }

    /// Error notification for messages stuck in an account's outbox
    pub fn send_failure(
        &self,
        account: AccountId,
        account_name: &str,
        replaces: Option<NotificationId>,
    ) -> Notification {
        let mut n = Notification::new(CATEGORY_ERROR);
        n.id = replaces;
        n.app_name = self.error_app_name.clone();
        n.set_hint(HINT_SEND_FAILED_ACCOUNT, account.to_string());
        n.summary = format::send_failed_summary();
        n.body = format::send_failed_body(account_name);
        n.preview_summary = format::send_failed_summary();
        n.preview_body = format::send_failed_preview(account_name);
        n.remote_actions = vec![self.endpoint.action("default", "openOutbox", vec![account.0])];
        n
    }

    /// Default action plus the application action opening the combined inbox
    fn action_list(&self, method: &str, arguments: Vec<u64>) -> Vec<RemoteAction> {
        vec![
            self.endpoint.action("default", method, arguments),
            self.endpoint.action("app", "openCombinedInbox", Vec::new()),
        ]
    }
}
