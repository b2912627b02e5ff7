//! Grouping of publishable messages into notifications

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::message::PublishableMessage;
use crate::store::{AccountId, MessageId};

/// How tracked messages are folded into persistent notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingPolicy {
    /// One notification per message
    PerMessage,
    /// One notification per sender address, possibly spanning accounts
    PerSender,
    /// One notification per account
    #[default]
    PerAccount,
}

impl GroupingPolicy {
    pub fn key_for(self, message: &PublishableMessage) -> GroupKey {
        match self {
            GroupingPolicy::PerMessage => GroupKey::Message(message.id),
            GroupingPolicy::PerSender => GroupKey::Sender(message.origin.clone()),
            GroupingPolicy::PerAccount => GroupKey::Account(message.account_id),
        }
    }
}

/// Identity of a notification group, stored in the group hint
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Message(MessageId),
    Sender(String),
    Account(AccountId),
}

impl GroupKey {
    pub fn encode(&self) -> String {
        match self {
            GroupKey::Message(id) => format!("message:{}", id),
            GroupKey::Sender(origin) => format!("sender:{}", origin),
            GroupKey::Account(id) => format!("account:{}", id),
        }
    }

    pub fn decode(s: &str) -> Option<Self> {
        let (kind, value) = s.split_once(':')?;
        match kind {
            "message" => value.parse().ok().map(|id| GroupKey::Message(MessageId(id))),
            "sender" => Some(GroupKey::Sender(value.to_string())),
            "account" => value.parse().ok().map(|id| GroupKey::Account(AccountId(id))),
            _ => None,
        }
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Partition messages by group. Groups and their members come out sorted,
/// so the result only depends on the set of messages.
pub fn partition<'a>(
    policy: GroupingPolicy,
    messages: impl IntoIterator<Item = &'a PublishableMessage>,
) -> BTreeMap<GroupKey, Vec<&'a PublishableMessage>> {
    let mut groups: BTreeMap<GroupKey, Vec<&'a PublishableMessage>> = BTreeMap::new();
    for message in messages {
        groups.entry(policy.key_for(message)).or_default().push(message);
    }
    for members in groups.values_mut() {
        members.sort_by_key(|m| m.id);
    }
    groups
}

/// Encode message ids for the message-ids hint
pub fn format_message_ids<'a>(ids: impl IntoIterator<Item = &'a MessageId>) -> String {
    ids.into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode the message-ids hint, skipping empty and malformed entries
pub fn parse_message_ids(s: &str) -> Vec<MessageId> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse().ok().map(MessageId))
        .collect()
}
