//! In-memory mail store fed by the daemon's bus messages

use std::collections::{BTreeMap, HashMap};

use super::{AccountId, AccountRecord, MailStore, MessageId, MessageMeta};

/// Mirror of the mail store built from snapshot and change messages.
#[derive(Debug, Default, Clone)]
pub struct SnapshotStore {
    messages: HashMap<MessageId, MessageMeta>,
    accounts: BTreeMap<AccountId, AccountRecord>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole store content
    pub fn reset(&mut self, accounts: Vec<AccountRecord>, messages: Vec<MessageMeta>) {
        self.accounts = accounts.into_iter().map(|a| (a.id, a)).collect();
        self.messages = messages.into_iter().map(|m| (m.id, m)).collect();
    }

    /// Insert or replace message metadata, returning its id
    pub fn upsert_message(&mut self, message: MessageMeta) -> MessageId {
        let id = message.id;
        self.messages.insert(id, message);
        id
    }

    pub fn remove_message(&mut self, id: MessageId) -> Option<MessageMeta> {
        self.messages.remove(&id)
    }

    pub fn upsert_account(&mut self, account: AccountRecord) {
        self.accounts.insert(account.id, account);
    }

    pub fn remove_account(&mut self, id: AccountId) -> Option<AccountRecord> {
        self.accounts.remove(&id)
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

impl MailStore for SnapshotStore {
    fn message(&self, id: MessageId) -> Option<MessageMeta> {
        self.messages.get(&id).cloned()
    }

    fn enabled_accounts(&self) -> Vec<AccountId> {
        self.accounts
            .values()
            .filter(|a| a.enabled)
            .map(|a| a.id)
            .collect()
    }

    fn account(&self, id: AccountId) -> Option<AccountRecord> {
        self.accounts.get(&id).cloned()
    }

    fn count_queued(&self, account: AccountId) -> usize {
        self.messages
            .values()
            .filter(|m| m.account_id == account && m.is_queued())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MessageStatus;
    use chrono::Utc;

    fn account(id: u64, enabled: bool) -> AccountRecord {
        AccountRecord {
            id: AccountId(id),
            name: format!("Account {}", id),
            icon: None,
            enabled,
        }
    }

    fn message(id: u64, account: u64, status: MessageStatus) -> MessageMeta {
        MessageMeta {
            id: MessageId(id),
            account_id: AccountId(account),
            from_name: String::new(),
            from_address: "someone@example.org".to_string(),
            subject: String::new(),
            date: Utc::now(),
            message_type: Default::default(),
            status,
        }
    }

    #[test]
    fn test_enabled_accounts_skip_disabled() {
        let mut store = SnapshotStore::new();
        store.reset(vec![account(1, true), account(2, false), account(3, true)], vec![]);
        assert_eq!(store.enabled_accounts(), vec![AccountId(1), AccountId(3)]);
    }

    #[test]
    fn test_count_queued_per_account() {
        let outbox = MessageStatus { outbox: true, ..Default::default() };
        let trashed = MessageStatus { outbox: true, trash: true, ..Default::default() };
        let mut store = SnapshotStore::new();
        store.upsert_message(message(1, 1, outbox));
        store.upsert_message(message(2, 1, trashed));
        store.upsert_message(message(3, 2, outbox));
        store.upsert_message(message(4, 1, MessageStatus::default()));

        assert_eq!(store.count_queued(AccountId(1)), 1);
        assert_eq!(store.count_queued(AccountId(2)), 1);
        assert_eq!(store.count_queued(AccountId(9)), 0);
    }

    #[test]
    fn test_upsert_replaces_and_remove_forgets() {
        let mut store = SnapshotStore::new();
        store.upsert_message(message(1, 1, MessageStatus::default()));
        store.upsert_message(message(1, 1, MessageStatus { read: true, ..Default::default() }));
        assert_eq!(store.message_count(), 1);
        assert!(store.message(MessageId(1)).unwrap().status.read);

        assert!(store.remove_message(MessageId(1)).is_some());
        assert!(store.message(MessageId(1)).is_none());
    }
}
