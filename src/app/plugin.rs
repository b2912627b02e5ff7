//! Event dispatcher wiring the action tracker to the store reconciler.

use std::time::Instant;

use tracing::{debug, info};

use super::config::Config;
use super::events::Event;
use crate::actions::{ActionTracker, TrackerSignal, TransferReporter};
use crate::notification::NotificationService;
use crate::reconcile::{Collaborators, StoreReconciler};
use crate::store::{AccountsCache, MailStore};

/// Notification plugin of the mail daemon.
///
/// Owns its collaborators and routes incoming events to the tracker and the
/// reconciler. Tracker signals are applied to the reconciler in the same
/// call, so a batch of store events is always processed before the settle
/// signal that follows it.
pub struct Plugin<S, N, T> {
    store: S,
    notifications: N,
    transfers: T,
    accounts: AccountsCache,
    tracker: ActionTracker,
    reconciler: StoreReconciler,
}

impl<S: MailStore, N: NotificationService, T: TransferReporter> Plugin<S, N, T> {
    /// Create the plugin and recover notifications left by a previous run
    pub fn new(config: &Config, store: S, notifications: N, transfers: T) -> Self {
        let mut plugin = Self {
            store,
            notifications,
            transfers,
            accounts: AccountsCache::new(),
            tracker: ActionTracker::new(config.settle_delay()),
            reconciler: StoreReconciler::new(config.notifications.grouping, config.renderer()),
        };
        plugin.with_collaborators(|r, c| r.recover(c));
        info!(
            "Notification plugin started, {} messages published",
            plugin.reconciler.tracked_ids().len()
        );
        plugin
    }

    pub fn handle(&mut self, event: Event, now: Instant) {
        debug!("Handling {:?}", event);
        match event {
            Event::MessagesAdded(ids) => self.reconciler.add_messages(&self.store, &ids),
            Event::MessagesUpdated(ids) => self.reconciler.update_messages(&self.store, &ids),
            Event::MessagesRemoved(ids) => {
                self.with_collaborators(|r, c| r.remove_messages(c, &ids));
            }
            Event::StoreReset => self.reconciler.revalidate(&self.store),
            Event::ActionsChanged(actions) => self.tracker.on_actions_changed(&actions, now),
            Event::ActionActivity { id, activity } => {
                let signals = self.tracker.on_activity(id, activity, &mut self.transfers);
                for signal in signals {
                    self.dispatch(signal);
                }
            }
            Event::ActionProgress { id, value, total } => {
                self.tracker.on_progress(id, value, total, &mut self.transfers);
            }
            Event::ActionAccount { id, account } => self.tracker.on_status_account(
                id,
                account,
                &self.store,
                &mut self.accounts,
                &mut self.transfers,
            ),
            Event::DisplayEntered => self.reconciler.display_entered(),
            Event::DisplayExit => self.reconciler.display_exit(),
            Event::CombinedInboxDisplayed => {
                self.with_collaborators(|r, c| r.combined_inbox_displayed(c));
            }
            Event::AccountInboxDisplayed(account) => {
                self.with_collaborators(|r, c| r.account_inbox_displayed(c, account));
            }
        }
    }

    /// When the event loop has to call [`Plugin::on_timer`] next
    pub fn next_deadline(&self) -> Option<Instant> {
        self.tracker.next_deadline()
    }

    pub fn on_timer(&mut self, now: Instant) {
        if let Some(signal) = self.tracker.on_timer(now) {
            self.dispatch(signal);
        }
    }

    fn dispatch(&mut self, signal: TrackerSignal) {
        match signal {
            TrackerSignal::TransmitCompleted(account) => {
                self.with_collaborators(|r, c| r.transmit_completed(c, account));
            }
            TrackerSignal::TransmitFailed(account) => {
                self.with_collaborators(|r, c| r.transmit_failed(c, account));
            }
            TrackerSignal::ActionsCompleted => {
                self.with_collaborators(|r, c| r.actions_completed(c));
            }
        }
    }

    fn with_collaborators<R>(
        &mut self,
        op: impl FnOnce(&mut StoreReconciler, &mut Collaborators<'_, S, N>) -> R,
    ) -> R {
        let mut c = Collaborators {
            store: &self.store,
            notifications: &mut self.notifications,
            accounts: &mut self.accounts,
        };
        op(&mut self.reconciler, &mut c)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn notifications(&self) -> &N {
        &self.notifications
    }

    pub fn tracker(&self) -> &ActionTracker {
        &self.tracker
    }

    pub fn reconciler(&self) -> &StoreReconciler {
        &self.reconciler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ActionSnapshot, Activity, LogTransfers, RequestKind};
    use crate::notification::{
        MemoryNotifications, Notification, CATEGORY_ERROR, CATEGORY_MESSAGE, CATEGORY_SUMMARY,
    };
    use crate::store::{AccountId, AccountRecord, MessageId, MessageMeta, MessageStatus, SnapshotStore};
    use chrono::Utc;
    use std::time::Duration;

    type TestPlugin = Plugin<SnapshotStore, MemoryNotifications, LogTransfers>;

    fn store() -> SnapshotStore {
        let mut store = SnapshotStore::new();
        for (id, name) in [(1, "Home"), (2, "Work")] {
            store.upsert_account(AccountRecord {
                id: AccountId(id),
                name: name.to_string(),
                icon: None,
                enabled: true,
            });
        }
        store
    }

    fn plugin() -> TestPlugin {
        Plugin::new(&Config::default(), store(), MemoryNotifications::new(), LogTransfers::new())
    }

    fn meta(id: u64, account: u64, sender: &str, subject: &str) -> MessageMeta {
        MessageMeta {
            id: MessageId(id),
            account_id: AccountId(account),
            from_name: sender.to_string(),
            from_address: format!("{}@example.org", sender.to_lowercase()),
            subject: subject.to_string(),
            date: Utc::now(),
            message_type: Default::default(),
            status: MessageStatus::default(),
        }
    }

    fn snapshot(id: u64, kind: RequestKind) -> ActionSnapshot {
        ActionSnapshot { id, kind }
    }

    /// Run one sync action delivering `messages`, up to the settle signal
    fn sync(p: &mut TestPlugin, action: u64, messages: Vec<MessageMeta>, now: Instant) {
        p.handle(Event::ActionsChanged(vec![snapshot(action, RequestKind::RetrieveNewMessages)]), now);
        let ids = messages.iter().map(|m| m.id).collect();
        for message in messages {
            p.store_mut().upsert_message(message);
        }
        p.handle(Event::MessagesAdded(ids), now);
        p.handle(Event::ActionActivity { id: action, activity: Activity::Successful }, now);
        p.handle(Event::ActionsChanged(Vec::new()), now);
    }

    fn settle(p: &mut TestPlugin, now: Instant) {
        p.on_timer(now + Config::default().settle_delay());
    }

    fn messages(p: &TestPlugin) -> Vec<Notification> {
        p.notifications().live_in(CATEGORY_MESSAGE).into_iter().cloned().collect()
    }

    #[test]
    fn test_single_message_after_settle() {
        let mut p = plugin();
        let now = Instant::now();
        sync(&mut p, 1, vec![meta(1, 1, "Alice", "Lunch?")], now);

        assert!(p.notifications().calls().is_empty());
        p.on_timer(now + Duration::from_millis(999));
        assert!(p.notifications().calls().is_empty());

        settle(&mut p, now);
        let live = messages(&p);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].summary, "Alice");
        assert_eq!(live[0].body, "Lunch?");
        assert!(p.next_deadline().is_none());
    }

    #[test]
    fn test_batch_on_one_account_is_aggregated() {
        let mut p = plugin();
        let now = Instant::now();
        sync(&mut p, 1, vec![meta(1, 1, "Alice", "a"), meta(2, 1, "Bob", "b")], now);
        settle(&mut p, now);

        let live = messages(&p);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].item_count, 2);
        assert_eq!(live[0].body, "Home");
        assert_eq!(live[0].remote_actions[0].method, "openInbox");
        assert_eq!(live[0].remote_actions[0].arguments, vec![1]);
    }

    #[test]
    fn test_batch_on_two_accounts_opens_combined_inbox() {
        let mut p = plugin();
        let now = Instant::now();
        sync(&mut p, 1, vec![meta(1, 1, "Alice", "a"), meta(2, 2, "Bob", "b")], now);
        settle(&mut p, now);

        let banner = p
            .notifications()
            .published()
            .into_iter()
            .find(|n| n.category == CATEGORY_SUMMARY)
            .cloned()
            .unwrap();
        assert_eq!(banner.preview_summary, "You have 2 new emails");
        assert_eq!(banner.remote_actions[0].method, "openCombinedInbox");
    }

    #[test]
    fn test_read_message_is_closed_on_next_settle() {
        let mut p = plugin();
        let now = Instant::now();
        sync(&mut p, 1, vec![meta(1, 1, "Alice", "a")], now);
        settle(&mut p, now);
        assert_eq!(messages(&p).len(), 1);

        let mut read = meta(1, 1, "Alice", "a");
        read.status.read = true;
        p.store_mut().upsert_message(read);
        p.handle(Event::MessagesUpdated(vec![MessageId(1)]), now);
        p.handle(Event::ActionsChanged(Vec::new()), now);
        settle(&mut p, now);

        assert!(messages(&p).is_empty());
    }

    #[test]
    fn test_running_action_delays_settle() {
        let mut p = plugin();
        let now = Instant::now();
        p.handle(Event::ActionsChanged(vec![snapshot(1, RequestKind::Synchronize)]), now);
        p.store_mut().upsert_message(meta(1, 1, "Alice", "a"));
        p.handle(Event::MessagesAdded(vec![MessageId(1)]), now);
        p.handle(Event::ActionsChanged(Vec::new()), now);

        // A chained action starts before the timer fires
        p.handle(Event::ActionsChanged(vec![snapshot(2, RequestKind::RetrieveMessages)]), now);
        assert!(p.next_deadline().is_none());
        p.handle(Event::ActionActivity { id: 1, activity: Activity::Successful }, now);
        p.handle(Event::ActionActivity { id: 2, activity: Activity::Failed }, now);
        p.handle(Event::ActionsChanged(Vec::new()), now);
        settle(&mut p, now);

        assert_eq!(messages(&p).len(), 1);
        assert_eq!(p.tracker().running_count(), 0);
    }

    #[test]
    fn test_transmit_failure_round_trip() {
        let mut p = plugin();
        let now = Instant::now();
        let mut queued = meta(10, 2, "Me", "draft");
        queued.status.outbox = true;
        p.store_mut().upsert_message(queued);

        p.handle(Event::ActionsChanged(vec![snapshot(5, RequestKind::TransmitMessages)]), now);
        p.handle(Event::ActionAccount { id: 5, account: AccountId(2) }, now);
        p.handle(Event::ActionActivity { id: 5, activity: Activity::Failed }, now);

        let failures = p.notifications().live_in(CATEGORY_ERROR);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].preview_body, "Failed to send email from account Work");

        p.handle(Event::ActionsChanged(vec![snapshot(6, RequestKind::TransmitMessages)]), now);
        p.handle(Event::ActionAccount { id: 6, account: AccountId(2) }, now);
        p.handle(Event::ActionActivity { id: 6, activity: Activity::Successful }, now);
        assert!(p.notifications().live_in(CATEGORY_ERROR).is_empty());
    }

    #[test]
    fn test_transmit_failure_with_empty_outbox() {
        let mut p = plugin();
        let now = Instant::now();
        p.handle(Event::ActionsChanged(vec![snapshot(5, RequestKind::TransmitMessages)]), now);
        p.handle(Event::ActionAccount { id: 5, account: AccountId(1) }, now);
        p.handle(Event::ActionActivity { id: 5, activity: Activity::Failed }, now);
        assert!(p.notifications().calls().is_empty());
    }

    #[test]
    fn test_inbox_display_closes_notifications() {
        let mut p = plugin();
        let now = Instant::now();
        sync(&mut p, 1, vec![meta(1, 1, "Alice", "a"), meta(2, 2, "Bob", "b")], now);
        settle(&mut p, now);
        assert_eq!(messages(&p).len(), 2);

        p.handle(Event::AccountInboxDisplayed(AccountId(2)), now);
        assert_eq!(messages(&p).len(), 1);
        p.handle(Event::CombinedInboxDisplayed, now);
        assert!(messages(&p).is_empty());
    }

    #[test]
    fn test_store_reset_drops_vanished_messages() {
        let mut p = plugin();
        let now = Instant::now();
        sync(&mut p, 1, vec![meta(1, 1, "Alice", "a"), meta(2, 1, "Bob", "b")], now);
        settle(&mut p, now);

        let accounts = store().account(AccountId(1)).into_iter().collect();
        p.store_mut().reset(accounts, vec![meta(2, 1, "Bob", "b")]);
        p.handle(Event::StoreReset, now);
        assert_eq!(p.reconciler().tracked_ids(), vec![MessageId(2)]);
    }

    #[test]
    fn test_store_reset_drops_removed_accounts() {
        let mut p = plugin();
        let now = Instant::now();
        sync(&mut p, 1, vec![meta(1, 1, "Alice", "a"), meta(2, 2, "Bob", "b")], now);
        settle(&mut p, now);

        // Account 2 is gone from the new snapshot, its message is still listed
        let accounts = store().account(AccountId(1)).into_iter().collect();
        p.store_mut().reset(accounts, vec![meta(1, 1, "Alice", "a"), meta(2, 2, "Bob", "b")]);
        p.handle(Event::StoreReset, now);
        assert_eq!(p.reconciler().tracked_ids(), vec![MessageId(1)]);

        p.handle(Event::ActionsChanged(Vec::new()), now);
        settle(&mut p, now);
        assert_eq!(messages(&p).len(), 1);
    }

    #[test]
    fn test_restart_recovers_published_state() {
        let mut p = plugin();
        let now = Instant::now();
        sync(&mut p, 1, vec![meta(1, 1, "Alice", "a"), meta(2, 2, "Bob", "b")], now);
        settle(&mut p, now);

        let live: Vec<Notification> = p.notifications().live().cloned().collect();
        let mut store = p.store().clone();
        let mut read = meta(2, 2, "Bob", "b");
        read.status.read = true;
        store.upsert_message(read);

        let restarted: TestPlugin = Plugin::new(
            &Config::default(),
            store,
            MemoryNotifications::with_live(live),
            LogTransfers::new(),
        );
        assert_eq!(restarted.reconciler().tracked_ids(), vec![MessageId(1)]);
        assert!(restarted.reconciler().new_message_ids().is_empty());
        assert_eq!(restarted.notifications().live_in(CATEGORY_MESSAGE).len(), 1);
    }
}
