//! Reconciliation of tracked messages with published notifications.
//!
//! The reconciler keeps the authoritative set of messages that deserve a
//! notification. Mail store events update that set incrementally; a
//! reconciliation pass then diffs the notifications the set calls for
//! against those the service currently shows, and publishes, replaces or
//! closes accordingly.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{debug, info, trace, warn};

use super::grouping::{parse_message_ids, partition, GroupKey, GroupingPolicy};
use super::message::PublishableMessage;
use super::render::{single_account, Renderer};
use crate::notification::{
    Notification, NotificationId, NotificationService, CATEGORY_ERROR, CATEGORY_MESSAGE,
    HINT_GROUP, HINT_MESSAGE_IDS, HINT_SEND_FAILED_ACCOUNT,
};
use crate::store::{AccountId, AccountsCache, MailStore, MessageId};

/// Borrowed collaborators of a reconciliation step
pub struct Collaborators<'a, S, N> {
    pub store: &'a S,
    pub notifications: &'a mut N,
    pub accounts: &'a mut AccountsCache,
}

#[derive(Debug)]
pub struct StoreReconciler {
    policy: GroupingPolicy,
    renderer: Renderer,
    published: BTreeMap<MessageId, PublishableMessage>,
    /// Added since the last banner, always a subset of `published`
    new_messages: BTreeSet<MessageId>,
    publication_changes: bool,
    app_on_screen: bool,
}

impl StoreReconciler {
    pub fn new(policy: GroupingPolicy, renderer: Renderer) -> Self {
        Self {
            policy,
            renderer,
            published: BTreeMap::new(),
            new_messages: BTreeSet::new(),
            publication_changes: false,
            app_on_screen: false,
        }
    }

    /// Rebuild the tracked set from notifications left by an earlier run.
    ///
    /// Referenced messages are re-validated against the store; the following
    /// reconciliation pass closes whatever no longer qualifies.
    pub fn recover<S: MailStore, N: NotificationService>(&mut self, c: &mut Collaborators<'_, S, N>) {
        let existing = match c.notifications.notifications() {
            Ok(existing) => existing,
            Err(e) => {
                warn!("Cannot list published notifications for recovery: {}", e);
                return;
            }
        };

        let mut referenced = BTreeSet::new();
        for n in existing.iter().filter(|n| n.category == CATEGORY_MESSAGE) {
            let ids = match (n.hint(HINT_GROUP), n.hint(HINT_MESSAGE_IDS)) {
                (Some(_), Some(ids)) => parse_message_ids(ids),
                _ => Vec::new(),
            };
            if ids.is_empty() {
                debug!("Closing notification {:?} without message hints", n.id);
                close(c.notifications, n.id);
            } else {
                referenced.extend(ids);
            }
        }

        if !referenced.is_empty() {
            // Accounts may have been removed while we were not running
            let enabled: HashSet<AccountId> = c.store.enabled_accounts().into_iter().collect();
            for id in referenced {
                match c.store.message(id) {
                    Some(meta) if enabled.contains(&meta.account_id) && meta.is_eligible() => {
                        self.published.insert(id, PublishableMessage::from_meta(&meta));
                    }
                    Some(_) => debug!("Message {} no longer qualifies for notification", id),
                    None => debug!("Message {} no longer exists", id),
                }
            }
        }

        info!("Recovered {} published messages", self.published.len());
        self.reconcile(c);
    }

    /// Track newly added messages that qualify for notification.
    pub fn add_messages<S: MailStore>(&mut self, store: &S, ids: &[MessageId]) {
        for &id in ids {
            // The same message can be reported twice
            if self.published.contains_key(&id) {
                continue;
            }
            let Some(meta) = store.message(id) else {
                warn!("Added message {} not found in store", id);
                continue;
            };
            if !meta.is_eligible() {
                continue;
            }
            self.published.insert(id, PublishableMessage::from_meta(&meta));
            self.new_messages.insert(id);
            self.publication_changes = true;
        }
    }

    /// Forget deleted messages and reconcile right away.
    ///
    /// Deletion is a local mutation, not necessarily part of a sync action,
    /// so it does not wait for the settle signal.
    pub fn remove_messages<S: MailStore, N: NotificationService>(
        &mut self,
        c: &mut Collaborators<'_, S, N>,
        ids: &[MessageId],
    ) {
        for id in ids {
            if self.published.remove(id).is_some() {
                self.new_messages.remove(id);
                self.publication_changes = true;
            }
        }
        self.actions_completed(c);
    }

    /// Drop tracked messages that stopped qualifying (read, trashed, ...).
    pub fn update_messages<S: MailStore>(&mut self, store: &S, ids: &[MessageId]) {
        for id in ids {
            if !self.published.contains_key(id) {
                continue;
            }
            let eligible = match store.message(*id) {
                Some(meta) => meta.is_eligible(),
                None => {
                    warn!("Updated message {} not found in store", id);
                    false
                }
            };
            if !eligible {
                self.published.remove(id);
                self.new_messages.remove(id);
                self.publication_changes = true;
            }
        }
    }

    /// Re-check every tracked message after the store content was replaced.
    ///
    /// Applies the same rules as recovery: the message must still exist, be
    /// eligible and belong to an enabled account.
    pub fn revalidate<S: MailStore>(&mut self, store: &S) {
        let enabled: HashSet<AccountId> = store.enabled_accounts().into_iter().collect();
        let before = self.published.len();
        self.published.retain(|id, _| match store.message(*id) {
            Some(meta) => enabled.contains(&meta.account_id) && meta.is_eligible(),
            None => false,
        });
        if self.published.len() != before {
            debug!("{} tracked messages dropped after store reset", before - self.published.len());
            self.new_messages.retain(|id| self.published.contains_key(id));
            self.publication_changes = true;
        }
    }

    /// Settle signal: publish pending changes and announce new mail.
    pub fn actions_completed<S: MailStore, N: NotificationService>(
        &mut self,
        c: &mut Collaborators<'_, S, N>,
    ) {
        if !self.publication_changes {
            return;
        }
        self.publication_changes = false;
        self.reconcile(c);

        if self.new_messages.is_empty() {
            return;
        }
        let new_messages: Vec<&PublishableMessage> = self
            .new_messages
            .iter()
            .filter_map(|id| self.published.get(id))
            .collect();
        let banner = self.renderer.banner(&new_messages, self.app_on_screen);
        if let Err(e) = c.notifications.publish(&banner) {
            warn!("Failed to publish new mail banner: {}", e);
        }
        self.new_messages.clear();
    }

    /// Bring published notifications in line with the tracked messages.
    pub fn reconcile<S: MailStore, N: NotificationService>(&mut self, c: &mut Collaborators<'_, S, N>) {
        let existing = match c.notifications.notifications() {
            Ok(existing) => existing,
            Err(e) => {
                warn!("Cannot list published notifications: {}", e);
                return;
            }
        };
        let groups = partition(self.policy, self.published.values());

        let mut current: BTreeMap<GroupKey, Vec<Notification>> = BTreeMap::new();
        for n in existing.into_iter().filter(|n| n.category == CATEGORY_MESSAGE) {
            match n.hint(HINT_GROUP).and_then(GroupKey::decode) {
                Some(key) if groups.contains_key(&key) => current.entry(key).or_default().push(n),
                _ => {
                    debug!("Closing stale notification {:?}", n.id);
                    close(c.notifications, n.id);
                }
            }
        }

        for (key, members) in &groups {
            let mut previous = current.remove(key).unwrap_or_default();
            if previous.len() > 1 {
                warn!("{} notifications published for group {}, closing all", previous.len(), key);
                for n in previous.drain(..) {
                    close(c.notifications, n.id);
                }
            }
            let previous = previous.pop();

            let branding = single_account(members.iter().copied())
                .and_then(|account| c.accounts.lookup(c.store, account));
            let target = self.renderer.group(
                key,
                members,
                branding.as_ref(),
                previous.as_ref().and_then(|p| p.id),
            );
            if previous.as_ref() == Some(&target) {
                trace!("Notification for group {} is up to date", key);
                continue;
            }
            match c.notifications.publish(&target) {
                Ok(id) => debug!("Published notification {} for group {}", id, key),
                Err(e) => warn!("Failed to publish notification for group {}: {}", key, e),
            }
        }
    }

    /// The mail UI came to the foreground
    pub fn display_entered(&mut self) {
        self.app_on_screen = true;
    }

    /// The mail UI left the foreground
    pub fn display_exit(&mut self) {
        self.app_on_screen = false;
    }

    /// The combined inbox was shown: every tracked message counts as seen
    /// and send failures are dismissed along with the message notifications.
    pub fn combined_inbox_displayed<S: MailStore, N: NotificationService>(
        &mut self,
        c: &mut Collaborators<'_, S, N>,
    ) {
        self.published.clear();
        self.new_messages.clear();
        self.publication_changes = false;
        self.reconcile(c);

        match c.notifications.notifications() {
            Ok(existing) => {
                for n in existing.iter().filter(|n| n.category == CATEGORY_ERROR) {
                    close(c.notifications, n.id);
                }
            }
            Err(e) => warn!("Cannot list published notifications: {}", e),
        }
    }

    /// The inbox of one account was shown: its messages count as seen.
    pub fn account_inbox_displayed<S: MailStore, N: NotificationService>(
        &mut self,
        c: &mut Collaborators<'_, S, N>,
        account: AccountId,
    ) {
        let before = self.published.len();
        self.published.retain(|_, m| m.account_id != account);
        if self.published.len() == before {
            return;
        }
        self.new_messages.retain(|id| self.published.contains_key(id));
        self.reconcile(c);
    }

    /// Show a send-failure notification if the account has mail stuck in
    /// its outbox.
    pub fn transmit_failed<S: MailStore, N: NotificationService>(
        &mut self,
        c: &mut Collaborators<'_, S, N>,
        account: AccountId,
    ) {
        // Failures are also reported for account tests and by other clients
        // of the store, with nothing queued
        if c.store.count_queued(account) == 0 {
            debug!("Transmit failed for account {} with empty outbox", account);
            return;
        }

        let mut existing = failure_notification_ids(c.notifications, account);
        let replaces = if existing.is_empty() { None } else { Some(existing.remove(0)) };
        if !existing.is_empty() {
            warn!("Several send failures published for account {}", account);
            for id in existing {
                close(c.notifications, Some(id));
            }
        }

        let name = c.accounts.display_name(c.store, account);
        let notification = self.renderer.send_failure(account, &name, replaces);
        if let Err(e) = c.notifications.publish(&notification) {
            warn!("Failed to publish send failure for account {}: {}", account, e);
        }
    }

    /// Clear the send-failure notification of an account.
    pub fn transmit_completed<S: MailStore, N: NotificationService>(
        &mut self,
        c: &mut Collaborators<'_, S, N>,
        account: AccountId,
    ) {
        for id in failure_notification_ids(c.notifications, account) {
            close(c.notifications, Some(id));
        }
    }

    pub fn tracked_ids(&self) -> Vec<MessageId> {
        self.published.keys().copied().collect()
    }

    pub fn new_message_ids(&self) -> Vec<MessageId> {
        self.new_messages.iter().copied().collect()
    }

    pub fn has_pending_changes(&self) -> bool {
        self.publication_changes
    }

    pub fn is_app_on_screen(&self) -> bool {
        self.app_on_screen
    }
}

fn failure_notification_ids<N: NotificationService>(
    service: &N,
    account: AccountId,
) -> Vec<NotificationId> {
    let key = account.to_string();
    match service.notifications() {
        Ok(existing) => existing
            .iter()
            .filter(|n| n.category == CATEGORY_ERROR && n.hint(HINT_SEND_FAILED_ACCOUNT) == Some(key.as_str()))
            .filter_map(|n| n.id)
            .collect(),
        Err(e) => {
            warn!("Cannot list published notifications: {}", e);
            Vec::new()
        }
    }
}

fn close<N: NotificationService>(service: &mut N, id: Option<NotificationId>) {
    let Some(id) = id else {
        return;
    };
    if let Err(e) = service.close(id) {
        warn!("Failed to close notification {}: {}", id, e);
    }
}
