//! Tracking of in-flight sync actions.
//!
//! The tracker follows the long running actions of the sync engine and turns
//! their completion into three signals: transmit succeeded / failed for an
//! account, and "all actions settled" once a burst of actions is over.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use super::kind::{ActionId, ActionSnapshot, Activity, RequestKind};
use super::timer::SettleTimer;
use super::transfer::{TransferId, TransferOutcome, TransferReporter};
use crate::notification::format;
use crate::store::{AccountId, AccountsCache, MailStore};

/// Minimum progress increase forwarded to the progress UI
const PROGRESS_STEP: f64 = 0.05;

/// Lifecycle of a tracked action. There is no way back to an earlier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Pending,
    Active,
    Completed,
}

/// Signal emitted by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerSignal {
    TransmitCompleted(AccountId),
    TransmitFailed(AccountId),
    /// Every tracked action of the last burst has finished
    ActionsCompleted,
}

#[derive(Debug, Clone)]
pub struct TrackedAction {
    id: ActionId,
    kind: RequestKind,
    lifecycle: Lifecycle,
    progress: f64,
    account_id: Option<AccountId>,
    transfer: Option<TransferId>,
}

impl TrackedAction {
    fn new(snapshot: ActionSnapshot) -> Self {
        Self {
            id: snapshot.id,
            kind: snapshot.kind,
            lifecycle: Lifecycle::Pending,
            progress: 0.0,
            account_id: None,
            transfer: None,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Returns true once the action reached a terminal activity
    fn apply_activity<T: TransferReporter>(&mut self, activity: Activity, transfers: &mut T) -> bool {
        match activity {
            Activity::Pending => {
                if self.lifecycle != Lifecycle::Pending {
                    trace!("Action {} cannot go back to pending", self.id);
                }
                false
            }
            Activity::InProgress => {
                if self.lifecycle == Lifecycle::Pending {
                    self.lifecycle = Lifecycle::Active;
                }
                false
            }
            Activity::Successful | Activity::Failed => {
                if let Some(transfer) = self.transfer.take() {
                    if activity == Activity::Failed {
                        transfers.finish_transfer(
                            transfer,
                            TransferOutcome::Interrupted,
                            Some(format::sync_failed()),
                        );
                    } else {
                        transfers.finish_transfer(transfer, TransferOutcome::Finished, None);
                    }
                }
                self.lifecycle = Lifecycle::Completed;
                true
            }
        }
    }

    fn apply_progress<T: TransferReporter>(&mut self, value: u32, total: u32, transfers: &mut T) {
        if total == 0 || value >= total {
            return;
        }
        let fraction = f64::from(value) / f64::from(total);
        // Avoid flooding the progress UI
        if fraction > self.progress + PROGRESS_STEP {
            self.progress = fraction;
            if let Some(transfer) = self.transfer {
                transfers.update_progress(transfer, fraction);
            }
        }
    }

    fn apply_status_account<S: MailStore, T: TransferReporter>(
        &mut self,
        account: AccountId,
        store: &S,
        accounts: &mut AccountsCache,
        transfers: &mut T,
    ) {
        self.account_id = Some(account);

        if self.transfer.is_some() {
            warn!("Action {} is already reported to the progress UI", self.id);
            return;
        }
        let Some(props) = accounts.lookup(store, account) else {
            warn!("Action {} reports unknown account {}", self.id, account);
            return;
        };
        match transfers.create_sync_event(&props.display_name, props.icon.as_deref()) {
            Some(transfer) => {
                transfers.start_transfer(transfer);
                self.transfer = Some(transfer);
            }
            None => warn!("Failed to create sync event for action {}", self.id),
        }
    }
}

/// Follows running sync actions and detects when a burst has settled.
#[derive(Debug)]
pub struct ActionTracker {
    running: HashMap<ActionId, TrackedAction>,
    // Late change notifications may still list actions that already finished
    completed: HashSet<ActionId>,
    timer: SettleTimer,
}

impl ActionTracker {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            running: HashMap::new(),
            completed: HashSet::new(),
            timer: SettleTimer::new(settle_delay),
        }
    }

    /// Handle a new listing of the action queue.
    ///
    /// An empty listing (re-)arms the settle timer, so that the chained
    /// actions of one account sync produce a single settle signal.
    pub fn on_actions_changed(&mut self, actions: &[ActionSnapshot], now: Instant) {
        for snapshot in actions {
            if self.running.contains_key(&snapshot.id) || self.completed.contains(&snapshot.id) {
                continue;
            }
            if !snapshot.kind.is_notification_worthy() {
                trace!("Ignoring action {} ({})", snapshot.id, snapshot.kind);
                continue;
            }
            debug!("Tracking action {} ({})", snapshot.id, snapshot.kind);
            self.running.insert(snapshot.id, TrackedAction::new(*snapshot));
            self.timer.disarm();
        }

        if actions.is_empty() {
            self.timer.arm(now);
        }
    }

    pub fn on_activity<T: TransferReporter>(
        &mut self,
        id: ActionId,
        activity: Activity,
        transfers: &mut T,
    ) -> Vec<TrackerSignal> {
        let Some(action) = self.running.get_mut(&id) else {
            trace!("Activity {:?} for untracked action {}", activity, id);
            return Vec::new();
        };
        if !action.apply_activity(activity, transfers) {
            return Vec::new();
        }

        let mut signals = Vec::new();
        if action.kind == RequestKind::TransmitMessages {
            match action.account_id.filter(AccountId::is_valid) {
                Some(account) if activity == Activity::Successful => {
                    signals.push(TrackerSignal::TransmitCompleted(account));
                }
                Some(account) => signals.push(TrackerSignal::TransmitFailed(account)),
                None => warn!("Transmit action {} finished without a valid account", id),
            }
        }

        self.complete(id);
        signals
    }

    pub fn on_progress<T: TransferReporter>(
        &mut self,
        id: ActionId,
        value: u32,
        total: u32,
        transfers: &mut T,
    ) {
        if let Some(action) = self.running.get_mut(&id) {
            action.apply_progress(value, total, transfers);
        }
    }

    pub fn on_status_account<S: MailStore, T: TransferReporter>(
        &mut self,
        id: ActionId,
        account: AccountId,
        store: &S,
        accounts: &mut AccountsCache,
        transfers: &mut T,
    ) {
        if !account.is_valid() {
            warn!("Action {} reports invalid account id", id);
            return;
        }
        if let Some(action) = self.running.get_mut(&id) {
            action.apply_status_account(account, store, accounts, transfers);
        }
    }

    /// Deadline of the pending settle check, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Run the settle check when its deadline has passed.
    pub fn on_timer(&mut self, now: Instant) -> Option<TrackerSignal> {
        if !self.timer.fire(now) {
            return None;
        }
        if !self.running.is_empty() {
            debug!("{} actions still running, not settled", self.running.len());
            return None;
        }
        self.completed.clear();
        debug!("All actions settled");
        Some(TrackerSignal::ActionsCompleted)
    }

    pub fn action(&self, id: ActionId) -> Option<&TrackedAction> {
        self.running.get(&id)
    }

    pub fn is_tracking(&self, id: ActionId) -> bool {
        self.running.contains_key(&id)
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    fn complete(&mut self, id: ActionId) {
        self.running.remove(&id);
        self.completed.insert(id);
        debug!("Action {} complete", id);
    }
}
