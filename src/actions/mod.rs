//! Sync action tracking
//!
//! Observes the action queue of the sync engine and tells the reconciler
//! when a burst of synchronization work is over.

pub mod kind;
pub mod timer;
pub mod tracker;
pub mod transfer;

pub use kind::{ActionId, ActionSnapshot, Activity, RequestKind};
pub use timer::SettleTimer;
pub use tracker::{ActionTracker, Lifecycle, TrackedAction, TrackerSignal};
pub use transfer::{LogTransfers, TransferId, TransferOutcome, TransferReporter};
