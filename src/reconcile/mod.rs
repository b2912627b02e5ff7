//! Store reconciliation
//!
//! Keeps the set of published notifications in line with the unread,
//! eligible messages of the mail store.

pub mod grouping;
pub mod message;
pub mod reconciler;
pub mod render;

pub use grouping::{GroupKey, GroupingPolicy};
pub use message::PublishableMessage;
pub use reconciler::{Collaborators, StoreReconciler};
pub use render::Renderer;
