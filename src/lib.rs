pub mod actions;
pub mod app;
pub mod error;
pub mod ipc;
pub mod notification;
pub mod reconcile;
pub mod store;
