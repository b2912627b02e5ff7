//! Bus socket of the daemon
//!
//! The mail daemon (or a test harness) forwards store, action and display
//! signals as length-prefixed JSON messages over a Unix Domain Socket.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::send_message;
pub use protocol::BusMessage;

/// Default socket path of the bus listener
pub fn socket_path() -> std::path::PathBuf {
    directories::ProjectDirs::from("", "", "mailbox-notifier")
        .map(|d| d.runtime_dir().unwrap_or(d.data_dir()).to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("mailbox-notifier"))
        .join("bus.sock")
}
