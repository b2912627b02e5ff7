//! Daemon event loop
//!
//! Multiplexes bus messages, the settle timer deadline and Ctrl-C on one
//! task. The plugin is only built once the first store snapshot arrives,
//! since crash recovery needs the store content to validate against.

use anyhow::Result;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::config::Config;
use super::plugin::Plugin;
use crate::actions::LogTransfers;
use crate::ipc::{self, BusMessage};
use crate::notification::NotificationService;
use crate::store::SnapshotStore;

#[cfg(all(unix, not(target_os = "macos")))]
type Backend = crate::notification::desktop::DesktopNotifier;
#[cfg(not(all(unix, not(target_os = "macos"))))]
type Backend = crate::notification::MemoryNotifications;

pub type DaemonPlugin<N> = Plugin<SnapshotStore, N, LogTransfers>;

#[cfg(all(unix, not(target_os = "macos")))]
fn open_backend(config: &Config) -> Backend {
    use crate::notification::desktop::{default_registry_path, DesktopNotifier};

    let path = config
        .notifications
        .registry_path
        .clone()
        .unwrap_or_else(default_registry_path);
    DesktopNotifier::open(&path)
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn open_backend(_config: &Config) -> Backend {
    info!("No desktop notification backend on this platform, notifications are only logged");
    crate::notification::MemoryNotifications::new()
}

/// Run the daemon until Ctrl-C or until the bus listener stops
pub async fn run(config: Config) -> Result<()> {
    let mut backend = Some(open_backend(&config));

    let (tx, mut rx) = mpsc::channel::<BusMessage>(100);
    let listener = ipc::server::bind(&config.socket_path)?;
    let server = tokio::spawn(ipc::server::serve(listener, tx));

    let mut plugin: Option<DaemonPlugin<Backend>> = None;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!("Waiting for the first store snapshot");
    loop {
        let deadline = plugin.as_ref().and_then(|p| p.next_deadline());
        tokio::select! {
            message = rx.recv() => {
                let Some(message) = message else {
                    warn!("Bus listener stopped");
                    break;
                };
                handle_message(&config, &mut plugin, &mut backend, message, Instant::now());
            }
            _ = sleep_until(deadline) => {
                if let Some(p) = plugin.as_mut() {
                    p.on_timer(Instant::now());
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    server.abort();
    if let Err(e) = std::fs::remove_file(&config.socket_path) {
        warn!("Failed to remove socket {}: {}", config.socket_path.display(), e);
    }
    Ok(())
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Route one bus message, building the plugin on the first snapshot
pub fn handle_message<N: NotificationService>(
    config: &Config,
    plugin: &mut Option<DaemonPlugin<N>>,
    backend: &mut Option<N>,
    message: BusMessage,
    now: Instant,
) {
    if let Some(p) = plugin.as_mut() {
        if let Some(event) = message.apply(p.store_mut()) {
            p.handle(event, now);
        }
        return;
    }

    if !message.is_snapshot() {
        warn!("Dropping bus message received before the first snapshot");
        return;
    }
    let Some(notifications) = backend.take() else {
        warn!("Notification backend already in use");
        return;
    };
    let mut store = SnapshotStore::new();
    message.apply(&mut store);
    info!("Store snapshot received, {} messages", store.message_count());
    *plugin = Some(Plugin::new(config, store, notifications, LogTransfers::new()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ActionSnapshot, Activity, RequestKind};
    use crate::notification::{MemoryNotifications, CATEGORY_MESSAGE};
    use crate::store::{AccountId, AccountRecord, MessageId, MessageMeta};
    use chrono::Utc;

    fn message(id: u64) -> MessageMeta {
        MessageMeta {
            id: MessageId(id),
            account_id: AccountId(1),
            from_name: "Alice".to_string(),
            from_address: "alice@example.org".to_string(),
            subject: "Hello".to_string(),
            date: Utc::now(),
            message_type: Default::default(),
            status: Default::default(),
        }
    }

    fn snapshot() -> BusMessage {
        BusMessage::Snapshot {
            accounts: vec![AccountRecord {
                id: AccountId(1),
                name: "Home".to_string(),
                icon: None,
                enabled: true,
            }],
            messages: Vec::new(),
        }
    }

    #[test]
    fn test_messages_before_snapshot_are_dropped() {
        let config = Config::default();
        let mut plugin: Option<DaemonPlugin<MemoryNotifications>> = None;
        let mut backend = Some(MemoryNotifications::new());
        let now = Instant::now();

        handle_message(&config, &mut plugin, &mut backend, BusMessage::DisplayEntered, now);
        assert!(plugin.is_none());
        assert!(backend.is_some());

        handle_message(&config, &mut plugin, &mut backend, snapshot(), now);
        assert!(backend.is_none());
        let p = plugin.as_ref().unwrap();
        assert!(!p.reconciler().is_app_on_screen());
    }

    #[test]
    fn test_bus_messages_drive_the_plugin() {
        let config = Config::default();
        let mut plugin: Option<DaemonPlugin<MemoryNotifications>> = None;
        let mut backend = Some(MemoryNotifications::new());
        let now = Instant::now();

        let sequence = vec![
            snapshot(),
            BusMessage::ActionsChanged {
                actions: vec![ActionSnapshot { id: 1, kind: RequestKind::RetrieveAll }],
            },
            BusMessage::MessagesAdded { messages: vec![message(1)] },
            BusMessage::ActionActivity { id: 1, activity: Activity::Successful },
            BusMessage::ActionsChanged { actions: Vec::new() },
        ];
        for msg in sequence {
            handle_message(&config, &mut plugin, &mut backend, msg, now);
        }

        let p = plugin.as_mut().unwrap();
        let deadline = p.next_deadline().unwrap();
        p.on_timer(deadline);
        let live = p.notifications().live_in(CATEGORY_MESSAGE);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].summary, "Alice");
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn test_corrupt_registry_does_not_block_startup() {
        let dir = tempfile::tempdir().unwrap();
        let registry = dir.path().join("notifications.json");
        std::fs::write(&registry, "{truncated").unwrap();

        let mut config = Config::default();
        config.notifications.registry_path = Some(registry);
        let backend = open_backend(&config);
        assert!(backend.notifications().unwrap().is_empty());

        let mut plugin: Option<DaemonPlugin<Backend>> = None;
        let mut backend = Some(backend);
        handle_message(&config, &mut plugin, &mut backend, snapshot(), Instant::now());
        assert!(plugin.is_some());
    }
}
