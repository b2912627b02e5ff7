//! Freedesktop notification backend using notify-rust.
//!
//! The notification server cannot enumerate what it shows, so published
//! notifications (with their hints) are mirrored into a JSON registry file.
//! After a restart the registry is what crash recovery reads back.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use notify_rust::{Hint, NotificationHandle, Timeout};
use tracing::{debug, warn};

use super::{Notification, NotificationId, NotificationService, HINT_TRANSIENT};
use crate::error::{NotifierError, Result};

/// Default location of the live notification registry
pub fn default_registry_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "mailbox-notifier")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("mailbox-notifier"))
        .join("notifications.json")
}

pub struct DesktopNotifier {
    registry_path: PathBuf,
    live: BTreeMap<NotificationId, Notification>,
    handles: HashMap<NotificationId, NotificationHandle>,
}

impl DesktopNotifier {
    /// Open the backend, loading notifications recorded by an earlier run.
    ///
    /// An unreadable registry is moved aside and the backend starts empty;
    /// notifications it listed are then left to expire on their own.
    pub fn open(registry_path: &Path) -> Self {
        let live = match load_registry(registry_path) {
            Ok(live) => live,
            Err(e) => {
                warn!("Discarding notification registry {}: {}", registry_path.display(), e);
                let aside = registry_path.with_extension("json.corrupt");
                if let Err(e) = std::fs::rename(registry_path, &aside) {
                    warn!("Failed to move corrupt registry aside: {}", e);
                }
                BTreeMap::new()
            }
        };
        debug!("Loaded {} notifications from {}", live.len(), registry_path.display());

        Self {
            registry_path: registry_path.to_path_buf(),
            live,
            handles: HashMap::new(),
        }
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.registry_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let entries: Vec<&Notification> = self.live.values().collect();
        let content = serde_json::to_string_pretty(&entries)?;
        std::fs::write(&self.registry_path, content)
            .map_err(|e| NotifierError::Registry(e.to_string()))
    }

    fn save_or_warn(&self) {
        if let Err(e) = self.save() {
            warn!("Failed to save notification registry: {}", e);
        }
    }
}

fn load_registry(path: &Path) -> Result<BTreeMap<NotificationId, Notification>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content =
        std::fs::read_to_string(path).map_err(|e| NotifierError::Registry(e.to_string()))?;
    let entries: Vec<Notification> =
        serde_json::from_str(&content).map_err(|e| NotifierError::Registry(e.to_string()))?;
    Ok(entries
        .into_iter()
        .filter_map(|n| n.id.map(|id| (id, n)))
        .collect())
}

fn build(notification: &Notification) -> notify_rust::Notification {
    let mut desktop = notify_rust::Notification::new();

    // Banners only carry preview texts
    let (summary, body) = if notification.summary.is_empty() {
        (&notification.preview_summary, &notification.preview_body)
    } else {
        (&notification.summary, &notification.body)
    };

    desktop
        .appname(&notification.app_name)
        .summary(summary)
        .body(body)
        .hint(Hint::Category(notification.category.clone()));

    if let Some(icon) = &notification.icon {
        desktop.icon(icon);
    }
    for (key, value) in &notification.hints {
        if key != HINT_TRANSIENT {
            desktop.hint(Hint::Custom(key.clone(), value.clone()));
        }
    }
    for action in &notification.remote_actions {
        desktop.action(&action.name, &action.display_name);
    }
    if let Some(id) = notification.id {
        desktop.id(id);
    }

    if notification.is_transient() {
        desktop.hint(Hint::Transient(true)).timeout(Timeout::Default);
    } else {
        desktop.timeout(Timeout::Never);
    }
    desktop
}

impl NotificationService for DesktopNotifier {
    fn publish(&mut self, notification: &Notification) -> Result<NotificationId> {
        let handle = build(notification)
            .show()
            .map_err(|e| NotifierError::Notification(e.to_string()))?;
        let id = handle.id();
        debug!(id, category = %notification.category, "Notification shown");

        if notification.is_transient() {
            return Ok(id);
        }

        if let Some(previous) = notification.id.filter(|previous| *previous != id) {
            // The server no longer knew the replaced notification
            self.live.remove(&previous);
        }
        let mut stored = notification.clone();
        stored.id = Some(id);
        self.live.insert(id, stored);
        self.handles.insert(id, handle);
        self.save_or_warn();
        Ok(id)
    }

    fn close(&mut self, id: NotificationId) -> Result<()> {
        let result = match self.handles.remove(&id) {
            Some(handle) => {
                handle.close();
                Ok(())
            }
            None => {
                // Shown by an earlier run: take the id over, then close it
                notify_rust::Notification::new()
                    .id(id)
                    .timeout(Timeout::Milliseconds(1))
                    .show()
                    .map(NotificationHandle::close)
                    .map_err(|e| NotifierError::Notification(e.to_string()))
            }
        };

        self.live.remove(&id);
        self.save_or_warn();
        result
    }

    fn notifications(&self) -> Result<Vec<Notification>> {
        Ok(self.live.values().cloned().collect())
    }
}
