//! In-process notification service.
//!
//! Keeps live notifications in memory and records every call made to it.
//! Used where no desktop notification server is available, and as the
//! service double in tests.

use std::collections::BTreeMap;

use super::{Notification, NotificationId, NotificationService};
use crate::error::{NotifierError, Result};

/// A call received by [`MemoryNotifications`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    Publish(Notification),
    Close(NotificationId),
}

#[derive(Debug, Default)]
pub struct MemoryNotifications {
    next_id: NotificationId,
    live: BTreeMap<NotificationId, Notification>,
    calls: Vec<ServiceCall>,
    failing: bool,
}

impl MemoryNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with notifications left over from an earlier run
    pub fn with_live(notifications: impl IntoIterator<Item = Notification>) -> Self {
        let mut service = Self::new();
        for mut notification in notifications {
            let id = match notification.id {
                Some(id) => id,
                None => service.allocate_id(),
            };
            service.next_id = service.next_id.max(id);
            notification.id = Some(id);
            service.live.insert(id, notification);
        }
        service
    }

    /// Make every following call fail
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    pub fn calls(&self) -> &[ServiceCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn live(&self) -> impl Iterator<Item = &Notification> {
        self.live.values()
    }

    pub fn live_in(&self, category: &str) -> Vec<&Notification> {
        self.live.values().filter(|n| n.category == category).collect()
    }

    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.live.get(&id)
    }

    /// Published notifications in call order, including transient ones
    pub fn published(&self) -> Vec<&Notification> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                ServiceCall::Publish(n) => Some(n),
                ServiceCall::Close(_) => None,
            })
            .collect()
    }

    fn allocate_id(&mut self) -> NotificationId {
        self.next_id += 1;
        self.next_id
    }
}

impl NotificationService for MemoryNotifications {
    fn publish(&mut self, notification: &Notification) -> Result<NotificationId> {
        if self.failing {
            return Err(NotifierError::Notification("service unavailable".to_string()));
        }

        let id = match notification.id {
            Some(id) => id,
            None => self.allocate_id(),
        };
        let mut stored = notification.clone();
        stored.id = Some(id);
        tracing::debug!(id, category = %stored.category, summary = %stored.summary, "publish");
        self.calls.push(ServiceCall::Publish(stored.clone()));

        if stored.is_transient() {
            self.live.remove(&id);
        } else {
            self.live.insert(id, stored);
        }
        Ok(id)
    }

    fn close(&mut self, id: NotificationId) -> Result<()> {
        if self.failing {
            return Err(NotifierError::Notification("service unavailable".to_string()));
        }
        tracing::debug!(id, "close");
        self.calls.push(ServiceCall::Close(id));
        self.live.remove(&id);
        Ok(())
    }

    fn notifications(&self) -> Result<Vec<Notification>> {
        if self.failing {
            return Err(NotifierError::Notification("service unavailable".to_string()));
        }
        Ok(self.live.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{CATEGORY_MESSAGE, CATEGORY_SUMMARY, HINT_TRANSIENT};

    #[test]
    fn test_publish_assigns_and_replaces_ids() {
        let mut service = MemoryNotifications::new();
        let mut n = Notification::new(CATEGORY_MESSAGE);
        n.summary = "first".to_string();
        let id = service.publish(&n).unwrap();

        n.id = Some(id);
        n.summary = "second".to_string();
        assert_eq!(service.publish(&n).unwrap(), id);
        assert_eq!(service.live().count(), 1);
        assert_eq!(service.get(id).unwrap().summary, "second");
    }

    #[test]
    fn test_transient_notifications_are_not_kept() {
        let mut service = MemoryNotifications::new();
        let mut banner = Notification::new(CATEGORY_SUMMARY);
        banner.set_hint(HINT_TRANSIENT, "true");
        service.publish(&banner).unwrap();
        assert_eq!(service.live().count(), 0);
        assert_eq!(service.published().len(), 1);
    }

    #[test]
    fn test_with_live_continues_id_sequence() {
        let mut old = Notification::new(CATEGORY_MESSAGE);
        old.id = Some(10);
        let mut service = MemoryNotifications::with_live(vec![old]);
        let id = service.publish(&Notification::new(CATEGORY_MESSAGE)).unwrap();
        assert_eq!(id, 11);
    }

    #[test]
    fn test_failing_service() {
        let mut service = MemoryNotifications::new();
        service.set_failing(true);
        assert!(service.publish(&Notification::new(CATEGORY_MESSAGE)).is_err());
        assert!(service.close(1).is_err());
        assert!(service.notifications().is_err());
        assert!(service.calls().is_empty());
    }
}
