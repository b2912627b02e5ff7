//! Lazily populated account display properties

use std::collections::HashMap;

use super::{AccountId, MailStore};

/// Display name and icon of an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountProperties {
    pub display_name: String,
    pub icon: Option<String>,
}

/// Account property cache.
///
/// Entries are filled on first lookup and kept for the lifetime of the
/// process; account renames are rare compared to mail traffic.
#[derive(Debug, Default)]
pub struct AccountsCache {
    entries: HashMap<AccountId, AccountProperties>,
}

impl AccountsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Properties for `id`, querying the store on a miss.
    ///
    /// Returns `None` for invalid or unknown accounts; misses are not cached.
    pub fn lookup<S: MailStore>(&mut self, store: &S, id: AccountId) -> Option<AccountProperties> {
        if !id.is_valid() {
            return None;
        }
        if let Some(props) = self.entries.get(&id) {
            return Some(props.clone());
        }

        let record = store.account(id)?;
        let props = AccountProperties {
            display_name: record.name,
            icon: record.icon,
        };
        tracing::debug!("Cached properties for account {}", id);
        self.entries.insert(id, props.clone());
        Some(props)
    }

    /// Display name for `id`, or the numeric id when the account is unknown.
    pub fn display_name<S: MailStore>(&mut self, store: &S, id: AccountId) -> String {
        match self.lookup(store, id) {
            Some(props) => props.display_name,
            None => {
                tracing::warn!("No account properties for account {}", id);
                id.to_string()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
