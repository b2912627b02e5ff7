//! Bus messages exchanged with the mail daemon

use serde::{Deserialize, Serialize};

use crate::actions::{ActionId, ActionSnapshot, Activity};
use crate::app::Event;
use crate::store::{AccountId, AccountRecord, MessageId, MessageMeta, SnapshotStore};

/// Messages received on the bus socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMessage {
    /// Full content of the mail store
    Snapshot {
        #[serde(default)]
        accounts: Vec<AccountRecord>,
        #[serde(default)]
        messages: Vec<MessageMeta>,
    },
    MessagesAdded { messages: Vec<MessageMeta> },
    MessagesUpdated { messages: Vec<MessageMeta> },
    MessagesRemoved { ids: Vec<MessageId> },
    AccountChanged { account: AccountRecord },
    AccountRemoved { id: AccountId },
    ActionsChanged {
        #[serde(default)]
        actions: Vec<ActionSnapshot>,
    },
    ActionActivity { id: ActionId, activity: Activity },
    ActionProgress { id: ActionId, value: u32, total: u32 },
    ActionAccount { id: ActionId, account: AccountId },
    DisplayEntered,
    DisplayExit,
    CombinedInboxDisplayed,
    AccountInboxDisplayed { account: AccountId },
}

impl BusMessage {
    pub fn is_snapshot(&self) -> bool {
        matches!(self, BusMessage::Snapshot { .. })
    }

    /// Apply the store changes carried by the message and return the event
    /// for the plugin, if any.
    pub fn apply(self, store: &mut SnapshotStore) -> Option<Event> {
        match self {
            BusMessage::Snapshot { accounts, messages } => {
                store.reset(accounts, messages);
                Some(Event::StoreReset)
            }
            BusMessage::MessagesAdded { messages } => {
                Some(Event::MessagesAdded(upsert_all(store, messages)))
            }
            BusMessage::MessagesUpdated { messages } => {
                Some(Event::MessagesUpdated(upsert_all(store, messages)))
            }
            BusMessage::MessagesRemoved { ids } => {
                for id in &ids {
                    store.remove_message(*id);
                }
                Some(Event::MessagesRemoved(ids))
            }
            BusMessage::AccountChanged { account } => {
                store.upsert_account(account);
                None
            }
            BusMessage::AccountRemoved { id } => {
                store.remove_account(id);
                None
            }
            BusMessage::ActionsChanged { actions } => Some(Event::ActionsChanged(actions)),
            BusMessage::ActionActivity { id, activity } => Some(Event::ActionActivity { id, activity }),
            BusMessage::ActionProgress { id, value, total } => {
                Some(Event::ActionProgress { id, value, total })
            }
            BusMessage::ActionAccount { id, account } => Some(Event::ActionAccount { id, account }),
            BusMessage::DisplayEntered => Some(Event::DisplayEntered),
            BusMessage::DisplayExit => Some(Event::DisplayExit),
            BusMessage::CombinedInboxDisplayed => Some(Event::CombinedInboxDisplayed),
            BusMessage::AccountInboxDisplayed { account } => Some(Event::AccountInboxDisplayed(account)),
        }
    }
}

fn upsert_all(store: &mut SnapshotStore, messages: Vec<MessageMeta>) -> Vec<MessageId> {
    messages.into_iter().map(|m| store.upsert_message(m)).collect()
}
