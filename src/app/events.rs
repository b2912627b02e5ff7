use crate::actions::{ActionId, ActionSnapshot, Activity};
use crate::store::{AccountId, MessageId};

/// Events delivered to the plugin
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Messages were added to the mail store
    MessagesAdded(Vec<MessageId>),
    /// Message metadata or status changed
    MessagesUpdated(Vec<MessageId>),
    /// Messages were deleted from the mail store
    MessagesRemoved(Vec<MessageId>),
    /// The mail store content was replaced wholesale
    StoreReset,
    /// New listing of the action queue
    ActionsChanged(Vec<ActionSnapshot>),
    ActionActivity { id: ActionId, activity: Activity },
    ActionProgress { id: ActionId, value: u32, total: u32 },
    /// The action started working on an account
    ActionAccount { id: ActionId, account: AccountId },
    /// The mail UI came to the foreground
    DisplayEntered,
    /// The mail UI left the foreground
    DisplayExit,
    CombinedInboxDisplayed,
    AccountInboxDisplayed(AccountId),
}
