use crate::alerts::Coin;
use crate::media::Platform;
use std::sync::Arc;
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::types::{CallbackQuery, Message, MessageId};
use tracing::error;

use super::{dialogue_key, dialogue_key_of_message};

/// Per-user state of the price bot.
///
/// Kept in memory only. An abandoned `AwaitingTargetPrice` lives until the
/// process exits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PriceDialog {
    /// No pending input
    #[default]
    Idle,
    /// The next text message is the target price for `coin`
    AwaitingTargetPrice { coin: Coin },
}

/// Per-user state of the download bot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DownloadDialog {
    #[default]
    Idle,
    /// A supported link was received, a quality preset is awaited on the
    /// buttons of message `prompt`
    AwaitingQuality {
        url: String,
        platform: Platform,
        prompt: MessageId,
    },
}

pub type PriceDialogue = Dialogue<PriceDialog, InMemStorage<PriceDialog>>;
pub type DownloadDialogue = Dialogue<DownloadDialog, InMemStorage<DownloadDialog>>;

/// Dialogue of the user who pressed a button
pub fn query_dialogue<D>(
    q: CallbackQuery,
    storage: Arc<InMemStorage<D>>,
) -> Dialogue<D, InMemStorage<D>>
where
    D: Clone + Send + 'static,
{
    Dialogue::new(storage, dialogue_key(q.from.id))
}

/// Dialogue of the user who sent a message
pub fn message_dialogue<D>(
    msg: Message,
    storage: Arc<InMemStorage<D>>,
) -> Dialogue<D, InMemStorage<D>>
where
    D: Clone + Send + 'static,
{
    Dialogue::new(storage, dialogue_key_of_message(&msg))
}

/// Current state of a dialogue. Storage failures drop the update.
pub async fn current_state<D>(dialogue: Dialogue<D, InMemStorage<D>>) -> Option<D>
where
    D: Clone + Default + Send + 'static,
{
    match dialogue.get_or_default().await {
        Ok(state) => Some(state),
        Err(e) => {
            error!("Dialogue storage error: {e}");
            None
        }
    }
}
