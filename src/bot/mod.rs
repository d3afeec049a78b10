/// Inline button payloads
pub mod callbacks;
/// Inline keyboards of both bots
pub mod keyboards;
/// Download bot handlers
pub mod media_handlers;
/// Alert delivery through Telegram
pub mod notifier;
/// Price bot handlers
pub mod price_handlers;
/// Telegram sends with retry
pub mod resilient;
/// Dialogue states
pub mod state;

use teloxide::types::{ChatId, Message, User, UserId};

/// Store key of a Telegram user: the numeric id in decimal
#[must_use]
pub fn user_key(user: &User) -> String {
    user.id.0.to_string()
}

/// Store key of the sender of `msg`, falling back to the chat id when the
/// sender is unknown
#[must_use]
pub fn user_key_of_message(msg: &Message) -> String {
    msg.from
        .as_ref()
        .map_or_else(|| msg.chat.id.0.to_string(), user_key)
}

/// Dialogue storage key of a user. Pending input belongs to the user, so
/// members of one group chat never answer each other's prompts.
#[must_use]
pub fn dialogue_key(user: UserId) -> ChatId {
    ChatId::from(user)
}

/// Dialogue key of the sender of `msg`, the chat when the sender is unknown
#[must_use]
pub fn dialogue_key_of_message(msg: &Message) -> ChatId {
    msg.from
        .as_ref()
        .map_or(msg.chat.id, |user| dialogue_key(user.id))
}

/// Text Telegram treats as a bot command, known to this bot or not
#[must_use]
pub fn is_command(text: &str) -> bool {
    text.starts_with('/')
}
