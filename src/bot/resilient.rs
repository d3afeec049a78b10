//! Telegram sends with automatic retry.
//!
//! Wraps outgoing texts and menu edits in
//! [`crate::utils::retry_telegram_operation`] so transient network failures
//! do not lose a message.

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, Message, MessageId};
use tracing::{debug, warn};

/// Telegram refuses texts longer than this
const MAX_MESSAGE_CHARS: usize = 4096;

const ERROR_NOT_MODIFIED: &str = "message is not modified";
const ERROR_NOT_FOUND: &str = "message to edit not found";

fn clamp(text: String) -> String {
    if text.chars().count() > MAX_MESSAGE_CHARS {
        crate::utils::truncate_str(&text, MAX_MESSAGE_CHARS)
    } else {
        text
    }
}

/// Send a text, optionally with an inline keyboard, retrying on network
/// failures.
///
/// # Errors
///
/// Returns the last error once all retries are exhausted.
pub async fn send_text_resilient(
    bot: &Bot,
    chat_id: ChatId,
    text: impl Into<String>,
    markup: Option<InlineKeyboardMarkup>,
) -> Result<Message> {
    let text = clamp(text.into());
    crate::utils::retry_telegram_operation(|| async {
        let mut req = bot.send_message(chat_id, text.clone());
        if let Some(markup) = markup.clone() {
            req = req.reply_markup(markup);
        }
        req.await
            .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
    })
    .await
}

/// Edit a message, retrying on network failures.
///
/// # Errors
///
/// Returns the last error once all retries are exhausted.
pub async fn edit_text_resilient(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    text: impl Into<String>,
    markup: Option<InlineKeyboardMarkup>,
) -> Result<Message> {
    let text = clamp(text.into());
    crate::utils::retry_telegram_operation(|| async {
        let mut req = bot.edit_message_text(chat_id, msg_id, text.clone());
        if let Some(markup) = markup.clone() {
            req = req.reply_markup(markup);
        }
        req.await
            .map_err(|e| anyhow::anyhow!("Telegram edit error: {e}"))
    })
    .await
}

/// Errors that mean the edit had nothing to do
#[must_use]
pub fn is_benign_edit_error(message: &str) -> bool {
    message.contains(ERROR_NOT_MODIFIED) || message.contains(ERROR_NOT_FOUND)
}

/// Edit a menu message in place, falling back to a new message when the
/// original can no longer be edited.
///
/// Returns `true` if the text reached the chat.
pub async fn edit_or_send(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: Option<MessageId>,
    text: &str,
    markup: Option<InlineKeyboardMarkup>,
) -> bool {
    if let Some(msg_id) = msg_id {
        match edit_text_resilient(bot, chat_id, msg_id, text, markup.clone()).await {
            Ok(_) => return true,
            Err(e) if e.to_string().contains(ERROR_NOT_MODIFIED) => {
                debug!("Message update skipped: {e}");
                return true;
            }
            Err(e) if is_benign_edit_error(&e.to_string()) => {
                debug!("Message to edit is gone, sending a new one: {e}");
            }
            Err(e) => warn!("Failed to edit message after retries: {e}"),
        }
    }

    match send_text_resilient(bot, chat_id, text, markup).await {
        Ok(_) => true,
        Err(e) => {
            warn!("Failed to send message after retries: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benign_edit_errors() {
        assert!(is_benign_edit_error(
            "Telegram edit error: Bad Request: message is not modified: specified new message content and reply markup are exactly the same"
        ));
        assert!(is_benign_edit_error(
            "Telegram edit error: Bad Request: message to edit not found"
        ));
        assert!(!is_benign_edit_error("Telegram edit error: Network error"));
    }

    #[test]
    fn test_long_texts_are_clamped() {
        let text = "ب".repeat(MAX_MESSAGE_CHARS + 10);
        assert_eq!(clamp(text).chars().count(), MAX_MESSAGE_CHARS);
        assert_eq!(clamp("short".into()), "short");
    }
}
