use super::resilient::send_text_resilient;
use crate::alerts::AlertNotifier;
use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;

/// Sends alert messages to the private chat of each user
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Chat of a user id stored as decimal text. In private chats the chat id
/// equals the user id.
///
/// # Errors
///
/// Returns an error if `user_id` is not a decimal integer.
pub fn chat_of(user_id: &str) -> Result<ChatId> {
    user_id
        .parse::<i64>()
        .map(ChatId)
        .with_context(|| format!("invalid user id `{user_id}`"))
}

#[async_trait]
impl AlertNotifier for TelegramNotifier {
    async fn notify(&self, user_id: &str, text: &str) -> Result<()> {
        let chat_id = chat_of(user_id)?;
        send_text_resilient(&self.bot, chat_id, text, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_of() {
        assert_eq!(chat_of("123456789").ok(), Some(ChatId(123_456_789)));
        assert!(chat_of("not-a-user").is_err());
        assert!(chat_of("").is_err());
    }
}
