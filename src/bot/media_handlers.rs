//! Handlers of the media-download bot.

use super::callbacks::parse_quality;
use super::keyboards::quality_menu;
use super::resilient::{edit_or_send, send_text_resilient};
use super::state::{DownloadDialog, DownloadDialogue};
use super::user_key_of_message;
use crate::media::platform::detect;
use crate::media::{DownloadRequest, FileSink, MediaDispatcher, Platform};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId};
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

const USAGE: &str = "Send me a YouTube or Instagram link and pick a quality.\n\n\
Low is up to 480p, Medium up to 720p, High is the best available.";
const UNSUPPORTED_LINK: &str = "Unsupported link. Send a YouTube or Instagram URL.";
const LINK_EXPIRED: &str = "This link is no longer pending. Please send it again.";

/// Commands of the media-download bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum MediaCommand {
    #[command(description = "Show how to use the bot.")]
    Start,
    #[command(description = "Show this help.")]
    Help,
}

/// [`FileSink`] delivering through the Bot API
pub struct TelegramFileSink {
    bot: Bot,
}

impl TelegramFileSink {
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl FileSink for TelegramFileSink {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        send_text_resilient(&self.bot, ChatId(chat_id), text, None).await?;
        Ok(())
    }

    async fn send_video(&self, chat_id: i64, path: &Path) -> Result<()> {
        self.bot
            .send_video(ChatId(chat_id), InputFile::file(path.to_path_buf()))
            .await
            .map_err(|e| anyhow!("Telegram upload error: {e}"))?;
        Ok(())
    }
}

/// `/start` and `/help`
///
/// # Errors
///
/// Returns an error if the dialogue cannot be reset or the reply fails.
pub async fn start(bot: Bot, msg: Message, dialogue: DownloadDialogue) -> Result<()> {
    info!(
        "Start command received from user {}.",
        user_key_of_message(&msg)
    );
    dialogue.exit().await.map_err(|e| anyhow!(e.to_string()))?;
    send_text_resilient(&bot, msg.chat.id, USAGE, None).await?;
    Ok(())
}

/// A text message: look for a supported link and offer the presets.
///
/// # Errors
///
/// Returns an error if the dialogue storage or the reply fails.
pub async fn handle_link(bot: Bot, msg: Message, dialogue: DownloadDialogue) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let Some((url, platform)) = detect(text) else {
        send_text_resilient(&bot, msg.chat.id, UNSUPPORTED_LINK, None).await?;
        return Ok(());
    };

    info!(
        user_id = %user_key_of_message(&msg),
        %platform,
        "Link received"
    );
    let text = format!("{platform} link received. Choose a quality:");
    let prompt = send_text_resilient(&bot, msg.chat.id, text, Some(quality_menu())).await?;
    dialogue
        .update(DownloadDialog::AwaitingQuality {
            url,
            platform,
            prompt: prompt.id,
        })
        .await
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

/// Link behind the preset buttons of message `pressed`. Buttons under an
/// older prompt no longer match once a newer link was sent.
#[must_use]
pub fn pending_link(
    state: Option<DownloadDialog>,
    pressed: MessageId,
) -> Option<(String, Platform)> {
    match state? {
        DownloadDialog::AwaitingQuality {
            url,
            platform,
            prompt,
        } if prompt == pressed => Some((url, platform)),
        _ => None,
    }
}

/// A preset button: start the download on its own task.
///
/// # Errors
///
/// Returns an error if the dialogue storage fails.
pub async fn handle_quality(
    bot: Bot,
    q: CallbackQuery,
    dialogue: DownloadDialogue,
    dispatcher: Arc<MediaDispatcher>,
) -> Result<()> {
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };

    let _ = bot.answer_callback_query(q.id.clone()).await;

    let Some((chat_id, msg_id)) = q.message.as_ref().map(|m| (m.chat().id, m.id())) else {
        warn!("Callback `{data}` has no message");
        return Ok(());
    };

    let Some(quality) = parse_quality(data) else {
        warn!("Unknown callback data `{data}`");
        return Ok(());
    };

    let state = dialogue.get().await.map_err(|e| anyhow!(e.to_string()))?;
    let Some((url, platform)) = pending_link(state, msg_id) else {
        edit_or_send(&bot, chat_id, Some(msg_id), LINK_EXPIRED, None).await;
        return Ok(());
    };
    dialogue.exit().await.map_err(|e| anyhow!(e.to_string()))?;

    info!(chat_id = chat_id.0, %platform, quality = quality.code(), "Download requested");
    edit_or_send(
        &bot,
        chat_id,
        Some(msg_id),
        &format!("Downloading in {}…", quality.label()),
        None,
    )
    .await;

    dispatcher.spawn(DownloadRequest {
        chat_id: chat_id.0,
        url,
        platform,
        quality,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        assert_eq!(
            MediaCommand::parse("/start", "media_bot").ok(),
            Some(MediaCommand::Start)
        );
        assert_eq!(
            MediaCommand::parse("/help@media_bot", "media_bot").ok(),
            Some(MediaCommand::Help)
        );
        assert!(MediaCommand::parse("/alerts", "media_bot").is_err());
    }

    fn awaiting(url: &str, prompt: i32) -> Option<DownloadDialog> {
        Some(DownloadDialog::AwaitingQuality {
            url: url.to_string(),
            platform: Platform::YouTube,
            prompt: MessageId(prompt),
        })
    }

    #[test]
    fn test_pending_link_matches_latest_prompt() {
        assert_eq!(
            pending_link(awaiting("https://youtu.be/b", 11), MessageId(11)),
            Some(("https://youtu.be/b".to_string(), Platform::YouTube))
        );
    }

    #[test]
    fn test_stale_prompt_does_not_take_newer_link() {
        // Link A got prompt 10, link B then replaced it with prompt 11
        assert_eq!(
            pending_link(awaiting("https://youtu.be/b", 11), MessageId(10)),
            None
        );
        assert_eq!(pending_link(Some(DownloadDialog::Idle), MessageId(10)), None);
        assert_eq!(pending_link(None, MessageId(10)), None);
    }
}
