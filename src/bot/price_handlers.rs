//! Handlers of the price-alert bot.

use super::callbacks::PriceAction;
use super::keyboards::{coin_list, language_menu, main_menu};
use super::resilient::{edit_or_send, send_text_resilient};
use super::state::{PriceDialog, PriceDialogue};
use super::{user_key, user_key_of_message};
use crate::alerts::i18n::{render, SELECT_LANGUAGE};
use crate::alerts::service::{alerts_text, create_alert, price_text};
use crate::alerts::{AlertStore, Coin, PriceSource};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

/// Commands of the price-alert bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum PriceCommand {
    #[command(description = "Show the main menu.")]
    Start,
    #[command(description = "List your active alerts.")]
    Alerts,
    #[command(description = "Cancel the alert you are setting up.")]
    Cancel,
    #[command(description = "Show this help.")]
    Help,
}

/// Register the user if needed and show the main menu.
///
/// Also drops any pending target input.
///
/// # Errors
///
/// Returns an error if the dialogue cannot be reset or the reply fails.
pub async fn start(
    bot: Bot,
    msg: Message,
    store: Arc<AlertStore>,
    dialogue: PriceDialogue,
) -> Result<()> {
    let user_id = user_key_of_message(&msg);
    info!("Start command received from user {user_id}.");

    let user = store.ensure_user(&user_id).await;
    dialogue
        .update(PriceDialog::Idle)
        .await
        .map_err(|e| anyhow!(e.to_string()))?;

    send_text_resilient(
        &bot,
        msg.chat.id,
        user.lang.texts().welcome,
        Some(main_menu(user.lang)),
    )
    .await?;
    Ok(())
}

/// # Errors
///
/// Returns an error if the reply fails.
pub async fn help(bot: Bot, msg: Message, store: Arc<AlertStore>) -> Result<()> {
    let lang = store.lang_of(&user_key_of_message(&msg)).await;
    send_text_resilient(&bot, msg.chat.id, lang.texts().help, None).await?;
    Ok(())
}

/// # Errors
///
/// Returns an error if the reply fails.
pub async fn list_alerts(bot: Bot, msg: Message, store: Arc<AlertStore>) -> Result<()> {
    let text = alerts_text(&store, &user_key_of_message(&msg)).await;
    send_text_resilient(&bot, msg.chat.id, text, None).await?;
    Ok(())
}

/// Leave `AwaitingTargetPrice` without creating an alert.
///
/// # Errors
///
/// Returns an error if the dialogue storage or the reply fails.
pub async fn cancel(
    bot: Bot,
    msg: Message,
    store: Arc<AlertStore>,
    dialogue: PriceDialogue,
) -> Result<()> {
    let texts = store.lang_of(&user_key_of_message(&msg)).await.texts();
    let pending = dialogue
        .get()
        .await
        .map_err(|e| anyhow!(e.to_string()))?
        .is_some_and(|state| state != PriceDialog::Idle);

    let reply = if pending {
        dialogue.exit().await.map_err(|e| anyhow!(e.to_string()))?;
        texts.cancelled
    } else {
        texts.nothing_to_cancel
    };
    send_text_resilient(&bot, msg.chat.id, reply, None).await?;
    Ok(())
}

/// Menu button presses.
///
/// Menu screens are drawn by editing the message holding the buttons.
///
/// # Errors
///
/// Returns an error if the dialogue storage fails.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    store: Arc<AlertStore>,
    prices: Arc<dyn PriceSource>,
    dialogue: PriceDialogue,
) -> Result<()> {
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };

    let _ = bot.answer_callback_query(q.id.clone()).await;

    let user_id = user_key(&q.from);
    let Some((chat_id, msg_id)) = q.message.as_ref().map(|m| (m.chat().id, m.id())) else {
        warn!("Callback `{data}` from user {user_id} has no message");
        return Ok(());
    };
    let lang = store.lang_of(&user_id).await;
    let texts = lang.texts();

    let (text, markup) = match PriceAction::parse(data) {
        Some(PriceAction::PriceMenu) => (
            texts.select_coin.to_string(),
            Some(coin_list(PriceAction::ShowPrice)),
        ),
        Some(PriceAction::AlertMenu) => (
            texts.select_coin.to_string(),
            Some(coin_list(PriceAction::PickAlertCoin)),
        ),
        Some(PriceAction::LanguageMenu) => (SELECT_LANGUAGE.to_string(), Some(language_menu())),
        Some(PriceAction::ShowPrice(coin)) => {
            let text = match price_text(prices.as_ref(), coin, lang).await {
                Some(text) => text,
                None => render(texts.price_unavailable, &[("coin", coin.display_name())]),
            };
            (text, None)
        }
        Some(PriceAction::PickAlertCoin(coin)) => {
            dialogue
                .update(PriceDialog::AwaitingTargetPrice { coin })
                .await
                .map_err(|e| anyhow!(e.to_string()))?;
            info!(user_id = %user_id, coin = coin.id(), "Awaiting target price");
            (
                render(texts.enter_price, &[("coin", coin.display_name())]),
                None,
            )
        }
        Some(PriceAction::SetLang(new_lang)) => {
            store.set_lang(&user_id, new_lang).await;
            info!(user_id = %user_id, lang = new_lang.code(), "Language changed");
            (
                new_lang.texts().welcome.to_string(),
                Some(main_menu(new_lang)),
            )
        }
        Some(PriceAction::UnknownCoin) | None => {
            warn!("Unknown callback data `{data}` from user {user_id}");
            (texts.unknown_coin.to_string(), None)
        }
    };

    edit_or_send(&bot, chat_id, Some(msg_id), &text, markup).await;
    Ok(())
}

/// Text received while a target price for `coin` is awaited.
///
/// # Errors
///
/// Returns an error if the dialogue storage or the reply fails.
pub async fn receive_target_price(
    bot: Bot,
    msg: Message,
    store: Arc<AlertStore>,
    prices: Arc<dyn PriceSource>,
    dialogue: PriceDialogue,
    coin: Coin,
) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let user_id = user_key_of_message(&msg);

    let reply =
        submit_target_price(&store, prices.as_ref(), &dialogue, &user_id, coin, text).await?;
    send_text_resilient(&bot, msg.chat.id, reply, None).await?;
    Ok(())
}

/// Create the alert typed by the user and return the reply.
///
/// The dialogue goes back to idle only when the alert is stored. Invalid
/// input and an unavailable reference price keep the pending coin so the
/// user can simply try again.
///
/// # Errors
///
/// Returns an error if the dialogue storage fails.
pub async fn submit_target_price(
    store: &AlertStore,
    prices: &dyn PriceSource,
    dialogue: &PriceDialogue,
    user_id: &str,
    coin: Coin,
    text: &str,
) -> Result<String> {
    match create_alert(store, prices, user_id, coin, text).await {
        Ok(confirmation) => {
            dialogue.exit().await.map_err(|e| anyhow!(e.to_string()))?;
            Ok(confirmation)
        }
        Err(e) => {
            info!(user_id = %user_id, coin = coin.id(), "Target price rejected: {e}");
            Ok(e.user_message(store.lang_of(user_id).await, coin))
        }
    }
}
