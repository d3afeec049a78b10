//! Operations behind the price bot menu, independent of Telegram.

use super::coins::Coin;
use super::fetcher::PriceSource;
use super::i18n::{render, Lang};
use super::model::{format_change, format_price, Alert};
use super::store::AlertStore;
use thiserror::Error;

/// Why a target price could not become an alert
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertInputError {
    /// The text is not a finite, positive number
    #[error("not a valid target price")]
    InvalidNumber,
    /// The reference price could not be fetched
    #[error("reference price unavailable")]
    PriceUnavailable,
}

impl AlertInputError {
    /// Reply shown to the user
    #[must_use]
    pub fn user_message(self, lang: Lang, coin: Coin) -> String {
        let texts = lang.texts();
        match self {
            Self::InvalidNumber => texts.invalid_number.to_string(),
            Self::PriceUnavailable => {
                render(texts.price_unavailable, &[("coin", coin.display_name())])
            }
        }
    }
}

/// Parse a target price typed by the user.
///
/// Surrounding whitespace is ignored. Only finite numbers above zero pass.
///
/// # Errors
///
/// Returns [`AlertInputError::InvalidNumber`] for anything else.
pub fn parse_target(text: &str) -> Result<f64, AlertInputError> {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(AlertInputError::InvalidNumber),
    }
}

/// Current price message for one coin, `None` when no quote is available
pub async fn price_text(prices: &dyn PriceSource, coin: Coin, lang: Lang) -> Option<String> {
    let quote = prices.quote(coin.id()).await?;
    Some(render(
        lang.texts().current_price,
        &[
            ("coin", coin.display_name()),
            ("price", &format_price(quote.price)),
            ("change", &format_change(quote.change_24h)),
        ],
    ))
}

/// Create an alert from the text a user typed for `coin`.
///
/// The current price becomes the reference that fixes the direction.
/// On success the alert is stored and the confirmation text returned.
///
/// # Errors
///
/// Returns an [`AlertInputError`] if the text is not a valid target or the
/// reference price cannot be fetched. Nothing is stored in either case.
pub async fn create_alert(
    store: &AlertStore,
    prices: &dyn PriceSource,
    user_id: &str,
    coin: Coin,
    text: &str,
) -> Result<String, AlertInputError> {
    let target = parse_target(text)?;
    let reference = prices
        .quote(coin.id())
        .await
        .map(|q| q.price)
        .filter(|p| p.is_finite() && *p > 0.0)
        .ok_or(AlertInputError::PriceUnavailable)?;

    store
        .add_alert(user_id, Alert::new(coin, target, reference))
        .await;
    let lang = store.lang_of(user_id).await;
    tracing::info!(user_id, coin = coin.id(), target, reference, "Alert created");

    Ok(render(
        lang.texts().alert_set,
        &[("coin", coin.display_name()), ("price", &format_price(target))],
    ))
}

/// Listing of the user's active alerts
pub async fn alerts_text(store: &AlertStore, user_id: &str) -> String {
    let (lang, alerts) = store
        .read(|data| {
            (
                data.lang_of(user_id),
                data.alerts.get(user_id).cloned().unwrap_or_default(),
            )
        })
        .await;
    let texts = lang.texts();
    if alerts.is_empty() {
        return texts.no_alerts.to_string();
    }

    let mut out = String::from(texts.alerts_header);
    for alert in &alerts {
        out.push('\n');
        out.push_str(&render(
            texts.alert_line,
            &[
                ("coin", alert.coin.display_name()),
                ("price", &format_price(alert.price)),
                ("reference", &format_price(alert.original_price)),
            ],
        ));
    }
    out
}
