//! Users, alerts and the crossing condition.

use super::coins::Coin;
use super::i18n::Lang;
use serde::{Deserialize, Serialize};

/// Persisted user record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    /// Language preference
    pub lang: Lang,
}

/// Direction an alert waits for, inferred from the reference price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Target above the reference: fire when the price rises to it
    Up,
    /// Target below the reference: fire when the price falls to it
    Down,
    /// Target equal to the reference. Such an alert never fires.
    Flat,
}

/// One-shot price alert
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub coin: Coin,
    /// Target price in USD
    pub price: f64,
    /// Price observed when the alert was created
    pub original_price: f64,
}

impl Alert {
    #[must_use]
    pub const fn new(coin: Coin, target: f64, reference: f64) -> Self {
        Self {
            coin,
            price: target,
            original_price: reference,
        }
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        if self.price > self.original_price {
            Direction::Up
        } else if self.price < self.original_price {
            Direction::Down
        } else {
            Direction::Flat
        }
    }

    /// Crossing condition: has `current` reached the target in the
    /// direction set at creation time?
    #[must_use]
    pub fn is_triggered_by(&self, current: f64) -> bool {
        match self.direction() {
            Direction::Up => current >= self.price,
            Direction::Down => current <= self.price,
            Direction::Flat => false,
        }
    }
}

/// Render a USD amount the way messages show it: no trailing `.0`.
///
/// # Examples
///
/// ```
/// use coin_media_bots::alerts::model::format_price;
/// assert_eq!(format_price(55000.0), "55000");
/// assert_eq!(format_price(0.0000123), "0.0000123");
/// ```
#[must_use]
pub fn format_price(value: f64) -> String {
    format!("{value}")
}

/// Render a percentage change rounded to two decimals
#[must_use]
pub fn format_change(value: f64) -> String {
    format!("{value:.2}")
}
