//! Inline button payloads.
//!
//! Price bot: `price`, `alert`, `language`, `price_<coin>`, `alert_<coin>`,
//! `lang_<code>`. Download bot: `quality_<preset>`.

use crate::alerts::{Coin, Lang};
use crate::media::Quality;

pub const CALLBACK_PRICE_MENU: &str = "price";
pub const CALLBACK_ALERT_MENU: &str = "alert";
pub const CALLBACK_LANGUAGE_MENU: &str = "language";

const PRICE_PREFIX: &str = "price_";
const ALERT_PREFIX: &str = "alert_";
const LANG_PREFIX: &str = "lang_";
const QUALITY_PREFIX: &str = "quality_";

/// A button press on the price bot menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceAction {
    PriceMenu,
    AlertMenu,
    LanguageMenu,
    ShowPrice(Coin),
    PickAlertCoin(Coin),
    SetLang(Lang),
    /// A coin button whose id is not on the watch list
    UnknownCoin,
}

impl PriceAction {
    /// Parse callback data, `None` for anything unrecognised
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            CALLBACK_PRICE_MENU => return Some(Self::PriceMenu),
            CALLBACK_ALERT_MENU => return Some(Self::AlertMenu),
            CALLBACK_LANGUAGE_MENU => return Some(Self::LanguageMenu),
            _ => {}
        }
        if let Some(id) = data.strip_prefix(PRICE_PREFIX) {
            return Some(Coin::from_id(id).map_or(Self::UnknownCoin, Self::ShowPrice));
        }
        if let Some(id) = data.strip_prefix(ALERT_PREFIX) {
            return Some(Coin::from_id(id).map_or(Self::UnknownCoin, Self::PickAlertCoin));
        }
        data.strip_prefix(LANG_PREFIX)
            .and_then(Lang::from_code)
            .map(Self::SetLang)
    }

    /// Callback data for this action
    #[must_use]
    pub fn data(self) -> String {
        match self {
            Self::PriceMenu => CALLBACK_PRICE_MENU.to_string(),
            Self::AlertMenu => CALLBACK_ALERT_MENU.to_string(),
            Self::LanguageMenu => CALLBACK_LANGUAGE_MENU.to_string(),
            Self::ShowPrice(coin) => format!("{PRICE_PREFIX}{}", coin.id()),
            Self::PickAlertCoin(coin) => format!("{ALERT_PREFIX}{}", coin.id()),
            Self::SetLang(lang) => format!("{LANG_PREFIX}{}", lang.code()),
            Self::UnknownCoin => format!("{PRICE_PREFIX}unknown"),
        }
    }
}

#[must_use]
pub fn quality_data(quality: Quality) -> String {
    format!("{QUALITY_PREFIX}{}", quality.code())
}

#[must_use]
pub fn parse_quality(data: &str) -> Option<Quality> {
    data.strip_prefix(QUALITY_PREFIX).and_then(Quality::from_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_actions() {
        assert_eq!(PriceAction::parse("price"), Some(PriceAction::PriceMenu));
        assert_eq!(PriceAction::parse("alert"), Some(PriceAction::AlertMenu));
        assert_eq!(
            PriceAction::parse("language"),
            Some(PriceAction::LanguageMenu)
        );
    }

    #[test]
    fn test_coin_actions() {
        assert_eq!(
            PriceAction::parse("price_bitcoin"),
            Some(PriceAction::ShowPrice(Coin::Bitcoin))
        );
        assert_eq!(
            PriceAction::parse("alert_avalanche-2"),
            Some(PriceAction::PickAlertCoin(Coin::Avalanche))
        );
        assert_eq!(
            PriceAction::parse("price_notacoin"),
            Some(PriceAction::UnknownCoin)
        );
        assert_eq!(PriceAction::parse("alert_"), Some(PriceAction::UnknownCoin));
    }

    #[test]
    fn test_lang_and_garbage() {
        assert_eq!(
            PriceAction::parse("lang_fa"),
            Some(PriceAction::SetLang(Lang::Fa))
        );
        assert_eq!(PriceAction::parse("lang_de"), None);
        assert_eq!(PriceAction::parse(""), None);
        assert_eq!(PriceAction::parse("quality_low"), None);
    }

    #[test]
    fn test_data_parses_back() {
        let mut actions = vec![
            PriceAction::PriceMenu,
            PriceAction::AlertMenu,
            PriceAction::LanguageMenu,
        ];
        for &coin in Coin::ALL {
            actions.push(PriceAction::ShowPrice(coin));
            actions.push(PriceAction::PickAlertCoin(coin));
        }
        for &lang in Lang::ALL {
            actions.push(PriceAction::SetLang(lang));
        }
        for action in actions {
            let data = action.data();
            // Bot API limit for callback data
            assert!(data.len() <= 64, "{data}");
            assert_eq!(PriceAction::parse(&data), Some(action));
        }
    }

    #[test]
    fn test_quality_data() {
        for &quality in Quality::ALL {
            assert_eq!(parse_quality(&quality_data(quality)), Some(quality));
        }
        assert_eq!(parse_quality("quality_4k"), None);
        assert_eq!(parse_quality("low"), None);
    }
}
