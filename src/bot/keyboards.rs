use super::callbacks::{quality_data, PriceAction};
use crate::alerts::{Coin, Lang};
use crate::media::Quality;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Coin buttons per row
const COINS_PER_ROW: usize = 3;

fn button(label: impl Into<String>, action: PriceAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.data())
}

/// Main menu of the price bot in `lang`
#[must_use]
pub fn main_menu(lang: Lang) -> InlineKeyboardMarkup {
    let texts = lang.texts();
    InlineKeyboardMarkup::new(vec![
        vec![
            button(texts.price_button, PriceAction::PriceMenu),
            button(texts.set_alert_button, PriceAction::AlertMenu),
        ],
        vec![button(texts.language_button, PriceAction::LanguageMenu)],
    ])
}

/// The whole watch list. `action` maps a coin to its button action.
#[must_use]
pub fn coin_list(action: fn(Coin) -> PriceAction) -> InlineKeyboardMarkup {
    let rows = Coin::ALL
        .chunks(COINS_PER_ROW)
        .map(|chunk| {
            chunk
                .iter()
                .map(|&coin| button(coin.display_name(), action(coin)))
                .collect()
        })
        .collect::<Vec<Vec<_>>>();
    InlineKeyboardMarkup::new(rows)
}

#[must_use]
pub fn language_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![Lang::ALL
        .iter()
        .map(|&lang| button(lang.native_name(), PriceAction::SetLang(lang)))
        .collect::<Vec<_>>()])
}

/// Quality presets of the download bot
#[must_use]
pub fn quality_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![Quality::ALL
        .iter()
        .map(|&q| InlineKeyboardButton::callback(q.label(), quality_data(q)))
        .collect::<Vec<_>>()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn callback_data(markup: &InlineKeyboardMarkup) -> Vec<String> {
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_main_menu_is_localized() {
        let en = main_menu(Lang::En);
        let fa = main_menu(Lang::Fa);
        assert_eq!(callback_data(&en), vec!["price", "alert", "language"]);
        assert_eq!(callback_data(&en), callback_data(&fa));
        assert_eq!(en.inline_keyboard[0][0].text, "Price");
        assert_eq!(fa.inline_keyboard[0][0].text, "قیمت");
    }

    #[test]
    fn test_coin_list_covers_watch_list() {
        let markup = coin_list(PriceAction::ShowPrice);
        let data = callback_data(&markup);
        assert_eq!(data.len(), Coin::ALL.len());
        assert_eq!(data[0], "price_bitcoin");
        assert!(markup.inline_keyboard.iter().all(|row| row.len() <= COINS_PER_ROW));

        let data = callback_data(&coin_list(PriceAction::PickAlertCoin));
        assert!(data.iter().all(|d| d.starts_with("alert_")));
    }

    #[test]
    fn test_language_and_quality_menus() {
        assert_eq!(callback_data(&language_menu()), vec!["lang_en", "lang_fa"]);
        assert_eq!(
            callback_data(&quality_menu()),
            vec!["quality_low", "quality_medium", "quality_high"]
        );
    }
}
