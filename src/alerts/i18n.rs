//! Two-language text tables for the price bot.
//!
//! Templates use `{name}` placeholders filled by [`render`].

use serde::{Deserialize, Serialize};

/// Language preference of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Lang {
    /// English
    #[default]
    #[serde(rename = "en")]
    En,
    /// Persian
    #[serde(rename = "fa")]
    Fa,
}

impl Lang {
    /// Every supported language, in menu order
    pub const ALL: &'static [Lang] = &[Lang::En, Lang::Fa];

    /// Short code used in callback data and the data file
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Fa => "fa",
        }
    }

    /// Name of the language written in that language
    #[must_use]
    pub const fn native_name(self) -> &'static str {
        match self {
            Lang::En => "English",
            Lang::Fa => "فارسی",
        }
    }

    /// Parse a language code
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|lang| lang.code() == code)
    }

    /// Text table for this language
    #[must_use]
    pub const fn texts(self) -> &'static Texts {
        match self {
            Lang::En => &EN,
            Lang::Fa => &FA,
        }
    }
}

/// All user-facing strings of the price bot
#[derive(Debug)]
pub struct Texts {
    pub welcome: &'static str,
    pub price_button: &'static str,
    pub set_alert_button: &'static str,
    pub language_button: &'static str,
    /// Placeholders: `coin`, `price`, `change`
    pub current_price: &'static str,
    /// Placeholders: `coin`, `price`
    pub alert_set: &'static str,
    /// Placeholders: `coin`, `price`, `current`
    pub alert_triggered: &'static str,
    pub select_coin: &'static str,
    /// Placeholders: `coin`
    pub enter_price: &'static str,
    pub invalid_number: &'static str,
    /// Placeholders: `coin`
    pub price_unavailable: &'static str,
    pub unknown_coin: &'static str,
    pub no_alerts: &'static str,
    pub alerts_header: &'static str,
    /// Placeholders: `coin`, `price`, `reference`
    pub alert_line: &'static str,
    pub cancelled: &'static str,
    pub nothing_to_cancel: &'static str,
    pub help: &'static str,
}

/// Prompt shown on the language menu, in both languages at once
pub const SELECT_LANGUAGE: &str = "Select language / زبان را انتخاب کنید:";

static EN: Texts = Texts {
    welcome: "Welcome to Crypto Bot!\nChoose an option:",
    price_button: "Price",
    set_alert_button: "Set Alert",
    language_button: "Change Language",
    current_price: "Current {coin} Price: ${price}\n24h Change: {change}%",
    alert_set: "Alert set for {coin} at ${price}",
    alert_triggered: "{coin} reached ${price}!\nCurrent price: ${current}",
    select_coin: "Select a cryptocurrency:",
    enter_price: "Enter target price for {coin}:",
    invalid_number: "Please enter a valid number",
    price_unavailable: "Price for {coin} is unavailable right now. Please try again later.",
    unknown_coin: "Unknown cryptocurrency.",
    no_alerts: "You have no active alerts.",
    alerts_header: "Your active alerts:",
    alert_line: "• {coin}: ${price} (set at ${reference})",
    cancelled: "Cancelled.",
    nothing_to_cancel: "Nothing to cancel.",
    help: "/start - main menu\n/alerts - list your alerts\n/cancel - cancel the pending alert\n/help - this message",
};

static FA: Texts = Texts {
    welcome: "به ربات کریپتو خوش آمدید!\nیک گزینه را انتخاب کنید:",
    price_button: "قیمت",
    set_alert_button: "تنظیم هشدار",
    language_button: "تغییر زبان",
    current_price: "قیمت فعلی {coin}: ${price}\nتغییر ۲۴ ساعته: {change}%",
    alert_set: "هشدار برای {coin} در قیمت ${price} تنظیم شد",
    alert_triggered: "{coin} به ${price} رسید!\nقیمت فعلی: ${current}",
    select_coin: "یک ارز دیجیتال انتخاب کنید:",
    enter_price: "قیمت هدف را برای {coin} وارد کنید:",
    invalid_number: "لطفاً یک عدد معتبر وارد کنید",
    price_unavailable: "قیمت {coin} در حال حاضر در دسترس نیست. لطفاً بعداً دوباره تلاش کنید.",
    unknown_coin: "ارز دیجیتال ناشناخته است.",
    no_alerts: "هیچ هشدار فعالی ندارید.",
    alerts_header: "هشدارهای فعال شما:",
    alert_line: "• {coin}: ${price} (تنظیم شده در ${reference})",
    cancelled: "لغو شد.",
    nothing_to_cancel: "موردی برای لغو وجود ندارد.",
    help: "/start - منوی اصلی\n/alerts - فهرست هشدارها\n/cancel - لغو هشدار در انتظار\n/help - همین پیام",
};

/// Fill `{name}` placeholders in `template`.
///
/// Unknown placeholders are left untouched.
///
/// # Examples
///
/// ```
/// use coin_media_bots::alerts::i18n::render;
/// let text = render("{coin} reached ${price}!", &[("coin", "Bitcoin"), ("price", "55000")]);
/// assert_eq!(text, "Bitcoin reached $55000!");
/// ```
#[must_use]
pub fn render(template: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{name}}}"), value)
    })
}
