//! Crypto price alerts: watch list, texts, persistence, price polling and
//! the periodic scan.

pub mod coins;
pub mod fetcher;
pub mod i18n;
pub mod model;
pub mod scanner;
pub mod service;
pub mod store;

pub use coins::Coin;
pub use fetcher::{CoinGeckoClient, PriceSource, Quote};
pub use i18n::Lang;
pub use model::{Alert, Direction, User};
pub use scanner::{AlertNotifier, AlertScanner, ScanReport};
pub use service::AlertInputError;
pub use store::{AlertStore, StoreData, StoreError};
