//! Two Telegram bots on one library: crypto price alerts backed by
//! CoinGecko, and a media downloader backed by `yt-dlp`.

pub mod alerts;
pub mod bot;
pub mod config;
pub mod logging;
pub mod media;
pub mod utils;
