//! Media download bot: link classification, quality presets, the `yt-dlp`
//! extractor and download dispatch.

pub mod dispatcher;
pub mod extractor;
pub mod platform;
pub mod quality;

pub use dispatcher::{
    Delivery, DispatchError, DispatchOptions, DownloadRequest, FileSink, MediaDispatcher,
};
pub use extractor::{clear_leftovers, ExtractError, MediaExtractor, YtDlpExtractor};
pub use platform::Platform;
pub use quality::Quality;
