//! Download jobs: extraction, delivery and cleanup.

use super::extractor::{ExtractError, MediaExtractor};
use super::platform::Platform;
use super::quality::Quality;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Outbound side of the download bot
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileSink: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> anyhow::Result<()>;
    async fn send_video(&self, chat_id: i64, path: &Path) -> anyhow::Result<()>;
}

/// Errors of one download job
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("file is {size} bytes, upload limit is {limit}")]
    TooLarge { size: u64, limit: u64 },
    #[error("failed to send file: {0}")]
    Send(#[source] anyhow::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The download slots were closed
    #[error("dispatcher is shutting down")]
    Closed,
}

impl DispatchError {
    /// Reply shown to the user
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Extract(e) => e.user_message(),
            Self::TooLarge { size, limit } => format!(
                "The file is too large to send ({} MB, the limit is {} MB).",
                to_mib(*size),
                to_mib(*limit)
            ),
            Self::Send(_) | Self::Io(_) => "Failed to send the file. Please try again.".to_string(),
            Self::Closed => "The bot is shutting down. Please try again later.".to_string(),
        }
    }
}

fn to_mib(bytes: u64) -> u64 {
    bytes.div_ceil(1024 * 1024)
}

/// What happened to a downloaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Downloaded but not delivered (Instagram without delivery enabled)
    Withheld,
}

/// A quality chosen for a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub chat_id: i64,
    pub url: String,
    pub platform: Platform,
    pub quality: Quality,
}

/// Limits applied to every job
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub download_dir: PathBuf,
    pub max_concurrent: usize,
    pub max_upload_bytes: u64,
    pub instagram_delivery: bool,
}

/// Runs download jobs with bounded concurrency
pub struct MediaDispatcher {
    extractor: Arc<dyn MediaExtractor>,
    sink: Arc<dyn FileSink>,
    options: DispatchOptions,
    slots: Semaphore,
    tasks: Mutex<JoinSet<()>>,
}

impl MediaDispatcher {
    #[must_use]
    pub fn new(
        extractor: Arc<dyn MediaExtractor>,
        sink: Arc<dyn FileSink>,
        options: DispatchOptions,
    ) -> Self {
        let slots = Semaphore::new(options.max_concurrent.max(1));
        Self {
            extractor,
            sink,
            options,
            slots,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Stop handing out download slots. Waiting jobs fail with
    /// [`DispatchError::Closed`].
    pub fn close(&self) {
        self.slots.close();
    }

    /// Download and deliver one link. The local file is removed afterwards
    /// whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction, the size check or the upload fails.
    pub async fn run(&self, request: &DownloadRequest) -> Result<Delivery, DispatchError> {
        let _slot = self
            .slots
            .acquire()
            .await
            .map_err(|_| DispatchError::Closed)?;

        let path = self
            .extractor
            .download(
                &request.url,
                request.quality,
                &self.options.download_dir,
            )
            .await?;

        let result = self.deliver(request, &path).await;
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), "Failed to remove downloaded file: {e}");
        }
        result
    }

    async fn deliver(
        &self,
        request: &DownloadRequest,
        path: &Path,
    ) -> Result<Delivery, DispatchError> {
        if request.platform == Platform::Instagram && !self.options.instagram_delivery {
            info!(url = %request.url, "Instagram delivery disabled, file withheld");
            return Ok(Delivery::Withheld);
        }

        let size = tokio::fs::metadata(path).await?.len();
        if size > self.options.max_upload_bytes {
            return Err(DispatchError::TooLarge {
                size,
                limit: self.options.max_upload_bytes,
            });
        }

        self.sink
            .send_video(request.chat_id, path)
            .await
            .map_err(DispatchError::Send)?;
        info!(chat_id = request.chat_id, size, "Video delivered");
        Ok(Delivery::Sent)
    }

    /// Run a job and report failures or withheld files back to the chat
    pub async fn handle(&self, request: DownloadRequest) {
        let reply = match self.run(&request).await {
            Ok(Delivery::Sent) => return,
            Ok(Delivery::Withheld) => {
                "Download finished, but sending Instagram media is not enabled on this bot."
                    .to_string()
            }
            Err(e) => {
                error!(url = %request.url, "Download failed: {e}");
                e.user_message()
            }
        };
        if let Err(e) = self.sink.send_text(request.chat_id, &reply).await {
            error!(chat_id = request.chat_id, "Failed to report download result: {e}");
        }
    }

    /// Run a job on its own task
    pub fn spawn(self: Arc<Self>, request: DownloadRequest) {
        let dispatcher = self.clone();
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(finished) = tasks.try_join_next() {
            if let Err(e) = finished {
                error!("Download task failed: {e}");
            }
        }
        tasks.spawn(async move { dispatcher.handle(request).await });
    }

    /// Wait for every spawned job to finish
    pub async fn drain(&self) {
        let mut tasks = {
            let mut guard = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        if !tasks.is_empty() {
            info!("Waiting for {} download job(s)...", tasks.len());
        }
        while let Some(finished) = tasks.join_next().await {
            if let Err(e) = finished {
                error!("Download task failed: {e}");
            }
        }
    }

    /// Close the slots and wait for running jobs. Jobs still queued are
    /// answered with the shutdown notice and never start.
    pub async fn shutdown(&self) {
        self.close();
        self.drain().await;
    }
}

#[cfg(test)]
mod tests {
    use crate::media::extractor::MockMediaExtractor;
    use super::*;

    fn options(dir: &Path) -> DispatchOptions {
        DispatchOptions {
            download_dir: dir.to_path_buf(),
            max_concurrent: 2,
            max_upload_bytes: 1024,
            instagram_delivery: false,
        }
    }

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("coin-media-bots-{}", uuid::Uuid::new_v4()))
    }

    /// Extractor writing `size` bytes to `<dest>/video.mp4`
    fn writing_extractor(size: usize) -> MockMediaExtractor {
        let mut extractor = MockMediaExtractor::new();
        extractor.expect_download().returning(move |_, _, dest| {
            std::fs::create_dir_all(dest)?;
            let path = dest.join("video.mp4");
            std::fs::write(&path, vec![0u8; size])?;
            Ok(path)
        });
        extractor
    }

    fn request(platform: Platform) -> DownloadRequest {
        DownloadRequest {
            chat_id: 7,
            url: "https://youtu.be/abc".into(),
            platform,
            quality: Quality::Medium,
        }
    }

    #[tokio::test]
    async fn test_youtube_sent_then_deleted() {
        let dir = temp_dir();
        let mut sink = MockFileSink::new();
        sink.expect_send_video()
            .withf(|chat_id, path| *chat_id == 7 && path.exists())
            .times(1)
            .returning(|_, _| Ok(()));
        sink.expect_send_text().never();

        let dispatcher = MediaDispatcher::new(
            Arc::new(writing_extractor(10)),
            Arc::new(sink),
            options(&dir),
        );
        dispatcher.handle(request(Platform::YouTube)).await;

        assert!(!dir.join("video.mp4").exists());
    }

    #[tokio::test]
    async fn test_instagram_withheld_by_default() {
        let dir = temp_dir();
        let mut sink = MockFileSink::new();
        sink.expect_send_video().never();
        sink.expect_send_text()
            .withf(|_, text| text.contains("Instagram"))
            .times(1)
            .returning(|_, _| Ok(()));

        let dispatcher = MediaDispatcher::new(
            Arc::new(writing_extractor(10)),
            Arc::new(sink),
            options(&dir),
        );
        assert!(matches!(
            dispatcher.run(&request(Platform::Instagram)).await,
            Ok(Delivery::Withheld)
        ));
        dispatcher.handle(request(Platform::Instagram)).await;
        assert!(!dir.join("video.mp4").exists());
    }

    #[tokio::test]
    async fn test_instagram_delivered_when_enabled() {
        let dir = temp_dir();
        let mut sink = MockFileSink::new();
        sink.expect_send_video().times(1).returning(|_, _| Ok(()));

        let mut opts = options(&dir);
        opts.instagram_delivery = true;
        let dispatcher =
            MediaDispatcher::new(Arc::new(writing_extractor(10)), Arc::new(sink), opts);
        assert!(matches!(
            dispatcher.run(&request(Platform::Instagram)).await,
            Ok(Delivery::Sent)
        ));
    }

    #[tokio::test]
    async fn test_oversized_file_is_not_sent() {
        let dir = temp_dir();
        let mut sink = MockFileSink::new();
        sink.expect_send_video().never();

        let dispatcher = MediaDispatcher::new(
            Arc::new(writing_extractor(4096)),
            Arc::new(sink),
            options(&dir),
        );
        let result = dispatcher.run(&request(Platform::YouTube)).await;
        assert!(matches!(
            result,
            Err(DispatchError::TooLarge {
                size: 4096,
                limit: 1024
            })
        ));
        assert!(!dir.join("video.mp4").exists());
    }

    #[tokio::test]
    async fn test_send_failure_still_deletes() {
        let dir = temp_dir();
        let mut sink = MockFileSink::new();
        sink.expect_send_video()
            .returning(|_, _| Err(anyhow::anyhow!("Request Entity Too Large")));
        sink.expect_send_text()
            .withf(|chat_id, text| *chat_id == 7 && text.contains("Failed to send the file"))
            .times(1)
            .returning(|_, _| Ok(()));

        let dispatcher = MediaDispatcher::new(
            Arc::new(writing_extractor(10)),
            Arc::new(sink),
            options(&dir),
        );
        dispatcher.handle(request(Platform::YouTube)).await;
        assert!(!dir.join("video.mp4").exists());
    }

    #[tokio::test]
    async fn test_extractor_failure_becomes_text() {
        let mut extractor = MockMediaExtractor::new();
        extractor
            .expect_download()
            .returning(|_, _, _| Err(ExtractError::Unavailable("ERROR: Private video".into())));
        let mut sink = MockFileSink::new();
        sink.expect_send_video().never();
        sink.expect_send_text()
            .withf(|chat_id, text| *chat_id == 7 && text.contains("Private video"))
            .times(1)
            .returning(|_, _| Ok(()));

        let dispatcher =
            MediaDispatcher::new(Arc::new(extractor), Arc::new(sink), options(&temp_dir()));
        dispatcher.handle(request(Platform::YouTube)).await;
    }

    #[tokio::test]
    async fn test_closed_dispatcher_rejects_jobs() {
        let mut extractor = MockMediaExtractor::new();
        extractor.expect_download().never();
        let dispatcher = MediaDispatcher::new(
            Arc::new(extractor),
            Arc::new(MockFileSink::new()),
            options(&temp_dir()),
        );
        dispatcher.close();
        assert!(matches!(
            dispatcher.run(&request(Platform::YouTube)).await,
            Err(DispatchError::Closed)
        ));
    }

    /// Extractor recording how many downloads run at once
    #[derive(Default)]
    struct CountingExtractor {
        running: std::sync::atomic::AtomicUsize,
        peak: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl MediaExtractor for CountingExtractor {
        async fn download(
            &self,
            _url: &str,
            _quality: Quality,
            _dest: &Path,
        ) -> Result<PathBuf, ExtractError> {
            use std::sync::atomic::Ordering;
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            Err(ExtractError::Failed("ERROR: nothing to see".into()))
        }
    }

    #[tokio::test]
    async fn test_concurrent_downloads_are_bounded() {
        let extractor = Arc::new(CountingExtractor::default());
        let mut sink = MockFileSink::new();
        sink.expect_send_text().times(5).returning(|_, _| Ok(()));

        let dispatcher = Arc::new(MediaDispatcher::new(
            extractor.clone(),
            Arc::new(sink),
            options(&temp_dir()),
        ));
        for _ in 0..5 {
            dispatcher.clone().spawn(request(Platform::YouTube));
        }
        dispatcher.drain().await;
        assert_eq!(
            extractor.peak.load(std::sync::atomic::Ordering::SeqCst),
            2
        );
    }

    /// Extractor that takes a while before failing
    struct SlowExtractor;

    #[async_trait]
    impl MediaExtractor for SlowExtractor {
        async fn download(
            &self,
            _url: &str,
            _quality: Quality,
            _dest: &Path,
        ) -> Result<PathBuf, ExtractError> {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Err(ExtractError::Failed("ERROR: gone".into()))
        }
    }

    #[tokio::test]
    async fn test_shutdown_finishes_running_and_rejects_queued() {
        let mut sink = MockFileSink::new();
        sink.expect_send_text()
            .withf(|_, text| text.contains("gone"))
            .times(1)
            .returning(|_, _| Ok(()));
        sink.expect_send_text()
            .withf(|_, text| text.contains("shutting down"))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut opts = options(&temp_dir());
        opts.max_concurrent = 1;
        let dispatcher = Arc::new(MediaDispatcher::new(
            Arc::new(SlowExtractor),
            Arc::new(sink),
            opts,
        ));
        dispatcher.clone().spawn(request(Platform::YouTube));
        dispatcher.clone().spawn(request(Platform::YouTube));
        // Let the first job take the only slot
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        dispatcher.shutdown().await;
        assert!(dispatcher.tasks.lock().is_ok_and(|t| t.is_empty()));
    }

    #[test]
    fn test_too_large_message() {
        let e = DispatchError::TooLarge {
            size: 60 * 1024 * 1024,
            limit: 50 * 1024 * 1024,
        };
        assert_eq!(
            e.user_message(),
            "The file is too large to send (60 MB, the limit is 50 MB)."
        );
    }
}
