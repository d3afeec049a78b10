//! Video extraction through the `yt-dlp` executable.
//!
//! Each download runs as a child process bounded by a timeout. The child is
//! killed when its future is dropped, so a timed-out or aborted download
//! never outlives its task.

use super::quality::Quality;
use crate::utils::truncate_str;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Patterns marking a link that can never be downloaded as given
const FATAL_ERROR_PATTERNS: &[&str] = &[
    "Video unavailable",
    "Private video",
    "This video is not available",
    "Sign in to confirm your age",
    "age-restricted",
    "members-only",
    "This video is private",
    "removed by the uploader",
    "no longer available",
    "blocked it in your country",
    "geo-restricted",
    "who has blocked it on copyright grounds",
    "copyright claim",
    "terminated account",
    "This video has been removed",
    "Unsupported URL",
    "is not a valid URL",
    "Unable to extract video data",
    "Premieres in",
    "This live event will begin",
    "Join this channel to get access",
    "HTTP Error 403",
    "HTTP Error 404",
    "Sign in to view this video",
    "login required",
];

/// Longest extractor message passed on to users
const MAX_ERROR_CHARS: usize = 300;

/// Errors returned by a [`MediaExtractor`]
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The extractor executable could not be started
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The media is private, removed, restricted or the link is unsupported
    #[error("media unavailable: {0}")]
    Unavailable(String),
    /// The extractor exited with an error
    #[error("extractor failed: {0}")]
    Failed(String),
    #[error("download timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    /// The extractor reported success but no file was found
    #[error("download finished but produced no file")]
    NoOutput,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    /// Reply shown to the user
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unavailable(reason) => format!(
                "This media can't be downloaded. It may be private, removed or restricted.\n\n{reason}"
            ),
            Self::Timeout(_) => "The download took too long and was stopped.".to_string(),
            Self::Spawn { .. } | Self::Io(_) => {
                "The downloader is not available right now. Please try again later.".to_string()
            }
            Self::Failed(reason) => format!("Download failed.\n\n{reason}"),
            Self::NoOutput => "Download failed: no file was produced.".to_string(),
        }
    }
}

/// Downloads media to a local directory
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Download `url` at `quality` into `dest`, returning the file path
    async fn download(
        &self,
        url: &str,
        quality: Quality,
        dest: &Path,
    ) -> Result<PathBuf, ExtractError>;
}

/// [`MediaExtractor`] running the `yt-dlp` executable
pub struct YtDlpExtractor {
    program: String,
    timeout: Duration,
}

impl YtDlpExtractor {
    #[must_use]
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    async fn download(
        &self,
        url: &str,
        quality: Quality,
        dest: &Path,
    ) -> Result<PathBuf, ExtractError> {
        tokio::fs::create_dir_all(dest).await?;
        let stem = uuid::Uuid::new_v4().simple().to_string();
        let template = dest.join(format!("{stem}.%(ext)s"));
        let args = build_args(url, quality, &template);
        debug!(program = %self.program, ?args, "Executing yt-dlp command");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExtractError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(url, "yt-dlp timed out");
                remove_by_stem(dest, &stem).await;
                return Err(ExtractError::Timeout(self.timeout));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let message = if stderr.trim().is_empty() { stdout } else { stderr };
            remove_by_stem(dest, &stem).await;
            return Err(classify_failure(&message));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = match printed_path(&stdout) {
            Some(path) if tokio::fs::try_exists(&path).await.unwrap_or(false) => path,
            _ => find_by_stem(dest, &stem).await?.ok_or(ExtractError::NoOutput)?,
        };
        info!(url, quality = quality.code(), path = %path.display(), "Download finished");
        Ok(path)
    }
}

/// Command line for one download. The output file is named after a fresh
/// stem so concurrent downloads never collide.
#[must_use]
pub fn build_args(url: &str, quality: Quality, template: &Path) -> Vec<String> {
    vec![
        "-f".to_string(),
        quality.format_selector().to_string(),
        "--merge-output-format".to_string(),
        "mp4".to_string(),
        "--no-playlist".to_string(),
        "--no-warnings".to_string(),
        "--no-progress".to_string(),
        "-o".to_string(),
        template.to_string_lossy().into_owned(),
        "--print".to_string(),
        "after_move:filepath".to_string(),
        "--no-simulate".to_string(),
        "--".to_string(),
        url.to_string(),
    ]
}

/// Final path printed by `--print after_move:filepath`
fn printed_path(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .rev()
        .find(|line| !line.is_empty())
        .map(PathBuf::from)
}

/// Map extractor output of a failed run to an error
#[must_use]
pub fn classify_failure(output: &str) -> ExtractError {
    let summary = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .rev()
        .find(|line| line.contains("ERROR"))
        .or_else(|| output.lines().map(str::trim).rev().find(|l| !l.is_empty()))
        .unwrap_or("unknown error");
    let summary = truncate_str(summary, MAX_ERROR_CHARS);

    if FATAL_ERROR_PATTERNS
        .iter()
        .any(|pattern| output.contains(pattern))
    {
        warn!(error = %summary, "Fatal yt-dlp error detected");
        ExtractError::Unavailable(summary)
    } else {
        warn!(error = %summary, "yt-dlp failed");
        ExtractError::Failed(summary)
    }
}

fn is_partial(name: &str) -> bool {
    name.ends_with(".part") || name.ends_with(".ytdl") || name.contains(".part-Frag")
}

/// Completed file whose name starts with `stem`
async fn find_by_stem(dir: &Path, stem: &str) -> Result<Option<PathBuf>, std::io::Error> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(stem) && !is_partial(&name) {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}

/// Remove every file left behind by the download named `stem`
async fn remove_by_stem(dir: &Path, stem: &str) {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_name().to_string_lossy().starts_with(stem) {
            if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                warn!(path = %entry.path().display(), "Failed to remove leftover file: {e}");
            }
        }
    }
}

/// Remove files of downloads interrupted by a previous run: everything in
/// `dir` named after a download stem. Returns how many files were removed.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be read.
pub async fn clear_leftovers(dir: &Path) -> Result<usize, std::io::Error> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let stem = name.split('.').next().unwrap_or_default();
        if stem.len() == 32 && uuid::Uuid::try_parse(stem).is_ok() {
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(path = %entry.path().display(), "Failed to remove leftover file: {e}");
                }
            }
        }
    }
    Ok(removed)
}
