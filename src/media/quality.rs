//! Quality presets offered before a download.

/// Fixed download quality presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quality {
    /// Up to 480p
    Low,
    /// Up to 720p
    Medium,
    /// Best available
    High,
}

impl Quality {
    /// Every preset, in button order
    pub const ALL: &'static [Quality] = &[Quality::Low, Quality::Medium, Quality::High];

    /// Identifier used in callback data
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low (480p)",
            Self::Medium => "Medium (720p)",
            Self::High => "High (best)",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|q| q.code() == code)
    }

    /// yt-dlp `-f` selector. Each falls back to a single-file format so
    /// sources without separate streams still download.
    #[must_use]
    pub const fn format_selector(self) -> &'static str {
        match self {
            Self::Low => "bestvideo[height<=480]+bestaudio/best[height<=480]/best",
            Self::Medium => "bestvideo[height<=720]+bestaudio/best[height<=720]/best",
            Self::High => "bestvideo+bestaudio/best",
        }
    }
}
