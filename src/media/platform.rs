//! Link detection and platform classification.

use lazy_regex::lazy_regex;
use std::fmt;

static RE_URL: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"(?i)https?://[^\s<>]+");

/// Platforms the download bot accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    YouTube,
    Instagram,
}

/// Domain fragments recognised per platform, matched as plain substrings
const DOMAINS: &[(&str, Platform)] = &[
    ("youtube.com", Platform::YouTube),
    ("youtu.be", Platform::YouTube),
    ("instagram.com", Platform::Instagram),
];

impl Platform {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::YouTube => "YouTube",
            Self::Instagram => "Instagram",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// First `http(s)` link in a message, trailing punctuation stripped
#[must_use]
pub fn extract_url(text: &str) -> Option<&str> {
    RE_URL
        .find(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ')', '!', '?', ';', '"', '\'']))
}

/// Platform a link belongs to, `None` when unsupported
#[must_use]
pub fn classify(url: &str) -> Option<Platform> {
    let url = url.to_ascii_lowercase();
    DOMAINS
        .iter()
        .find(|(domain, _)| url.contains(domain))
        .map(|(_, platform)| *platform)
}

/// Extract and classify the first link of a message
#[must_use]
pub fn detect(text: &str) -> Option<(String, Platform)> {
    let url = extract_url(text)?;
    classify(url).map(|platform| (url.to_string(), platform))
}
