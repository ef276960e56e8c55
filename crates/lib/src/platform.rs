//! # Platform Classification and URL Normalization
//!
//! Pure functions over submitted URLs: validation, tracking-parameter
//! stripping, and classification against the known platform URL shapes.
//! Nothing here performs I/O, and nothing here panics on bad input.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

/// The content source platforms the service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Youtube,
    Tiktok,
    Twitter,
    Web,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Instagram,
        Platform::Youtube,
        Platform::Tiktok,
        Platform::Twitter,
        Platform::Web,
    ];

    /// The stable lowercase name used in the store and over the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Youtube => "youtube",
            Platform::Tiktok => "tiktok",
            Platform::Twitter => "twitter",
            Platform::Web => "web",
        }
    }

    pub fn from_name(name: &str) -> Option<Platform> {
        Platform::ALL.iter().copied().find(|p| p.as_str() == name)
    }

    /// Human-facing platform name, used in chat replies and as the
    /// `site_name` fallback.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Instagram => "Instagram",
            Platform::Youtube => "YouTube",
            Platform::Tiktok => "TikTok",
            Platform::Twitter => "Twitter/X",
            Platform::Web => "Web",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Platform::Instagram => "📸",
            Platform::Youtube => "▶️",
            Platform::Tiktok => "🎵",
            Platform::Twitter => "🐦",
            Platform::Web => "🌐",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters stripped during normalization. The canonical URL is the
/// dedupe key, so anything a share sheet appends must not change identity.
const TRACKING_PARAMS: [&str; 5] = [
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "fbclid",
    "igshid",
];

/// Ordered URL-shape patterns per platform; the first matching platform
/// wins. `Web` carries no patterns and is the default.
static PLATFORM_PATTERNS: LazyLock<Vec<(Platform, Vec<Regex>)>> = LazyLock::new(|| {
    fn compile(patterns: &[&str]) -> Vec<Regex> {
        patterns
            .iter()
            .map(|p| Regex::new(p).expect("static platform pattern must compile"))
            .collect()
    }
    vec![
        (
            Platform::Instagram,
            compile(&[
                r"^https?://(www\.)?instagram\.com/(p|reel|tv|stories)/[\w-]+",
                r"^https?://(www\.)?instagram\.com/[\w.]+/?$",
            ]),
        ),
        (
            Platform::Youtube,
            compile(&[
                r"^https?://(www\.)?youtube\.com/watch\?v=[\w-]+",
                r"^https?://(www\.)?youtube\.com/shorts/[\w-]+",
                r"^https?://youtu\.be/[\w-]+",
            ]),
        ),
        (
            Platform::Tiktok,
            compile(&[
                r"^https?://(www\.)?tiktok\.com/@[\w.]+/video/\d+",
                r"^https?://vm\.tiktok\.com/\w+",
            ]),
        ),
        (
            Platform::Twitter,
            compile(&[r"^https?://(www\.)?(twitter|x)\.com/\w+/status/\d+"]),
        ),
    ]
});

/// Returns true when the input parses as an http(s) URL. Never panics.
pub fn is_valid_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Strips tracking query parameters, producing the canonical URL used as
/// the dedupe key. Unparseable input is returned unchanged. Idempotent.
pub fn normalize_url(url: &str) -> String {
    let mut parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return url.to_string(),
    };

    let retained: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if retained.is_empty() {
        parsed.set_query(None);
    } else {
        parsed
            .query_pairs_mut()
            .clear()
            .extend_pairs(retained.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }

    parsed.to_string()
}

/// Classifies a URL against the known platform URL shapes. Deterministic:
/// the pattern tables are fixed and checked in a fixed order.
pub fn detect_platform(url: &str) -> Platform {
    let candidate = url.trim().to_lowercase();
    for (platform, patterns) in PLATFORM_PATTERNS.iter() {
        if patterns.iter().any(|p| p.is_match(&candidate)) {
            return *platform;
        }
    }
    Platform::Web
}

/// Best-effort creator handle parsed from the URL path, platform-specific.
///
/// Post-shape path segments (`/p/`, `/reel/`, ...) and well-known site
/// sections are excluded so they are not mistaken for usernames.
pub fn extract_creator_from_url(url: &str, platform: Platform) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
    let first = segments.next()?;

    match platform {
        Platform::Instagram => {
            // Only profile URLs carry the username as the first segment.
            if segments.next().is_some() || ["p", "reel", "tv", "stories"].contains(&first) {
                return None;
            }
            Some(format!("@{first}"))
        }
        Platform::Youtube | Platform::Tiktok => {
            first.strip_prefix('@').map(|handle| format!("@{handle}"))
        }
        Platform::Twitter => {
            if ["home", "explore", "search"].contains(&first) {
                return None;
            }
            Some(format!("@{first}"))
        }
        Platform::Web => None,
    }
}

/// Builds the canonical profile URL for a creator handle on a platform.
pub fn build_creator_url(creator_name: &str, platform: Platform) -> Option<String> {
    let username = creator_name.trim_start_matches('@');
    match platform {
        Platform::Instagram => Some(format!("https://instagram.com/{username}")),
        Platform::Youtube => Some(format!("https://youtube.com/@{username}")),
        Platform::Tiktok => Some(format!("https://tiktok.com/@{username}")),
        Platform::Twitter => Some(format!("https://x.com/{username}")),
        Platform::Web => None,
    }
}
