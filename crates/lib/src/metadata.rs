//! # Metadata Extraction
//!
//! Fetches Open Graph / Twitter Card metadata for a normalized URL. For
//! Instagram links a dedicated oEmbed API is attempted first when
//! credentials are configured; generic scraping is the fallback, and a
//! minimal platform-derived object is the fallback for the fallback. No
//! failure crosses `extract`'s boundary.

use crate::errors::MetadataError;
use crate::platform::{
    build_creator_url, detect_platform, extract_creator_from_url, is_valid_url, normalize_url,
    Platform,
};
use reqwest::Client as ReqwestClient;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Bound on every outbound metadata request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// The Facebook Graph endpoint serving Instagram oEmbed lookups.
pub const INSTAGRAM_OEMBED_URL: &str = "https://graph.facebook.com/v18.0/instagram_oembed";

/// A transient description of one piece of content, produced per extraction
/// call and consumed by the tag generator and the save orchestrator. The
/// persisted fields are copied into `SavedContent`; this value itself is
/// never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub url: String,
    pub site_name: Option<String>,
    pub platform: Platform,
    pub creator_name: Option<String>,
    pub creator_url: Option<String>,
    pub normalized_url: String,
}

/// Configuration for the extractor.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    pub fetch_timeout: Duration,
    /// Facebook app credential pair enabling the Instagram oEmbed API.
    /// Without both parts, Instagram URLs go straight to generic scraping.
    pub facebook_app_id: Option<String>,
    pub facebook_app_secret: Option<String>,
    /// Overridable for tests pointing at a mock server.
    pub instagram_oembed_url: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            facebook_app_id: None,
            facebook_app_secret: None,
            instagram_oembed_url: INSTAGRAM_OEMBED_URL.to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct InstagramOembedResponse {
    title: Option<String>,
    author_name: Option<String>,
    thumbnail_url: Option<String>,
    provider_name: Option<String>,
}

/// Extracts page metadata with the Instagram-API -> scraper -> fallback
/// object chain.
#[derive(Clone, Debug)]
pub struct MetadataExtractor {
    client: ReqwestClient,
    config: MetadataConfig,
}

impl MetadataExtractor {
    pub fn new(config: MetadataConfig) -> Result<Self, MetadataError> {
        let client = ReqwestClient::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(MetadataError::ReqwestClientBuild)?;
        Ok(Self { client, config })
    }

    /// Extracts metadata for a raw URL.
    ///
    /// Returns `None` only for invalid input; every downstream failure
    /// degrades to a fallback object so the save pipeline can proceed.
    pub async fn extract(&self, raw_url: &str) -> Option<ExtractedMetadata> {
        if !is_valid_url(raw_url) {
            return None;
        }

        let normalized = normalize_url(raw_url);
        let platform = detect_platform(&normalized);

        if platform == Platform::Instagram {
            match self.fetch_instagram_oembed(&normalized).await {
                Ok(Some(meta)) => return Some(meta),
                Ok(None) => {
                    debug!("Instagram oEmbed credentials not configured, using generic scraper")
                }
                Err(e) => warn!("Instagram oEmbed lookup failed, falling back to scraper: {e}"),
            }
        }

        match self.scrape_open_graph(&normalized, platform).await {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!(url = %normalized, "Open Graph scrape failed, using fallback metadata: {e}");
                Some(fallback_metadata(&normalized, platform))
            }
        }
    }

    /// Looks up Instagram metadata through the Facebook Graph oEmbed API.
    /// Returns `Ok(None)` when no credential pair is configured.
    async fn fetch_instagram_oembed(
        &self,
        url: &str,
    ) -> Result<Option<ExtractedMetadata>, MetadataError> {
        let (app_id, app_secret) = match (
            self.config.facebook_app_id.as_deref(),
            self.config.facebook_app_secret.as_deref(),
        ) {
            (Some(id), Some(secret)) => (id, secret),
            _ => return Ok(None),
        };
        let access_token = format!("{app_id}|{app_secret}");

        let response = self
            .client
            .get(&self.config.instagram_oembed_url)
            .query(&[("url", url), ("access_token", access_token.as_str())])
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(MetadataError::OembedRequest)?;

        if !response.status().is_success() {
            return Err(MetadataError::OembedApi(response.status().to_string()));
        }

        let data: InstagramOembedResponse = response
            .json()
            .await
            .map_err(MetadataError::OembedDeserialization)?;

        let platform = Platform::Instagram;
        let creator_name = data
            .author_name
            .map(|name| {
                if name.starts_with('@') {
                    name
                } else {
                    format!("@{name}")
                }
            })
            .or_else(|| extract_creator_from_url(url, platform));
        let creator_url = creator_name
            .as_deref()
            .and_then(|name| build_creator_url(name, platform));

        let title = data.title.clone().or_else(|| {
            creator_name
                .as_deref()
                .map(|name| format!("Instagram post by {name}"))
        });

        Ok(Some(ExtractedMetadata {
            title,
            description: data.title,
            image: data.thumbnail_url,
            url: url.to_string(),
            site_name: Some(
                data.provider_name
                    .unwrap_or_else(|| platform.display_name().to_string()),
            ),
            platform,
            creator_name,
            creator_url,
            normalized_url: url.to_string(),
        }))
    }

    /// Fetches the page and reads its Open Graph / Twitter Card meta tags.
    async fn scrape_open_graph(
        &self,
        url: &str,
        platform: Platform,
    ) -> Result<ExtractedMetadata, MetadataError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(MetadataError::Fetch)?;

        if !response.status().is_success() {
            return Err(MetadataError::FetchStatus(response.status().as_u16()));
        }

        let body = response.text().await.map_err(MetadataError::Fetch)?;
        let tags = parse_meta_tags(&body);

        let creator_name = extract_creator_from_url(url, platform);
        let creator_url = creator_name
            .as_deref()
            .and_then(|name| build_creator_url(name, platform));

        Ok(ExtractedMetadata {
            title: tags.og_title.or(tags.twitter_title),
            description: tags.og_description.or(tags.twitter_description),
            image: tags.og_image.or(tags.twitter_image),
            url: tags.og_url.unwrap_or_else(|| url.to_string()),
            site_name: Some(
                tags.og_site_name
                    .unwrap_or_else(|| platform.display_name().to_string()),
            ),
            platform,
            creator_name,
            creator_url,
            normalized_url: url.to_string(),
        })
    }
}

#[derive(Default)]
struct MetaTags {
    og_title: Option<String>,
    og_description: Option<String>,
    og_image: Option<String>,
    og_url: Option<String>,
    og_site_name: Option<String>,
    twitter_title: Option<String>,
    twitter_description: Option<String>,
    twitter_image: Option<String>,
}

/// Collects the relevant `<meta>` tags from raw HTML. Synchronous so the
/// non-`Send` parsed document never lives across an await point.
fn parse_meta_tags(html: &str) -> MetaTags {
    let document = Html::parse_document(html);
    let mut tags = MetaTags::default();

    let Ok(selector) = Selector::parse("meta") else {
        return tags;
    };

    for element in document.select(&selector) {
        let key = element
            .value()
            .attr("property")
            .or_else(|| element.value().attr("name"));
        let (Some(key), Some(content)) = (key, element.value().attr("content")) else {
            continue;
        };
        let content = content.trim();
        if content.is_empty() {
            continue;
        }
        let slot = match key {
            "og:title" => &mut tags.og_title,
            "og:description" => &mut tags.og_description,
            "og:image" => &mut tags.og_image,
            "og:url" => &mut tags.og_url,
            "og:site_name" => &mut tags.og_site_name,
            "twitter:title" => &mut tags.twitter_title,
            "twitter:description" => &mut tags.twitter_description,
            "twitter:image" => &mut tags.twitter_image,
            _ => continue,
        };
        // First occurrence wins, matching how scrapers pick ogImage[0].
        if slot.is_none() {
            *slot = Some(content.to_string());
        }
    }

    tags
}

/// The minimal metadata object used when both the platform API and the
/// scraper come up empty: platform identity plus a URL-derived creator.
pub fn fallback_metadata(url: &str, platform: Platform) -> ExtractedMetadata {
    let creator_name = extract_creator_from_url(url, platform);
    let creator_url = creator_name
        .as_deref()
        .and_then(|name| build_creator_url(name, platform));
    ExtractedMetadata {
        title: None,
        description: None,
        image: None,
        url: url.to_string(),
        site_name: Some(platform.display_name().to_string()),
        platform,
        creator_name,
        creator_url,
        normalized_url: url.to_string(),
    }
}
