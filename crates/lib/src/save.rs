//! # Save Orchestrator
//!
//! The end-to-end pipeline behind "save this URL": validation, user
//! resolution, metadata extraction, tag generation, persistence, in that
//! order. Failures are reported through `SaveOutcome` with the step that
//! failed; no error crosses the orchestrator's boundary as `Err`.

use crate::content::{ContentService, SavedContent};
use crate::errors::StoreError;
use crate::metadata::{ExtractedMetadata, MetadataExtractor};
use crate::platform::is_valid_url;
use crate::store::SqliteStore;
use crate::tagging::{GeneratedTag, TagChain, TaggingInput};
use linkstash_access::get_or_create_telegram_user;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One save submission, from the API or the Telegram bot.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveRequest {
    pub url: String,
    /// An already-resolved user id (API path).
    pub user_id: Option<String>,
    /// Telegram identity to resolve into a user (bot path).
    pub telegram_user_id: Option<String>,
    pub telegram_username: Option<String>,
    pub memo: Option<String>,
}

/// The pipeline step a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveStep {
    Validation,
    UserResolution,
    Metadata,
    Tagging,
    Persistence,
}

/// Stable machine-readable failure codes.
pub mod codes {
    pub const INVALID_URL: &str = "INVALID_URL";
    pub const USER_RESOLUTION_FAILED: &str = "USER_RESOLUTION_FAILED";
    pub const METADATA_FAILED: &str = "METADATA_FAILED";
    pub const DUPLICATE: &str = "DUPLICATE";
    pub const PERSISTENCE_FAILED: &str = "PERSISTENCE_FAILED";
}

/// What happened to one save submission.
#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<SavedContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExtractedMetadata>,
    pub tags: Vec<GeneratedTag>,
    /// Which tagging strategy produced the tags ("openai", "fallback", ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<SaveStep>,
}

impl SaveOutcome {
    fn failure(step: SaveStep, code: &'static str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            content: None,
            metadata: None,
            tags: Vec::new(),
            tag_strategy: None,
            error: Some(error.into()),
            code: Some(code),
            step: Some(step),
        }
    }
}

/// Drives the save pipeline. Cheap to clone; all members share handles.
#[derive(Clone, Debug)]
pub struct SaveOrchestrator {
    store: SqliteStore,
    extractor: MetadataExtractor,
    tagger: TagChain,
    contents: ContentService,
}

impl SaveOrchestrator {
    pub fn new(store: SqliteStore, extractor: MetadataExtractor, tagger: TagChain) -> Self {
        let contents = ContentService::new(store.clone());
        Self {
            store,
            extractor,
            tagger,
            contents,
        }
    }

    /// Runs the pipeline for one submission.
    ///
    /// The steps run strictly in order and each failure names its step. A
    /// duplicate URL fails at persistence but still carries the extracted
    /// metadata and tags so callers can show what was already saved.
    pub async fn save(&self, request: &SaveRequest) -> SaveOutcome {
        // 1. Validation.
        let url = request.url.trim();
        if !is_valid_url(url) {
            return SaveOutcome::failure(
                SaveStep::Validation,
                codes::INVALID_URL,
                "Invalid URL format",
            );
        }

        // 2. User resolution.
        let user_id = match self.resolve_user(request).await {
            Ok(id) => id,
            Err(message) => {
                return SaveOutcome::failure(
                    SaveStep::UserResolution,
                    codes::USER_RESOLUTION_FAILED,
                    message,
                );
            }
        };

        // 3. Metadata. The extractor degrades internally; `None` here means
        // the URL failed its stricter parse.
        let Some(metadata) = self.extractor.extract(url).await else {
            return SaveOutcome::failure(
                SaveStep::Metadata,
                codes::METADATA_FAILED,
                "Could not extract metadata for URL",
            );
        };

        // 4. Tagging. Never fails; the chain bottoms out at a platform tag.
        let analysis = self.tagger.generate(&TaggingInput::from(&metadata)).await;

        // 5. Persistence.
        match self
            .contents
            .create(&user_id, &metadata, &analysis.tags, request.memo.as_deref())
            .await
        {
            Ok(content) => {
                info!(
                    content_id = %content.id,
                    platform = %content.platform,
                    strategy = %analysis.strategy,
                    "Content saved"
                );
                SaveOutcome {
                    success: true,
                    content: Some(content),
                    metadata: Some(metadata),
                    tags: analysis.tags,
                    tag_strategy: Some(analysis.strategy),
                    error: None,
                    code: None,
                    step: None,
                }
            }
            Err(StoreError::Duplicate) => SaveOutcome {
                success: false,
                content: None,
                metadata: Some(metadata),
                tags: analysis.tags,
                tag_strategy: Some(analysis.strategy),
                error: Some(StoreError::Duplicate.to_string()),
                code: Some(codes::DUPLICATE),
                step: Some(SaveStep::Persistence),
            },
            Err(e) => {
                warn!("Persisting content failed: {e}");
                SaveOutcome::failure(SaveStep::Persistence, codes::PERSISTENCE_FAILED, e.to_string())
            }
        }
    }

    async fn resolve_user(&self, request: &SaveRequest) -> Result<String, String> {
        if let Some(user_id) = request.user_id.as_deref().filter(|id| !id.is_empty()) {
            return Ok(user_id.to_string());
        }
        let Some(telegram_id) = request
            .telegram_user_id
            .as_deref()
            .filter(|id| !id.is_empty())
        else {
            return Err("No user identity in save request".to_string());
        };

        get_or_create_telegram_user(
            &self.store.db,
            telegram_id,
            request.telegram_username.as_deref(),
        )
        .await
        .map(|user| user.id)
        .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataConfig;
    use crate::platform::Platform;
    use crate::tagging::TaggingConfig;
    use httpmock::prelude::*;

    async fn orchestrator() -> SaveOrchestrator {
        let store = SqliteStore::new(":memory:").await.unwrap();
        store.initialize_schema().await.unwrap();
        let extractor = MetadataExtractor::new(MetadataConfig::default()).unwrap();
        let tagger = TagChain::new(Vec::new(), TaggingConfig::default());
        SaveOrchestrator::new(store, extractor, tagger)
    }

    fn request(url: &str) -> SaveRequest {
        SaveRequest {
            url: url.to_string(),
            user_id: Some("u1".to_string()),
            telegram_user_id: None,
            telegram_username: None,
            memo: None,
        }
    }

    #[tokio::test]
    async fn invalid_url_fails_at_validation() {
        let orchestrator = orchestrator().await;
        let outcome = orchestrator.save(&request("not a url")).await;
        assert!(!outcome.success);
        assert_eq!(outcome.step, Some(SaveStep::Validation));
        assert_eq!(outcome.code, Some(codes::INVALID_URL));
    }

    #[tokio::test]
    async fn missing_identity_fails_at_user_resolution() {
        let orchestrator = orchestrator().await;
        let outcome = orchestrator
            .save(&SaveRequest {
                url: "https://example.com/a".to_string(),
                user_id: None,
                telegram_user_id: None,
                telegram_username: None,
                memo: None,
            })
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.step, Some(SaveStep::UserResolution));
    }

    #[tokio::test]
    async fn full_pipeline_saves_scraped_content() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/post");
            then.status(200).body(
                r#"<html><head>
                <meta property="og:title" content="Pipeline Post" />
                <meta property="og:description" content="Body text" />
                </head></html>"#,
            );
        });

        let orchestrator = orchestrator().await;
        let mut req = request(&server.url("/post"));
        req.memo = Some("from test".to_string());
        let outcome = orchestrator.save(&req).await;

        assert!(outcome.success, "save failed: {:?}", outcome.error);
        let content = outcome.content.unwrap();
        assert_eq!(content.title.as_deref(), Some("Pipeline Post"));
        assert_eq!(content.memo.as_deref(), Some("from test"));
        assert_eq!(content.platform, Platform::Web);
        // Empty provider chain bottoms out at the platform fallback tag.
        assert_eq!(outcome.tag_strategy.as_deref(), Some("fallback"));
        assert_eq!(content.tags.len(), 1);
        assert_eq!(content.tags[0].name, "web");
    }

    #[tokio::test]
    async fn second_save_of_the_same_url_reports_a_duplicate() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/post");
            then.status(200).body("<html><head></head></html>");
        });

        let orchestrator = orchestrator().await;
        let first = orchestrator.save(&request(&server.url("/post"))).await;
        assert!(first.success);

        // Tracking params are stripped before dedupe, so this is the same URL.
        let second = orchestrator
            .save(&request(&format!(
                "{}?utm_source=share&fbclid=xyz",
                server.url("/post")
            )))
            .await;
        assert!(!second.success);
        assert_eq!(second.code, Some(codes::DUPLICATE));
        assert_eq!(second.step, Some(SaveStep::Persistence));
        assert_eq!(second.error.as_deref(), Some("Content already saved"));
        // The duplicate outcome still describes what exists.
        assert!(second.metadata.is_some());
    }

    #[tokio::test]
    async fn telegram_identity_is_resolved_to_a_user() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/post");
            then.status(200).body("<html><head></head></html>");
        });

        let orchestrator = orchestrator().await;
        let outcome = orchestrator
            .save(&SaveRequest {
                url: server.url("/post"),
                user_id: None,
                telegram_user_id: Some("555".to_string()),
                telegram_username: Some("poster".to_string()),
                memo: None,
            })
            .await;

        assert!(outcome.success);
        let content = outcome.content.unwrap();
        let expected = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_URL, b"telegram:555").to_string();
        assert_eq!(content.user_id, expected);
    }

    #[tokio::test]
    async fn unreachable_page_still_saves_with_fallback_metadata() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        store.initialize_schema().await.unwrap();
        let extractor = MetadataExtractor::new(MetadataConfig {
            fetch_timeout: std::time::Duration::from_millis(200),
            ..MetadataConfig::default()
        })
        .unwrap();
        let tagger = TagChain::new(Vec::new(), TaggingConfig::default());
        let orchestrator = SaveOrchestrator::new(store, extractor, tagger);

        let outcome = orchestrator.save(&request("http://192.0.2.1/offline")).await;
        assert!(outcome.success);
        let content = outcome.content.unwrap();
        assert!(content.title.is_none());
        assert_eq!(content.platform, Platform::Web);
    }
}
