//! # Application State
//!
//! This module defines the shared application state (`AppState`) and the logic
//! for building it at startup. The `AppState` holds all shared resources, such
//! as the configuration, the SQLite store, the persistence services, and the
//! save orchestrator, making them accessible to all request handlers.

use crate::config::AppConfig;
use crate::telegram::TelegramClient;
use linkstash::tagging::{claude::ClaudeTagger, openai::OpenAiTagger, TagProvider};
use linkstash::{
    ContentService, FolderService, MetadataConfig, MetadataExtractor, SaveOrchestrator,
    SqliteStore, TagChain, TaggingConfig,
};
use std::sync::Arc;

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration, loaded from `config.yml`.
    pub config: Arc<AppConfig>,
    /// The SQLite store backing every service.
    pub store: SqliteStore,
    pub contents: ContentService,
    pub folders: FolderService,
    /// The end-to-end save pipeline.
    pub orchestrator: SaveOrchestrator,
    /// Present only when a bot token is configured.
    pub telegram: Option<TelegramClient>,
}

/// Builds the shared application state from the configuration.
///
/// This instantiates a tag provider for each entry in the `tagging.providers`
/// section, sets up the metadata extractor, and connects to the SQLite
/// database, ensuring its schema is up-to-date.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let mut providers: Vec<Box<dyn TagProvider>> = Vec::new();
    for provider_config in &config.tagging.providers {
        let provider: Box<dyn TagProvider> = match provider_config.provider.as_str() {
            "openai" => {
                let api_url = provider_config
                    .api_url
                    .clone()
                    .unwrap_or_else(|| linkstash::tagging::openai::OPENAI_API_URL.to_string());
                Box::new(OpenAiTagger::new(
                    api_url,
                    provider_config.api_key.clone(),
                    provider_config.model_name.clone(),
                )?)
            }
            "claude" => {
                let api_key = provider_config.api_key.clone().ok_or_else(|| {
                    anyhow::anyhow!("api_key is required for the claude tag provider")
                })?;
                let api_url = provider_config
                    .api_url
                    .clone()
                    .unwrap_or_else(|| linkstash::tagging::claude::CLAUDE_API_URL.to_string());
                let model = provider_config
                    .model_name
                    .clone()
                    .unwrap_or_else(|| "claude-3-haiku-20240307".to_string());
                Box::new(ClaudeTagger::new(api_url, api_key, model)?)
            }
            other => {
                return Err(anyhow::anyhow!("Unsupported tag provider type '{other}'"));
            }
        };
        providers.push(provider);
    }

    let mut tagging_config = TaggingConfig::default();
    if let Some(min_tags) = config.tagging.min_tags {
        tagging_config.min_tags = min_tags;
    }
    if let Some(max_tags) = config.tagging.max_tags {
        tagging_config.max_tags = max_tags;
    }
    let tagger = TagChain::new(providers, tagging_config);

    let mut metadata_config = MetadataConfig {
        facebook_app_id: config.metadata.facebook_app_id.clone(),
        facebook_app_secret: config.metadata.facebook_app_secret.clone(),
        ..MetadataConfig::default()
    };
    if let Some(oembed_url) = config.metadata.instagram_oembed_url.clone() {
        metadata_config.instagram_oembed_url = oembed_url;
    }
    let extractor = MetadataExtractor::new(metadata_config)?;

    let store = SqliteStore::new(&config.db_url).await?;
    tracing::info!(db_path = %config.db_url, "Initialized local storage (SQLite).");
    // Ensure the database schema is up-to-date on startup.
    store.initialize_schema().await?;

    let telegram = config
        .telegram
        .bot_token
        .as_deref()
        .map(|token| TelegramClient::new(token, config.telegram.api_url.as_deref()))
        .transpose()?;

    Ok(AppState {
        contents: ContentService::new(store.clone()),
        folders: FolderService::new(store.clone()),
        orchestrator: SaveOrchestrator::new(store.clone(), extractor, tagger),
        config: Arc::new(config),
        store,
        telegram,
    })
}
