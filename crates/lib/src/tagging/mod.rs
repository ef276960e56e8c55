//! # Tag Generation
//!
//! Turns extracted metadata into a small set of tags via an ordered chain
//! of AI providers with a deterministic rule-based fallback. Provider
//! failures are absorbed into per-attempt diagnostics; tagging can degrade
//! but it can never fail the save pipeline.

pub mod claude;
pub mod openai;

use crate::errors::TaggingError;
use crate::metadata::ExtractedMetadata;
use async_trait::async_trait;
use dyn_clone::DynClone;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// The slice of metadata a provider sees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggingInput {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Platform display name, e.g. "YouTube".
    pub platform: String,
    pub creator_name: Option<String>,
    pub url: String,
}

impl From<&ExtractedMetadata> for TaggingInput {
    fn from(metadata: &ExtractedMetadata) -> Self {
        Self {
            title: metadata.title.clone(),
            description: metadata.description.clone(),
            platform: metadata.platform.display_name().to_string(),
            creator_name: metadata.creator_name.clone(),
            url: metadata.normalized_url.clone(),
        }
    }
}

/// A transient tag produced by a provider; persisted only once copied into
/// tag and association rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedTag {
    pub name: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub category: Option<String>,
}

/// Tuning for the provider chain.
#[derive(Debug, Clone)]
pub struct TaggingConfig {
    /// A provider's output is accepted only with at least this many tags.
    pub min_tags: usize,
    pub max_tags: usize,
    /// Advisory floor passed along in prompts; tags are not filtered by
    /// confidence today.
    pub min_confidence: f64,
    /// Bound on each individual provider attempt.
    pub timeout: Duration,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            min_tags: 3,
            max_tags: 5,
            min_confidence: 0.6,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Diagnostics for one provider attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderAttempt {
    pub provider: String,
    pub success: bool,
    pub tag_count: usize,
    pub elapsed_ms: u128,
    pub error: Option<String>,
}

/// The final output of the chain: tags plus how they were obtained.
#[derive(Debug, Clone, Serialize)]
pub struct TagAnalysis {
    pub tags: Vec<GeneratedTag>,
    pub attempts: Vec<ProviderAttempt>,
    /// Which provider's output was used, or "fallback".
    pub strategy: String,
    pub elapsed_ms: u128,
}

/// A single tagging capability in the chain.
#[async_trait]
pub trait TagProvider: Send + Sync + Debug + DynClone {
    /// Short stable name used in diagnostics ("openai", "claude", ...).
    fn name(&self) -> &'static str;

    /// Produces candidate tags for the input.
    async fn generate(&self, input: &TaggingInput) -> Result<Vec<GeneratedTag>, TaggingError>;
}

dyn_clone::clone_trait_object!(TagProvider);

/// An ordered list of providers tried in sequence, with a rule-based
/// platform tag as the terminal fallback.
#[derive(Debug, Clone)]
pub struct TagChain {
    providers: Vec<Box<dyn TagProvider>>,
    config: TaggingConfig,
}

impl TagChain {
    pub fn new(providers: Vec<Box<dyn TagProvider>>, config: TaggingConfig) -> Self {
        Self { providers, config }
    }

    pub fn config(&self) -> &TaggingConfig {
        &self.config
    }

    /// Runs the chain. Always returns an analysis; the worst case is the
    /// single platform fallback tag (or none, for an unnamed platform).
    pub async fn generate(&self, input: &TaggingInput) -> TagAnalysis {
        let started = Instant::now();
        let mut attempts = Vec::new();

        for provider in &self.providers {
            let attempt_started = Instant::now();
            let outcome =
                match tokio::time::timeout(self.config.timeout, provider.generate(input)).await {
                    Ok(result) => result,
                    Err(_) => Err(TaggingError::Timeout(self.config.timeout.as_millis())),
                };
            let elapsed_ms = attempt_started.elapsed().as_millis();

            match outcome {
                Ok(mut tags) => {
                    tags.truncate(self.config.max_tags);
                    let tag_count = tags.len();
                    attempts.push(ProviderAttempt {
                        provider: provider.name().to_string(),
                        success: true,
                        tag_count,
                        elapsed_ms,
                        error: None,
                    });
                    if tag_count >= self.config.min_tags {
                        return TagAnalysis {
                            tags,
                            attempts,
                            strategy: provider.name().to_string(),
                            elapsed_ms: started.elapsed().as_millis(),
                        };
                    }
                    debug!(
                        provider = provider.name(),
                        tag_count, "Provider returned too few tags, trying next"
                    );
                }
                Err(e) => {
                    warn!(provider = provider.name(), "Tag provider failed: {e}");
                    attempts.push(ProviderAttempt {
                        provider: provider.name().to_string(),
                        success: false,
                        tag_count: 0,
                        elapsed_ms,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        TagAnalysis {
            tags: fallback_tags(input),
            attempts,
            strategy: "fallback".to_string(),
            elapsed_ms: started.elapsed().as_millis(),
        }
    }
}

/// The deterministic non-AI fallback: one tag derived from the platform
/// name, with a fixed confidence.
pub fn fallback_tags(input: &TaggingInput) -> Vec<GeneratedTag> {
    if input.platform.is_empty() {
        return Vec::new();
    }
    vec![GeneratedTag {
        name: input.platform.to_lowercase(),
        confidence: 0.7,
        category: Some("platform".to_string()),
    }]
}

/// The prompt shared by all AI providers.
pub const TAGGING_PROMPT: &str = "Analyze the content below and generate 3-5 short tags.\n\
Title: {title}\n\
Description: {description}\n\
Platform: {platform}\n\
Respond in JSON: {\"tags\": [{\"name\": \"tag\", \"confidence\": 0.9, \"category\": \"topic\"}]}";

pub fn fill_prompt(input: &TaggingInput) -> String {
    TAGGING_PROMPT
        .replace("{title}", input.title.as_deref().unwrap_or(""))
        .replace("{description}", input.description.as_deref().unwrap_or(""))
        .replace("{platform}", &input.platform)
}

/// Pulls well-formed tags out of a provider's JSON response. Entries
/// without a name are skipped; at most five are kept.
pub(crate) fn parse_tags_json(value: &Value) -> Vec<GeneratedTag> {
    let Some(entries) = value.get("tags").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| serde_json::from_value::<GeneratedTag>(entry.clone()).ok())
        .filter(|tag| !tag.name.trim().is_empty())
        .take(5)
        .collect()
}
