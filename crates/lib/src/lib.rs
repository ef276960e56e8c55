//! # linkstash
//!
//! Core library for the linkstash bookmarking service. It provides the save
//! pipeline that turns a raw URL into a persisted bookmark: platform
//! classification, page metadata extraction (with an Instagram oEmbed
//! fallback chain), AI tag generation over interchangeable providers, and
//! persistence against a SQLite store.

pub mod content;
pub mod errors;
pub mod folders;
pub mod metadata;
pub mod platform;
pub mod save;
pub mod store;
pub mod tagging;

pub use content::{
    ContentFilters, ContentService, ContentStats, ContentUpdate, Page, Pagination, SavedContent,
    Tag,
};
pub use errors::{MetadataError, StoreError, TaggingError};
pub use folders::{Folder, FolderService};
pub use metadata::{ExtractedMetadata, MetadataConfig, MetadataExtractor};
pub use platform::Platform;
pub use save::{SaveOrchestrator, SaveOutcome, SaveRequest, SaveStep};
pub use store::SqliteStore;
pub use tagging::{GeneratedTag, TagAnalysis, TagChain, TaggingConfig, TaggingInput};
