use thiserror::Error;

/// Errors surfaced by the persistence services.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage connection failed: {0}")]
    Connection(String),
    #[error("Storage operation failed: {0}")]
    OperationFailed(String),
    #[error("Content already saved")]
    Duplicate,
    #[error("Not found")]
    NotFound,
    #[error("Default folder cannot be deleted")]
    DefaultFolder,
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),
}

/// Errors produced by a single tag provider attempt.
///
/// These never cross the tagging boundary as failures: the `TagChain`
/// absorbs them into per-attempt diagnostics and moves on to the next
/// provider in the chain.
#[derive(Error, Debug)]
pub enum TaggingError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Request to tag provider failed: {0}")]
    Request(reqwest::Error),
    #[error("Failed to deserialize tag provider response: {0}")]
    Deserialization(reqwest::Error),
    #[error("Tag provider returned an error: {0}")]
    Api(String),
    #[error("Tag provider response was not usable: {0}")]
    Parse(String),
    #[error("Tag provider timed out after {0}ms")]
    Timeout(u128),
}

/// Errors internal to metadata extraction.
///
/// `MetadataExtractor::extract` converts every one of these into a fallback
/// metadata object or a `None`; only client construction can fail outward.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Request to oEmbed API failed: {0}")]
    OembedRequest(reqwest::Error),
    #[error("oEmbed API returned an error: {0}")]
    OembedApi(String),
    #[error("Failed to deserialize oEmbed response: {0}")]
    OembedDeserialization(reqwest::Error),
    #[error("Failed to fetch page: {0}")]
    Fetch(reqwest::Error),
    #[error("Page returned an error status: {0}")]
    FetchStatus(u16),
}
