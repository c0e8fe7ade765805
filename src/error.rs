//! Error types for dnrc.

use thiserror::Error;

/// Error type for dnrc operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Fetch error for a single source list
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Rule installation error
    #[error("install error: {0}")]
    Install(#[from] InstallError),

    /// Refresh failed
    #[error("refresh failed: {0}")]
    Refresh(#[from] RefreshError),
}

/// Result type alias for dnrc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for fetching one source list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, DNS or body read failure
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("HTTP {code}")]
    HttpStatus { code: u16 },

    /// Request exceeded the per-fetch timeout
    #[error("timed out")]
    Timeout,
}

/// Error type for the rule matching engine's update call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    /// A rule has an empty url filter
    #[error("rule {0} has an empty url filter")]
    EmptyUrlFilter(u32),

    /// A rule has no resource types
    #[error("rule {0} has no resource types")]
    EmptyResourceTypes(u32),

    /// Two rules share an id after applying the update
    #[error("duplicate rule id: {0}")]
    DuplicateId(u32),

    /// Rule id 0 is reserved
    #[error("rule ids must be positive")]
    ZeroId,

    /// The engine backend failed
    #[error("rule engine unavailable: {0}")]
    Backend(String),
}

/// Error type for a refresh cycle.
///
/// Cloneable so every caller waiting on the same in-flight refresh receives
/// the same outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// Every source produced zero rules; existing rules are kept.
    #[error("all {sources} source lists produced zero rules, keeping existing rules")]
    EmptyResult { sources: usize },

    /// The rule engine rejected the new rule set.
    #[error("rule installation rejected: {0}")]
    Install(#[from] InstallError),

    /// The new artifact could not be persisted.
    #[error("cache write failed: {0}")]
    Cache(String),

    /// The refresh task panicked or was cancelled.
    #[error("refresh task aborted: {0}")]
    Aborted(String),
}
