//! Unified error types for the market feed.

use thiserror::Error;

/// Unified error type for the market feed.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Catalog loading or lookup error.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Batch fetch error.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// The feed engine task is gone.
    #[error("feed engine stopped")]
    EngineStopped,

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Catalog source and market lookup errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Failed to read or parse a catalog file.
    #[error("failed to load catalog {path}: {reason}")]
    Load {
        /// Path of the catalog file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Two records of one catalog cycle share an id.
    #[error("duplicate market id {0} in catalog")]
    DuplicateId(u64),

    /// A chance or probability lies outside 0..=100.
    #[error("market {id}: {field} {value} is outside 0..=100")]
    OutOfRange {
        /// Offending market id.
        id: u64,
        /// Which value was out of range.
        field: &'static str,
        /// The value as read.
        value: String,
    },

    /// More replicas than a route key can address.
    #[error("amplification factor {0} exceeds {max}", max = u32::MAX)]
    FactorTooLarge(usize),

    /// A route key could not be parsed.
    #[error("invalid market key {0:?}, expected \"<replica>-<id>\"")]
    InvalidKey(String),

    /// No market exists for the key.
    #[error("market {key} not found")]
    NotFound {
        /// The route key that was looked up.
        key: String,
    },
}

/// Batch fetch errors.
///
/// The simulated source never fails; a real fetch reports failures here so
/// the cursor can clear its in-flight flag and let the next trigger retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The page could not be fetched.
    #[error("failed to fetch page {page}: {reason}")]
    Failed {
        /// Page index that was requested.
        page: usize,
        /// Reason for failure.
        reason: String,
    },
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, FeedError>;
