//! Catalog sources and the batch fetch seam.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use super::amplify::{AmplifiedCatalog, KeyedRecord};
use super::mock::mock_markets;
use super::types::MarketRecord;
use crate::error::{CatalogError, FetchError};

/// Supplies the base catalog. Read once when a feed is mounted.
pub trait CatalogSource {
    /// The ordered base catalog.
    fn catalog(&self) -> Result<Vec<MarketRecord>, CatalogError>;
}

/// The built-in mock markets.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockCatalog;

impl CatalogSource for MockCatalog {
    fn catalog(&self) -> Result<Vec<MarketRecord>, CatalogError> {
        Ok(mock_markets().to_vec())
    }
}

/// A JSON file holding an array of market records.
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    path: PathBuf,
}

impl JsonCatalog {
    /// Create a source for the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the catalog file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse a catalog from JSON text.
    pub fn parse(text: &str) -> Result<Vec<MarketRecord>, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl CatalogSource for JsonCatalog {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn catalog(&self) -> Result<Vec<MarketRecord>, CatalogError> {
        let load_err = |reason: String| CatalogError::Load {
            path: self.path.display().to_string(),
            reason,
        };

        let text = std::fs::read_to_string(&self.path).map_err(|e| load_err(e.to_string()))?;
        let records = Self::parse(&text).map_err(|e| load_err(e.to_string()))?;

        info!(records = records.len(), "Loaded catalog file");
        Ok(records)
    }
}

/// Produces feed batches by page index.
///
/// The engine calls this after the simulated latency has elapsed. A source
/// backed by a real service reports failures as [`FetchError`].
pub trait BatchSource: Send + Sync + 'static {
    /// Fetch the batch for `page`. An empty batch means the feed is exhausted.
    fn fetch(&self, page: usize, page_size: usize) -> Result<Vec<KeyedRecord>, FetchError>;
}

impl BatchSource for AmplifiedCatalog {
    fn fetch(&self, page: usize, page_size: usize) -> Result<Vec<KeyedRecord>, FetchError> {
        Ok(self.window(page, page_size))
    }
}
