//! Market catalog module.
//!
//! This module handles:
//! - Market record types and their JSON shape
//! - The built-in mock catalog
//! - Catalog sources and the batch fetch seam
//! - Amplification of a finite catalog into a long feed

pub mod amplify;
pub mod mock;
pub mod source;
pub mod types;

pub use amplify::{AmplifiedCatalog, KeyedRecord, ReplicaKey};
pub use mock::{mock_comments, mock_markets, mock_price_history};
pub use source::{BatchSource, CatalogSource, JsonCatalog, MockCatalog};
pub use types::{MarketId, MarketRecord, Outcome, TimeRange};
