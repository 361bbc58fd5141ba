//! Market detail view.
//!
//! This module handles:
//! - Resolving a `"<replica>-<id>"` route key against the amplified catalog
//! - Ranking outcomes for the detail page
//! - The comment thread and its sort / holders filter
//! - Monthly price history

pub mod chart;
pub mod comments;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

pub use chart::{legend, series, LegendEntry, PricePoint};
pub use comments::{Comment, CommentSort, CommentView};

use crate::catalog::{AmplifiedCatalog, Outcome, ReplicaKey};
use crate::error::CatalogError;
use crate::feed::{Classification, FeedEntry, Gauge, NormalizedMarket, Variant};

/// Everything the detail page shows about one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDetail {
    /// Normalized market.
    pub market: NormalizedMarket,
    /// Card variant, absent when the market is excluded from the feed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<Variant>,
    /// Gauge value for binary markets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_chance: Option<Decimal>,
    /// Gauge geometry for binary markets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gauge: Option<Gauge>,
    /// Outcomes by probability, highest first.
    pub ranked_outcomes: Vec<Outcome>,
}

impl MarketDetail {
    /// Resolve a key against the catalog.
    ///
    /// Excluded markets still resolve; only the feed hides them.
    pub fn lookup(catalog: &AmplifiedCatalog, key: ReplicaKey) -> Result<Self, CatalogError> {
        let entry = catalog.lookup(key).ok_or_else(|| CatalogError::NotFound {
            key: key.to_string(),
        })?;
        let FeedEntry {
            market,
            classification,
        } = FeedEntry::ingest(&entry);

        let effective_chance = match classification {
            Classification::Render {
                effective_chance, ..
            } => effective_chance,
            Classification::Excluded => None,
        };
        debug!(%key, excluded = classification.is_excluded(), "Resolved market detail");

        Ok(Self {
            ranked_outcomes: ranked_outcomes(&market.outcomes),
            variant: classification.variant(),
            effective_chance,
            gauge: effective_chance.map(Gauge::for_chance),
            market,
        })
    }

    /// Parse a route key and resolve it.
    pub fn lookup_str(catalog: &AmplifiedCatalog, key: &str) -> Result<Self, CatalogError> {
        Self::lookup(catalog, key.parse()?)
    }
}

/// Outcomes sorted by probability, highest first. Ties keep their order.
pub fn ranked_outcomes(outcomes: &[Outcome]) -> Vec<Outcome> {
    let mut ranked = outcomes.to_vec();
    ranked.sort_by(|a, b| b.probability.cmp(&a.probability));
    ranked
}
