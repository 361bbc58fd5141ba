//! Amplified view of a catalog.
//!
//! The base catalog is repeated `factor` times so a handful of records can
//! drive an arbitrarily long feed. Entries are addressed by index arithmetic
//! instead of materialising `len * factor` copies.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use super::types::{MarketId, MarketRecord};
use crate::error::CatalogError;

/// Identity of an entry in the amplified catalog.
///
/// Unique across the whole amplified sequence while the content cycles.
/// Rendered as `"<replica>-<id>"` in routes and JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReplicaKey {
    /// Which copy of the base catalog.
    pub replica: u32,
    /// Original id within the base catalog.
    pub market_id: MarketId,
}

impl ReplicaKey {
    /// Create a key.
    pub fn new(replica: u32, market_id: u64) -> Self {
        Self {
            replica,
            market_id: MarketId(market_id),
        }
    }
}

impl fmt::Display for ReplicaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.replica, self.market_id)
    }
}

impl FromStr for ReplicaKey {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CatalogError::InvalidKey(s.to_string());
        let (replica, id) = s.split_once('-').ok_or_else(invalid)?;
        let replica = replica.parse::<u32>().map_err(|_| invalid())?;
        let id = id.parse::<u64>().map_err(|_| invalid())?;
        Ok(Self::new(replica, id))
    }
}

impl Serialize for ReplicaKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReplicaKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A catalog record together with its amplified identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedRecord {
    /// Amplified identity.
    pub key: ReplicaKey,
    /// Record content, shared by every replica.
    pub record: Arc<MarketRecord>,
}

/// The base catalog replicated `factor` times.
#[derive(Debug, Clone)]
pub struct AmplifiedCatalog {
    base: Arc<[Arc<MarketRecord>]>,
    index: Arc<HashMap<MarketId, usize>>,
    factor: usize,
}

impl AmplifiedCatalog {
    /// Wrap a base catalog.
    ///
    /// Rejects duplicate ids within one cycle, percentages outside
    /// `0..=100` and factors a [`ReplicaKey`] cannot address.
    pub fn new(base: Vec<MarketRecord>, factor: usize) -> Result<Self, CatalogError> {
        if u32::try_from(factor).is_err() {
            return Err(CatalogError::FactorTooLarge(factor));
        }

        let mut index = HashMap::with_capacity(base.len());
        for (pos, record) in base.iter().enumerate() {
            check_percentages(record)?;
            if index.insert(record.id, pos).is_some() {
                return Err(CatalogError::DuplicateId(record.id.0));
            }
        }

        debug!(records = base.len(), factor, "Amplified catalog built");

        Ok(Self {
            base: base.into_iter().map(Arc::new).collect(),
            index: Arc::new(index),
            factor,
        })
    }

    /// Number of records in one cycle.
    pub fn base_len(&self) -> usize {
        self.base.len()
    }

    /// Amplification factor.
    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Total number of amplified entries.
    pub fn len(&self) -> usize {
        self.base.len() * self.factor
    }

    /// Whether the amplified catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry at a position of the amplified sequence.
    pub fn get(&self, position: usize) -> Option<KeyedRecord> {
        if position >= self.len() {
            return None;
        }
        let replica = u32::try_from(position / self.base.len()).ok()?;
        let record = &self.base[position % self.base.len()];
        Some(KeyedRecord {
            key: ReplicaKey {
                replica,
                market_id: record.id,
            },
            record: Arc::clone(record),
        })
    }

    /// Entries `[page * page_size, page * page_size + page_size)`, clipped to the end.
    ///
    /// Empty once the window starts at or past the end.
    pub fn window(&self, page: usize, page_size: usize) -> Vec<KeyedRecord> {
        let start = page.saturating_mul(page_size);
        let end = start.saturating_add(page_size).min(self.len());
        (start..end).filter_map(|pos| self.get(pos)).collect()
    }

    /// Look up an entry by its amplified identity.
    pub fn lookup(&self, key: ReplicaKey) -> Option<KeyedRecord> {
        if key.replica as usize >= self.factor {
            return None;
        }
        let pos = *self.index.get(&key.market_id)?;
        Some(KeyedRecord {
            key,
            record: Arc::clone(&self.base[pos]),
        })
    }
}

fn check_percentages(record: &MarketRecord) -> Result<(), CatalogError> {
    let check = |field: &'static str, value: Decimal| {
        if (Decimal::ZERO..=dec!(100)).contains(&value) {
            Ok(())
        } else {
            Err(CatalogError::OutOfRange {
                id: record.id.0,
                field,
                value: value.to_string(),
            })
        }
    };

    if let Some(chance) = record.chance {
        check("chance", chance)?;
    }
    for outcome in record.outcomes.iter().flatten() {
        check("outcome probability", outcome.probability)?;
    }
    for range in record.time_ranges.iter().flatten() {
        check("time range probability", range.probability)?;
    }
    Ok(())
}
