//! Record normalization.
//!
//! Every record is tagged with its [`RecordShape`] once at ingestion; the
//! normalizer and classifier dispatch on the tag instead of probing optional
//! fields again.

use rust_decimal::Decimal;
use serde::Serialize;
use strum::{Display, EnumString};

use crate::catalog::{KeyedRecord, MarketRecord, Outcome, ReplicaKey, TimeRange};

/// Which raw encoding a record arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordShape {
    /// Carries `outcomes` (possibly alongside `chance`).
    HasOutcomes,
    /// Carries `timeRanges` and no `outcomes`.
    HasTimeRanges,
    /// Carries only an explicit `chance`.
    HasChanceOnly,
    /// Carries nothing the feed can render.
    Unrenderable,
}

impl RecordShape {
    /// Tag a record. `outcomes` wins over `timeRanges` when both are present.
    pub fn of(record: &MarketRecord) -> Self {
        if record.outcomes.is_some() {
            RecordShape::HasOutcomes
        } else if record.time_ranges.is_some() {
            RecordShape::HasTimeRanges
        } else if record.chance.is_some() {
            RecordShape::HasChanceOnly
        } else {
            RecordShape::Unrenderable
        }
    }
}

/// A record in the canonical outcome-list shape.
///
/// Derived per ingestion, never written back to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMarket {
    /// Amplified identity.
    pub key: ReplicaKey,
    /// Market question.
    pub title: String,
    /// Display glyph.
    pub image: String,
    /// Resolution deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    /// Pre-formatted volume.
    pub volume: String,
    /// Explicit chance, passed through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chance: Option<Decimal>,
    /// Outcomes, derived from `timeRanges` when the record had no `outcomes`.
    pub outcomes: Vec<Outcome>,
    /// Original time ranges, passed through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_ranges: Option<Vec<TimeRange>>,
    /// Raw shape the record arrived in.
    pub shape: RecordShape,
}

/// Convert a keyed record into the canonical shape.
///
/// Total: absent optional fields propagate as absent/empty.
pub fn normalize(entry: &KeyedRecord) -> NormalizedMarket {
    let record = entry.record.as_ref();
    let shape = RecordShape::of(record);

    let outcomes = match shape {
        RecordShape::HasOutcomes => record.outcomes.clone().unwrap_or_default(),
        RecordShape::HasTimeRanges => record
            .time_ranges
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|range| Outcome {
                name: range.period.clone(),
                probability: range.probability,
                change: None,
            })
            .collect(),
        RecordShape::HasChanceOnly | RecordShape::Unrenderable => Vec::new(),
    };

    NormalizedMarket {
        key: entry.key,
        title: record.title.clone(),
        image: record.image.clone(),
        deadline: record.deadline.clone(),
        volume: record.volume.clone(),
        chance: record.chance,
        outcomes,
        time_ranges: record.time_ranges.clone(),
        shape,
    }
}
