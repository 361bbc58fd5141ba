//! Market record types as supplied by a catalog source.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier of a market within one catalog cycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MarketId(pub u64);

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One named outcome of a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Display name ("Yes", "Zohran Mamdani", "October 31", ...).
    pub name: String,
    /// Probability in percent, 0 - 100.
    pub probability: Decimal,
    /// Recent change in percentage points, if known.
    #[serde(default)]
    pub change: Option<Decimal>,
}

impl Outcome {
    /// Create an outcome without change information.
    pub fn new(name: impl Into<String>, probability: Decimal) -> Self {
        Self {
            name: name.into(),
            probability,
            change: None,
        }
    }

    /// Set the change value.
    pub fn with_change(mut self, change: Decimal) -> Self {
        self.change = Some(change);
        self
    }
}

/// Alternate outcome encoding used by date-bucketed markets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Period label, becomes the outcome name.
    pub period: String,
    /// Probability in percent, 0 - 100.
    pub probability: Decimal,
}

/// A market as provided by the catalog. Never mutated by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRecord {
    /// Unique within one catalog cycle.
    pub id: MarketId,
    /// Market question.
    pub title: String,
    /// Display glyph.
    pub image: String,
    /// Resolution deadline, pre-formatted.
    #[serde(default)]
    pub deadline: Option<String>,
    /// Traded volume, pre-formatted (e.g. "$209m").
    pub volume: String,
    /// Explicit yes-chance in percent for binary markets.
    #[serde(default)]
    pub chance: Option<Decimal>,
    /// Named outcomes.
    #[serde(default)]
    pub outcomes: Option<Vec<Outcome>>,
    /// Period-bucketed outcomes.
    #[serde(default)]
    pub time_ranges: Option<Vec<TimeRange>>,
}

impl MarketRecord {
    /// Create a bare record with no renderable signal.
    pub fn new(id: u64, title: impl Into<String>, image: impl Into<String>, volume: impl Into<String>) -> Self {
        Self {
            id: MarketId(id),
            title: title.into(),
            image: image.into(),
            deadline: None,
            volume: volume.into(),
            chance: None,
            outcomes: None,
            time_ranges: None,
        }
    }

    /// Set the deadline.
    pub fn deadline(mut self, deadline: impl Into<String>) -> Self {
        self.deadline = Some(deadline.into());
        self
    }

    /// Set the explicit chance.
    pub fn chance(mut self, chance: Decimal) -> Self {
        self.chance = Some(chance);
        self
    }

    /// Set the outcomes.
    pub fn outcomes(mut self, outcomes: Vec<Outcome>) -> Self {
        self.outcomes = Some(outcomes);
        self
    }

    /// Set the time ranges.
    pub fn time_ranges(mut self, ranges: Vec<TimeRange>) -> Self {
        self.time_ranges = Some(ranges);
        self
    }
}
