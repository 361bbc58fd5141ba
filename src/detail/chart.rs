//! Monthly price history per outcome.

use rust_decimal::Decimal;
use serde::Serialize;

/// Probabilities of every tracked outcome in one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricePoint {
    /// Month label.
    pub month: String,
    /// `(outcome, probability)` in legend order.
    pub values: Vec<(String, Decimal)>,
}

impl PricePoint {
    /// Start a point with no values.
    pub fn new(month: impl Into<String>) -> Self {
        Self {
            month: month.into(),
            values: Vec::new(),
        }
    }

    /// Add one outcome's probability.
    pub fn with(mut self, outcome: impl Into<String>, probability: Decimal) -> Self {
        self.values.push((outcome.into(), probability));
        self
    }

    /// Probability of `outcome` in this month.
    pub fn value(&self, outcome: &str) -> Option<Decimal> {
        self.values
            .iter()
            .find(|(name, _)| name == outcome)
            .map(|(_, p)| *p)
    }
}

/// One legend entry: an outcome and its latest probability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    /// Outcome name.
    pub outcome: String,
    /// Probability in the last month.
    pub latest: Decimal,
}

/// Legend for a history, in the order outcomes first appear.
pub fn legend(history: &[PricePoint]) -> Vec<LegendEntry> {
    let Some(last) = history.last() else {
        return Vec::new();
    };

    let mut entries: Vec<LegendEntry> = Vec::new();
    for point in history {
        for (name, _) in &point.values {
            if entries.iter().any(|e| &e.outcome == name) {
                continue;
            }
            if let Some(latest) = last.value(name) {
                entries.push(LegendEntry {
                    outcome: name.clone(),
                    latest,
                });
            }
        }
    }
    entries
}

/// One outcome's line: `(month, probability)` for every month it appears in.
pub fn series<'a>(history: &'a [PricePoint], outcome: &str) -> Vec<(&'a str, Decimal)> {
    history
        .iter()
        .filter_map(|point| point.value(outcome).map(|p| (point.month.as_str(), p)))
        .collect()
}
