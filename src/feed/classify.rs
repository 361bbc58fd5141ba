//! Card variant classification.
//!
//! Decides whether a normalized market renders as a binary "chance" card
//! with a circular gauge, as a multi-outcome card, or not at all.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use strum::{Display, EnumString};

use super::normalize::{NormalizedMarket, RecordShape};

/// Rendering variant of a market card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Variant {
    /// Yes/no market with a chance gauge.
    Binary,
    /// Ranked list of outcomes.
    Multi,
}

/// Classification result for one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Render the market.
    Render {
        /// Card variant.
        variant: Variant,
        /// Gauge value, set for binary markets only.
        effective_chance: Option<Decimal>,
    },
    /// The record carries nothing renderable.
    Excluded,
}

impl Classification {
    /// The variant, if the market renders.
    pub fn variant(&self) -> Option<Variant> {
        match self {
            Classification::Render { variant, .. } => Some(*variant),
            Classification::Excluded => None,
        }
    }

    /// Whether the market is left out of the feed.
    pub fn is_excluded(&self) -> bool {
        matches!(self, Classification::Excluded)
    }
}

/// Classify a normalized market.
///
/// An explicit `chance` always wins. Without one, the market is binary when
/// its outcome names are exactly `yes` and `no` (any case, any order),
/// multi when it has at least one outcome or came with `timeRanges`, and
/// excluded otherwise.
pub fn classify(market: &NormalizedMarket) -> Classification {
    if let Some(chance) = market.chance {
        return Classification::Render {
            variant: Variant::Binary,
            effective_chance: Some(chance),
        };
    }

    match market.shape {
        RecordShape::Unrenderable | RecordShape::HasChanceOnly => return Classification::Excluded,
        RecordShape::HasOutcomes | RecordShape::HasTimeRanges => {}
    }

    // A present `timeRanges` list renders even when it is empty.
    if market.outcomes.is_empty() && market.time_ranges.is_none() {
        return Classification::Excluded;
    }

    if is_yes_no(market) {
        Classification::Render {
            variant: Variant::Binary,
            effective_chance: Some(effective_chance(market)),
        }
    } else {
        Classification::Render {
            variant: Variant::Multi,
            effective_chance: None,
        }
    }
}

/// Whether the sorted lowercase outcome names are exactly `["no", "yes"]`.
fn is_yes_no(market: &NormalizedMarket) -> bool {
    let mut names: Vec<String> = market
        .outcomes
        .iter()
        .map(|o| o.name.to_lowercase())
        .collect();
    names.sort();
    names == ["no", "yes"]
}

/// Gauge value of a binary market.
///
/// The explicit `chance` if present, otherwise the probability of the first
/// outcome named `yes` (any case), otherwise zero.
pub fn effective_chance(market: &NormalizedMarket) -> Decimal {
    market.chance.unwrap_or_else(|| {
        market
            .outcomes
            .iter()
            .find(|o| o.name.to_lowercase() == "yes")
            .map(|o| o.probability)
            .unwrap_or(Decimal::ZERO)
    })
}

/// Stroke color of the chance gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GaugeColor {
    /// Chance of 50 or more.
    Green,
    /// Chance below 50.
    Red,
}

impl GaugeColor {
    /// Hex stroke color.
    pub fn hex(&self) -> &'static str {
        match self {
            GaugeColor::Green => "#10b981",
            GaugeColor::Red => "#ef4444",
        }
    }
}

/// Geometry of the circular chance gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Gauge {
    /// Effective chance in percent.
    pub value: Decimal,
    /// Stroke length of the filled arc.
    pub arc_length: Decimal,
    /// Full circumference of the gauge circle.
    pub circumference: Decimal,
    /// Arc color.
    pub color: GaugeColor,
}

impl Gauge {
    /// Radius of the gauge circle in pixels.
    pub const RADIUS: Decimal = dec!(23);

    /// Circumference for [`Gauge::RADIUS`] (2 * pi * 23, truncated).
    pub const CIRCUMFERENCE: Decimal = dec!(144.51);

    /// Threshold at which the gauge turns green. Compared unrounded.
    pub const GREEN_THRESHOLD: Decimal = dec!(50);

    /// Build the gauge for an effective chance value.
    ///
    /// The arc is drawn for the value clamped to `0..=100`.
    pub fn for_chance(value: Decimal) -> Self {
        let color = if value >= Self::GREEN_THRESHOLD {
            GaugeColor::Green
        } else {
            GaugeColor::Red
        };

        Self {
            value,
            arc_length: value.clamp(Decimal::ZERO, dec!(100)) / dec!(100) * Self::CIRCUMFERENCE,
            circumference: Self::CIRCUMFERENCE,
            color,
        }
    }
}
