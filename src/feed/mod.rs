//! Feed composition engine.
//!
//! This module handles:
//! - Normalizing heterogeneous records into one outcome-list shape
//! - Classifying records into binary / multi cards
//! - Paginating the amplified catalog with an in-flight guard
//! - Viewport-driven load triggering
//! - The task that owns feed state and publishes snapshots

pub mod classify;
pub mod cursor;
pub mod engine;
pub mod normalize;
pub mod trigger;

use std::time::Duration;

pub use classify::{classify, effective_chance, Classification, Gauge, GaugeColor, Variant};
pub use cursor::{DropReason, FeedCursor, FeedEntry, LoadOutcome, LoadTicket, RenderItem};
pub use engine::{FeedBuilder, FeedCommand, FeedControl, FeedHandle, FeedSnapshot};
pub use normalize::{normalize, NormalizedMarket, RecordShape};
pub use trigger::{
    LoadTrigger, ObservationId, ScrollLayout, ScrollViewport, Sentinel, Subscription, Viewport,
    VisibilityCallback,
};

use crate::catalog::{AmplifiedCatalog, CatalogSource};
use crate::config::Config;
use crate::error::CatalogError;

/// Entries per batch (5 rows x 4 columns).
pub const PAGE_SIZE: usize = 20;

/// Replicas of the base catalog.
pub const AMPLIFICATION_FACTOR: usize = 10;

/// Simulated fetch latency.
pub const LOAD_LATENCY: Duration = Duration::from_millis(800);

/// Sentinel visibility fraction that counts as visible.
pub const VISIBILITY_THRESHOLD: f64 = 0.1;

/// Fixed parameters of one mounted feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedSettings {
    /// Entries per batch.
    pub page_size: usize,
    /// Replicas of the base catalog.
    pub amplification_factor: usize,
    /// Simulated fetch latency.
    pub latency: Duration,
    /// Sentinel visibility threshold.
    pub visibility_threshold: f64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            amplification_factor: AMPLIFICATION_FACTOR,
            latency: LOAD_LATENCY,
            visibility_threshold: VISIBILITY_THRESHOLD,
        }
    }
}

impl From<&Config> for FeedSettings {
    fn from(config: &Config) -> Self {
        Self {
            page_size: config.page_size,
            amplification_factor: config.amplification_factor,
            latency: Duration::from_millis(config.load_latency_ms),
            visibility_threshold: config.visibility_threshold,
        }
    }
}

impl From<&Config> for ScrollLayout {
    fn from(config: &Config) -> Self {
        Self {
            columns: config.grid_columns,
            row_height: f64::from(config.row_height_px),
            viewport_height: f64::from(config.viewport_height_px),
            ..ScrollLayout::default()
        }
    }
}

impl FeedSettings {
    /// Read the base catalog once and amplify it.
    pub fn amplify(&self, source: &dyn CatalogSource) -> Result<AmplifiedCatalog, CatalogError> {
        AmplifiedCatalog::new(source.catalog()?, self.amplification_factor)
    }
}
