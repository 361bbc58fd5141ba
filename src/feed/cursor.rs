//! Feed cursor: page position, in-flight guard and the displayed sequence.
//!
//! The cursor is a plain state machine. It never sleeps or fetches; the
//! engine asks it for a [`LoadTicket`], performs the fetch elsewhere and
//! hands the result back through [`FeedCursor::complete_load`] or
//! [`FeedCursor::fail_load`].

use rust_decimal::Decimal;
use serde::Serialize;
use strum::{Display, IntoStaticStr};
use tracing::{debug, info};

use super::classify::{classify, Classification, Gauge, Variant};
use super::normalize::{normalize, NormalizedMarket};
use crate::catalog::{KeyedRecord, ReplicaKey};
use crate::error::FetchError;

/// Permission to complete one specific load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    /// Page the load was issued for.
    pub page: usize,
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadPhase {
    /// No load in flight.
    Idle,
    /// A load is in flight.
    Loading(LoadTicket),
}

/// Why a load request was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum DropReason {
    /// Another load is still in flight.
    InFlight,
    /// The catalog is exhausted.
    Exhausted,
}

/// Result of settling a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A non-empty batch was appended.
    Appended {
        /// Page that was loaded.
        page: usize,
        /// Entries appended.
        appended: usize,
        /// Of those, entries that render.
        rendered: usize,
    },
    /// The batch was empty; the feed is exhausted for good.
    Exhausted,
    /// The fetch failed; the next trigger may retry the same page.
    Failed(FetchError),
    /// The ticket does not match the load in flight; nothing changed.
    Stale,
}

/// A displayed entry, normalized and classified once at ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// Canonical market.
    pub market: NormalizedMarket,
    /// Card classification.
    pub classification: Classification,
}

impl FeedEntry {
    /// Normalize and classify a catalog entry.
    pub fn ingest(entry: &KeyedRecord) -> Self {
        let market = normalize(entry);
        let classification = classify(&market);
        Self {
            market,
            classification,
        }
    }

    /// What the presentation layer receives, or `None` when excluded.
    pub fn render(&self) -> Option<RenderItem> {
        match self.classification {
            Classification::Render {
                variant,
                effective_chance,
            } => Some(RenderItem {
                key: self.market.key,
                variant,
                effective_chance,
                gauge: effective_chance.map(Gauge::for_chance),
                market: self.market.clone(),
            }),
            Classification::Excluded => None,
        }
    }
}

/// One renderable card handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderItem {
    /// Amplified identity, also the detail route.
    pub key: ReplicaKey,
    /// Card variant.
    pub variant: Variant,
    /// Gauge value for binary cards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_chance: Option<Decimal>,
    /// Gauge geometry for binary cards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gauge: Option<Gauge>,
    /// The normalized market.
    pub market: NormalizedMarket,
}

/// Feed state owned by one feed view.
#[derive(Debug)]
pub struct FeedCursor {
    displayed: Vec<FeedEntry>,
    page: usize,
    phase: LoadPhase,
    has_more: bool,
    next_seq: u64,
}

impl Default for FeedCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedCursor {
    /// Create an empty cursor at page zero.
    pub fn new() -> Self {
        Self {
            displayed: Vec::new(),
            page: 0,
            phase: LoadPhase::Idle,
            has_more: true,
            next_seq: 0,
        }
    }

    /// Next page to fetch.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Whether a load is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, LoadPhase::Loading(_))
    }

    /// False once a fetch came back empty.
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Every appended entry, including excluded ones, in order.
    pub fn displayed(&self) -> &[FeedEntry] {
        &self.displayed
    }

    /// The rendered sequence: displayed entries minus excluded ones.
    pub fn rendered(&self) -> impl Iterator<Item = RenderItem> + '_ {
        self.displayed.iter().filter_map(FeedEntry::render)
    }

    /// Number of rendered entries.
    pub fn rendered_len(&self) -> usize {
        self.displayed
            .iter()
            .filter(|entry| !entry.classification.is_excluded())
            .count()
    }

    /// Whether a viewport trigger may start a load right now.
    pub fn trigger_allowed(&self) -> Result<(), DropReason> {
        if self.is_loading() {
            Err(DropReason::InFlight)
        } else if !self.has_more {
            Err(DropReason::Exhausted)
        } else {
            Ok(())
        }
    }

    /// Enter `Loading` for the current page.
    ///
    /// Returns `None` while another load is in flight; the request is
    /// dropped, not queued.
    pub fn begin_load(&mut self) -> Option<LoadTicket> {
        if self.is_loading() {
            debug!(page = self.page, "Load already in flight, dropping request");
            return None;
        }

        let ticket = LoadTicket {
            page: self.page,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.phase = LoadPhase::Loading(ticket);
        Some(ticket)
    }

    /// Settle the in-flight load with a fetched batch.
    ///
    /// Always returns to `Idle` when the ticket matches.
    pub fn complete_load(&mut self, ticket: LoadTicket, batch: Vec<KeyedRecord>) -> LoadOutcome {
        if self.phase != LoadPhase::Loading(ticket) {
            debug!(page = ticket.page, "Ignoring completion for stale ticket");
            return LoadOutcome::Stale;
        }
        self.phase = LoadPhase::Idle;

        if batch.is_empty() {
            self.has_more = false;
            info!(page = ticket.page, "Catalog exhausted");
            return LoadOutcome::Exhausted;
        }

        let appended = batch.len();
        let before = self.displayed.len();
        self.displayed.extend(batch.iter().map(FeedEntry::ingest));
        let rendered = self.displayed[before..]
            .iter()
            .filter(|entry| !entry.classification.is_excluded())
            .count();
        self.page += 1;

        debug!(page = ticket.page, appended, rendered, "Batch appended");
        LoadOutcome::Appended {
            page: ticket.page,
            appended,
            rendered,
        }
    }

    /// Settle the in-flight load with a failure. `has_more` is left alone.
    pub fn fail_load(&mut self, ticket: LoadTicket, error: FetchError) -> LoadOutcome {
        if self.phase != LoadPhase::Loading(ticket) {
            return LoadOutcome::Stale;
        }
        self.phase = LoadPhase::Idle;
        LoadOutcome::Failed(error)
    }
}
