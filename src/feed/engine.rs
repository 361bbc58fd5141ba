//! Feed engine task.
//!
//! One tokio task owns the [`FeedCursor`]. Load requests, sentinel
//! notifications and fetch completions all arrive as messages on that task,
//! so the in-flight guard is never raced. State leaves the task as
//! [`FeedSnapshot`]s on a watch channel.

use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::cursor::{DropReason, FeedCursor, LoadOutcome, LoadTicket, RenderItem};
use super::trigger::{LoadTrigger, Viewport, VisibilityCallback};
use super::FeedSettings;
use crate::catalog::{BatchSource, KeyedRecord};
use crate::error::{FeedError, FetchError, Result};
use crate::metrics;

/// Requests accepted by a mounted feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedCommand {
    /// Start loading the next page unless a load is in flight.
    LoadMore,
    /// The sentinel became visible with this fraction.
    SentinelVisible(f64),
    /// Tear the feed down.
    Shutdown,
}

/// A settled fetch, sent back to the engine task.
#[derive(Debug)]
struct Completion {
    ticket: LoadTicket,
    result: std::result::Result<Vec<KeyedRecord>, FetchError>,
    started: Instant,
}

/// Point-in-time view of the feed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    /// Next page to fetch.
    pub page: usize,
    /// Whether a load is in flight.
    pub loading: bool,
    /// False once the catalog is exhausted.
    pub has_more: bool,
    /// Entries appended so far, excluded ones included.
    pub displayed: usize,
    /// Cards to render, in order.
    pub items: Vec<RenderItem>,
    /// When this snapshot was published.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl FeedSnapshot {
    fn of(cursor: &FeedCursor) -> Self {
        Self {
            page: cursor.page(),
            loading: cursor.is_loading(),
            has_more: cursor.has_more(),
            displayed: cursor.displayed().len(),
            items: cursor.rendered().collect(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    /// Whether at least one batch has been appended.
    pub fn is_ready(&self) -> bool {
        self.displayed > 0
    }
}

/// Cheap, cloneable sender for feed commands.
#[derive(Debug, Clone)]
pub struct FeedControl {
    commands: mpsc::UnboundedSender<FeedCommand>,
}

impl FeedControl {
    /// Ask for the next page.
    pub fn load_more(&self) -> Result<()> {
        self.send(FeedCommand::LoadMore)
    }

    /// Report sentinel visibility from an external viewport.
    pub fn sentinel_visible(&self, ratio: f64) -> Result<()> {
        self.send(FeedCommand::SentinelVisible(ratio))
    }

    /// Ask the engine to tear down.
    pub fn shutdown(&self) -> Result<()> {
        self.send(FeedCommand::Shutdown)
    }

    fn send(&self, command: FeedCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| FeedError::EngineStopped)
    }
}

/// Builder for a feed engine.
pub struct FeedBuilder {
    source: Arc<dyn BatchSource>,
    settings: FeedSettings,
    viewport: Option<Arc<dyn Viewport>>,
}

impl FeedBuilder {
    /// Start a builder over a batch source with default settings.
    pub fn new(source: Arc<dyn BatchSource>) -> Self {
        Self {
            source,
            settings: FeedSettings::default(),
            viewport: None,
        }
    }

    /// Override the feed settings.
    pub fn settings(mut self, settings: FeedSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Drive loads from a viewport's sentinel notifications.
    pub fn viewport(mut self, viewport: Arc<dyn Viewport>) -> Self {
        self.viewport = Some(viewport);
        self
    }

    /// Spawn the engine task and issue the initial load.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(self) -> FeedHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        let cursor = FeedCursor::new();
        let (snapshot_tx, snapshot_rx) = watch::channel(FeedSnapshot::of(&cursor));

        // The callback holds a weak sender so a live observation does not
        // keep the engine alive after every handle is gone.
        let trigger = self.viewport.map(|viewport| {
            let weak = command_tx.downgrade();
            let callback: VisibilityCallback = Arc::new(move |ratio| {
                if let Some(commands) = weak.upgrade() {
                    let _ = commands.send(FeedCommand::SentinelVisible(ratio));
                }
            });
            LoadTrigger::new(viewport, self.settings.visibility_threshold, callback)
        });

        let engine = FeedEngine {
            cursor,
            source: self.source,
            settings: self.settings,
            trigger,
            snapshot_tx,
            completion_tx,
            in_flight: None,
        };
        let task = tokio::spawn(engine.run(command_rx, completion_rx));

        FeedHandle {
            control: FeedControl {
                commands: command_tx,
            },
            snapshots: snapshot_rx,
            task,
        }
    }
}

/// Owner handle of a mounted feed.
///
/// Dropping every [`FeedHandle`] and [`FeedControl`] tears the feed down.
#[derive(Debug)]
pub struct FeedHandle {
    control: FeedControl,
    snapshots: watch::Receiver<FeedSnapshot>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    /// A cloneable command sender.
    pub fn control(&self) -> FeedControl {
        self.control.clone()
    }

    /// Ask for the next page.
    pub fn load_more(&self) -> Result<()> {
        self.control.load_more()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a snapshot satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&FeedSnapshot) -> bool,
    ) -> Result<FeedSnapshot> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(predicate)
            .await
            .map_err(|_| FeedError::EngineStopped)?;
        Ok(snapshot.clone())
    }

    /// Tear the feed down and wait for the task to finish.
    ///
    /// Any in-flight load is abandoned and its result never applied.
    pub async fn teardown(self) {
        let _ = self.control.shutdown();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Feed engine task ended abnormally");
        }
    }
}

/// State owned by the engine task.
struct FeedEngine {
    cursor: FeedCursor,
    source: Arc<dyn BatchSource>,
    settings: FeedSettings,
    trigger: Option<LoadTrigger>,
    snapshot_tx: watch::Sender<FeedSnapshot>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    in_flight: Option<JoinHandle<()>>,
}

impl FeedEngine {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<FeedCommand>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        info!(
            page_size = self.settings.page_size,
            latency_ms = self.settings.latency.as_millis() as u64,
            "Feed mounted"
        );

        self.load_more();
        self.rearm();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(FeedCommand::LoadMore) => self.load_more(),
                    Some(FeedCommand::SentinelVisible(ratio)) => self.on_sentinel(ratio),
                    Some(FeedCommand::Shutdown) | None => break,
                },
                Some(completion) = completions.recv() => self.settle(completion),
            }
        }

        self.teardown();
    }

    /// Begin a load unless one is in flight.
    fn load_more(&mut self) {
        let Some(ticket) = self.cursor.begin_load() else {
            metrics::inc_load_dropped(DropReason::InFlight);
            return;
        };
        self.publish();

        let source = Arc::clone(&self.source);
        let completions = self.completion_tx.clone();
        let latency = self.settings.latency;
        let page_size = self.settings.page_size;

        self.in_flight = Some(tokio::spawn(async move {
            let started = Instant::now();
            tokio::time::sleep(latency).await;
            let result = source.fetch(ticket.page, page_size);
            let _ = completions.send(Completion {
                ticket,
                result,
                started,
            });
        }));
    }

    fn on_sentinel(&mut self, ratio: f64) {
        let visible = match &self.trigger {
            Some(trigger) => trigger.is_visible(ratio),
            None => ratio > 0.0 && ratio >= self.settings.visibility_threshold,
        };
        if !visible {
            return;
        }

        match self.cursor.trigger_allowed() {
            Ok(()) => self.load_more(),
            Err(reason) => {
                debug!(%reason, ratio, "Sentinel visible, load not started");
                metrics::inc_load_dropped(reason);
            }
        }
    }

    #[instrument(skip(self, completion), fields(page = completion.ticket.page))]
    fn settle(&mut self, completion: Completion) {
        let Completion {
            ticket,
            result,
            started,
        } = completion;

        let outcome = match result {
            Ok(batch) => self.cursor.complete_load(ticket, batch),
            Err(e) => self.cursor.fail_load(ticket, e),
        };

        match &outcome {
            LoadOutcome::Appended {
                appended, rendered, ..
            } => {
                metrics::record_batch_appended(*appended, *rendered);
            }
            LoadOutcome::Exhausted => metrics::inc_catalog_exhausted(),
            LoadOutcome::Failed(e) => {
                warn!(error = %e, "Batch fetch failed");
                metrics::inc_fetch_failures();
            }
            LoadOutcome::Stale => return,
        }
        metrics::record_load_latency(started.elapsed());

        self.in_flight = None;
        self.publish();
        self.rearm();
    }

    /// Move the sentinel under the current tail while more pages exist.
    fn rearm(&mut self) {
        let rendered_len = self.cursor.rendered_len();
        let has_more = self.cursor.has_more();
        if let Some(trigger) = self.trigger.as_mut() {
            if has_more {
                trigger.rearm(rendered_len);
            } else {
                trigger.disarm();
            }
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(FeedSnapshot::of(&self.cursor));
    }

    fn teardown(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
            debug!(page = self.cursor.page(), "Abandoned in-flight load");
        }
        if let Some(trigger) = self.trigger.as_mut() {
            trigger.disarm();
        }
        info!(
            displayed = self.cursor.displayed().len(),
            "Feed torn down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{mock_markets, AmplifiedCatalog, ReplicaKey};
    use crate::feed::trigger::{ScrollLayout, ScrollViewport};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn catalog() -> Arc<AmplifiedCatalog> {
        Arc::new(AmplifiedCatalog::new(mock_markets().to_vec(), 10).unwrap())
    }

    /// Counts fetches and optionally fails the first one.
    struct FlakySource {
        inner: AmplifiedCatalog,
        fetches: AtomicUsize,
        fail_first: bool,
    }

    impl BatchSource for FlakySource {
        fn fetch(
            &self,
            page: usize,
            page_size: usize,
        ) -> std::result::Result<Vec<KeyedRecord>, FetchError> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && n == 0 {
                return Err(FetchError::Failed {
                    page,
                    reason: "connection reset".to_string(),
                });
            }
            self.inner.fetch(page, page_size)
        }
    }

    fn flaky(fail_first: bool) -> Arc<FlakySource> {
        Arc::new(FlakySource {
            inner: AmplifiedCatalog::new(mock_markets().to_vec(), 10).unwrap(),
            fetches: AtomicUsize::new(0),
            fail_first,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn mount_issues_the_initial_load() {
        let feed = FeedBuilder::new(catalog()).mount();

        let first = feed.wait_for(|s| s.loading).await.unwrap();
        assert_eq!(first.page, 0);
        assert!(first.items.is_empty());

        let loaded = feed.wait_for(|s| s.is_ready()).await.unwrap();
        assert_eq!(loaded.page, 1);
        assert!(!loaded.loading);
        assert_eq!(loaded.displayed, 20);
        assert_eq!(loaded.items.len(), 18);
        assert_eq!(loaded.items[0].key, ReplicaKey::new(0, 2));

        feed.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn load_more_while_loading_appends_one_batch() {
        let source = flaky(false);
        let feed = FeedBuilder::new(source.clone()).mount();
        feed.wait_for(|s| s.loading).await.unwrap();

        feed.load_more().unwrap();
        feed.load_more().unwrap();
        feed.load_more().unwrap();

        let loaded = feed.wait_for(|s| s.is_ready()).await.unwrap();
        assert_eq!(loaded.displayed, 20);

        tokio::time::sleep(Duration::from_secs(5)).await;
        let settled = feed.snapshot();
        assert_eq!(settled.displayed, 20);
        assert_eq!(settled.page, 1);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        feed.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn batch_arrives_after_the_configured_latency() {
        let settings = FeedSettings {
            latency: Duration::from_millis(800),
            ..FeedSettings::default()
        };
        let feed = FeedBuilder::new(catalog()).settings(settings).mount();
        feed.wait_for(|s| s.loading).await.unwrap();

        tokio::time::sleep(Duration::from_millis(799)).await;
        assert_eq!(feed.snapshot().displayed, 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        let loaded = feed.wait_for(|s| s.is_ready()).await.unwrap();
        assert_eq!(loaded.displayed, 20);

        feed.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_discards_the_in_flight_batch() {
        let source = flaky(false);
        let feed = FeedBuilder::new(source.clone()).mount();
        let mut snapshots = feed.subscribe();
        feed.wait_for(|s| s.loading).await.unwrap();

        feed.teardown().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(snapshots.borrow_and_update().displayed, 0);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn commands_after_teardown_report_a_stopped_engine() {
        let feed = FeedBuilder::new(catalog()).mount();
        let control = feed.control();
        tokio_test::assert_ok!(control.load_more());
        feed.teardown().await;

        let err = tokio_test::assert_err!(control.load_more());
        assert!(matches!(err, FeedError::EngineStopped));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_keeps_has_more_and_allows_retry() {
        let feed = FeedBuilder::new(flaky(true)).mount();
        feed.wait_for(|s| s.loading).await.unwrap();

        let failed = feed.wait_for(|s| !s.loading).await.unwrap();
        assert_eq!(failed.page, 0);
        assert_eq!(failed.displayed, 0);
        assert!(failed.has_more);

        feed.load_more().unwrap();
        let retried = feed.wait_for(|s| s.is_ready()).await.unwrap();
        assert_eq!(retried.page, 1);
        assert_eq!(retried.items[0].key, ReplicaKey::new(0, 2));

        feed.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn manual_load_more_reaches_exhaustion() {
        let feed = FeedBuilder::new(catalog()).mount();

        for page in 1..=8 {
            feed.wait_for(|s| s.page == page && !s.loading).await.unwrap();
            feed.load_more().unwrap();
        }

        let done = feed.wait_for(|s| !s.has_more).await.unwrap();
        assert_eq!(done.displayed, 150);
        assert_eq!(done.page, 8);
        assert!(!done.loading);

        feed.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_sentinel_reports_are_ignored() {
        let source = flaky(false);
        let feed = FeedBuilder::new(source.clone()).mount();
        feed.wait_for(|s| s.is_ready()).await.unwrap();

        feed.control().sentinel_visible(0.05).unwrap();
        feed.control().sentinel_visible(0.0).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(feed.snapshot().page, 1);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        feed.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn scrolling_the_viewport_drives_loads() {
        let viewport = Arc::new(ScrollViewport::new(ScrollLayout::default()));
        let feed = FeedBuilder::new(catalog())
            .viewport(viewport.clone())
            .mount();

        feed.wait_for(|s| s.is_ready()).await.unwrap();
        // The sentinel now sits below the first batch, out of view.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(feed.snapshot().page, 1);
        assert_eq!(viewport.observer_count(), 1);

        viewport.scroll_to_end();
        let second = feed.wait_for(|s| s.page == 2).await.unwrap();
        assert_eq!(second.displayed, 40);

        feed.teardown().await;
        assert_eq!(viewport.observer_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_feed_stops_observing() {
        let viewport = Arc::new(ScrollViewport::new(ScrollLayout::default()));
        let feed = FeedBuilder::new(catalog())
            .viewport(viewport.clone())
            .mount();

        for page in 1..=8 {
            feed.wait_for(|s| s.page == page && !s.loading).await.unwrap();
            viewport.scroll_to_end();
        }

        let done = feed.wait_for(|s| !s.has_more).await.unwrap();
        assert_eq!(done.displayed, 150);
        assert_eq!(viewport.observer_count(), 0);

        viewport.scroll_to(0.0);
        viewport.scroll_to_end();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(feed.snapshot().displayed, 150);

        feed.teardown().await;
    }
}
