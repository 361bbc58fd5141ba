//! End-to-end scrolling over the built-in catalog.
//!
//! Time is paused, so the simulated fetch latency elapses instantly.

use std::sync::Arc;
use std::time::Duration;

use market_feed::catalog::{
    AmplifiedCatalog, BatchSource, CatalogSource, JsonCatalog, KeyedRecord, MarketRecord,
    MockCatalog, ReplicaKey,
};
use market_feed::error::{CatalogError, FetchError};
use market_feed::feed::{FeedBuilder, FeedSettings, GaugeColor, ScrollLayout, ScrollViewport, Variant};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

fn mock_catalog() -> Arc<AmplifiedCatalog> {
    Arc::new(FeedSettings::default().amplify(&MockCatalog).unwrap())
}

#[tokio::test(start_paused = true)]
async fn first_batch_spans_two_replicas() {
    let feed = FeedBuilder::new(mock_catalog()).mount();
    let snapshot = feed.wait_for(|s| s.is_ready()).await.unwrap();

    assert_eq!(snapshot.displayed, 20);
    assert_eq!(snapshot.items.len(), 18);

    let keys: Vec<String> = snapshot.items.iter().map(|i| i.key.to_string()).collect();
    let mut expected: Vec<String> = (2..=15).map(|id| format!("0-{id}")).collect();
    expected.extend((2..=5).map(|id| format!("1-{id}")));
    assert_eq!(keys, expected);

    let variant = |key: ReplicaKey| {
        snapshot
            .items
            .iter()
            .find(|i| i.key == key)
            .map(|i| i.variant)
    };
    assert_eq!(variant(ReplicaKey::new(0, 7)), Some(Variant::Binary));
    assert_eq!(variant(ReplicaKey::new(0, 10)), Some(Variant::Binary));
    assert_eq!(variant(ReplicaKey::new(0, 2)), Some(Variant::Multi));
    assert_eq!(variant(ReplicaKey::new(0, 1)), None);

    feed.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn scrolling_to_the_end_exhausts_the_catalog() {
    let viewport = Arc::new(ScrollViewport::new(ScrollLayout::default()));
    let feed = FeedBuilder::new(mock_catalog())
        .viewport(viewport.clone())
        .mount();
    let mut updates = feed.subscribe();

    // Keep scrolling down whenever the feed settles with more to show.
    loop {
        let snapshot = updates
            .wait_for(|s| !s.loading && (s.is_ready() || !s.has_more))
            .await
            .unwrap()
            .clone();
        if !snapshot.has_more {
            break;
        }
        viewport.scroll_to_end();
        updates.wait_for(|s| s.loading).await.unwrap();
    }

    let done = feed.snapshot();
    assert_eq!(done.page, 8);
    assert_eq!(done.displayed, 150);
    // One record per replica carries no renderable signal.
    assert_eq!(done.items.len(), 140);
    assert!(!done.has_more);

    let mut keys: Vec<ReplicaKey> = done.items.iter().map(|i| i.key).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 140);

    // Nothing more happens once exhausted.
    viewport.scroll_to(0.0);
    viewport.scroll_to_end();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(feed.snapshot().displayed, 150);
    assert_eq!(viewport.observer_count(), 0);

    feed.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn unmount_mid_load_leaves_state_untouched() {
    let feed = FeedBuilder::new(mock_catalog()).mount();
    let mut updates = feed.subscribe();
    feed.wait_for(|s| s.loading).await.unwrap();

    feed.teardown().await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    let last = updates.borrow_and_update().clone();
    assert_eq!(last.displayed, 0);
    assert!(last.loading);
}

#[tokio::test(start_paused = true)]
async fn json_catalog_drives_the_same_feed() {
    let path = std::env::temp_dir().join(format!("market-feed-{}.json", std::process::id()));
    let json = r#"[
        {"id": 1, "title": "Bare", "image": "🏛️", "volume": "$1m"},
        {"id": 2, "title": "Rain tomorrow?", "image": "🌧️", "volume": "$2k",
         "outcomes": [{"name": "Yes", "probability": 64}, {"name": "No", "probability": 36}]},
        {"id": 3, "title": "Launch date", "image": "🚀", "volume": "$9k",
         "timeRanges": [{"period": "Q1", "probability": 20}, {"period": "Q2", "probability": 55}]}
    ]"#;
    std::fs::write(&path, json).unwrap();

    let base = JsonCatalog::new(&path).catalog().unwrap();
    std::fs::remove_file(&path).ok();

    let settings = FeedSettings {
        page_size: 4,
        amplification_factor: 2,
        ..FeedSettings::default()
    };
    let catalog = Arc::new(AmplifiedCatalog::new(base, settings.amplification_factor).unwrap());
    let feed = FeedBuilder::new(catalog).settings(settings).mount();

    let first = feed.wait_for(|s| s.is_ready()).await.unwrap();
    let keys: Vec<String> = first.items.iter().map(|i| i.key.to_string()).collect();
    assert_eq!(keys, vec!["0-2", "0-3"]);
    assert_eq!(first.displayed, 4);
    assert_eq!(first.items[0].variant, Variant::Binary);
    assert_eq!(first.items[1].variant, Variant::Multi);
    assert_eq!(first.items[1].market.outcomes[1].name, "Q2");

    feed.load_more().unwrap();
    let second = feed.wait_for(|s| s.page == 2).await.unwrap();
    assert_eq!(second.displayed, 6);

    feed.load_more().unwrap();
    let done = feed.wait_for(|s| !s.has_more).await.unwrap();
    assert_eq!(done.displayed, 6);

    feed.teardown().await;
}

#[tokio::test]
async fn json_catalog_with_overflowing_chance_is_rejected() {
    let path = std::env::temp_dir().join(format!("market-feed-range-{}.json", std::process::id()));
    let json = r#"[{"id": 1, "title": "Huge", "image": "📈", "volume": "$1", "chance": 6e28}]"#;
    std::fs::write(&path, json).unwrap();

    let result = FeedSettings::default().amplify(&JsonCatalog::new(&path));
    std::fs::remove_file(&path).ok();

    assert!(matches!(
        result,
        Err(CatalogError::OutOfRange { id: 1, field: "chance", .. })
    ));
}

/// Serves one page straight from memory, without catalog validation.
struct Unchecked(Vec<KeyedRecord>);

impl BatchSource for Unchecked {
    fn fetch(&self, page: usize, _page_size: usize) -> Result<Vec<KeyedRecord>, FetchError> {
        Ok(if page == 0 { self.0.clone() } else { Vec::new() })
    }
}

#[tokio::test(start_paused = true)]
async fn huge_chance_from_a_raw_source_still_settles() {
    let record = MarketRecord::new(1, "Huge", "📈", "$1").chance(Decimal::MAX);
    let source = Unchecked(vec![KeyedRecord {
        key: ReplicaKey::new(0, 1),
        record: Arc::new(record),
    }]);
    let feed = FeedBuilder::new(Arc::new(source)).mount();

    let snapshot = feed.wait_for(|s| s.is_ready()).await.unwrap();
    assert!(!snapshot.loading);
    let gauge = snapshot.items[0].gauge.unwrap();
    assert_eq!(gauge.color, GaugeColor::Green);
    assert_eq!(gauge.arc_length, gauge.circumference);

    // The engine is still alive and accepts commands.
    feed.load_more().unwrap();
    let done = feed.wait_for(|s| !s.has_more).await.unwrap();
    assert!(!done.loading);

    feed.teardown().await;
}
