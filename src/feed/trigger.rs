//! Viewport-proximity load trigger.
//!
//! A sentinel sits below the last rendered card. The host viewport reports
//! how much of it is visible; when enough is, the feed asks for the next
//! page. Observations are handed out as [`Subscription`]s that release the
//! viewport registration exactly once.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

/// Called with the sentinel's visible fraction (0.0 - 1.0).
pub type VisibilityCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Registration handle issued by a [`Viewport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObservationId(pub u64);

/// Position of the sentinel: directly after `after` rendered cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sentinel {
    /// Rendered cards above the sentinel.
    pub after: usize,
}

/// Host environment that reports sentinel visibility.
pub trait Viewport: Send + Sync {
    /// Start observing a sentinel. Notifies `callback` when the visible
    /// fraction reaches `threshold`.
    fn observe(&self, sentinel: Sentinel, threshold: f64, callback: VisibilityCallback)
        -> ObservationId;

    /// Stop observing. Unknown ids are ignored.
    fn unobserve(&self, id: ObservationId);
}

/// A live observation. Unobserves on [`Subscription::unsubscribe`] or drop,
/// whichever comes first, and never twice.
pub struct Subscription {
    viewport: Arc<dyn Viewport>,
    id: Option<ObservationId>,
}

impl Subscription {
    /// Observe `sentinel` on `viewport`.
    pub fn observe(
        viewport: Arc<dyn Viewport>,
        sentinel: Sentinel,
        threshold: f64,
        callback: VisibilityCallback,
    ) -> Self {
        let id = viewport.observe(sentinel, threshold, callback);
        Self {
            viewport,
            id: Some(id),
        }
    }

    /// Release the observation now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.viewport.unobserve(id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Keeps one sentinel observation at the tail of the rendered list.
pub struct LoadTrigger {
    viewport: Arc<dyn Viewport>,
    threshold: f64,
    callback: VisibilityCallback,
    subscription: Option<Subscription>,
}

impl LoadTrigger {
    /// Create a disarmed trigger.
    pub fn new(viewport: Arc<dyn Viewport>, threshold: f64, callback: VisibilityCallback) -> Self {
        Self {
            viewport,
            threshold,
            callback,
            subscription: None,
        }
    }

    /// Whether an observation is live.
    pub fn is_armed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Move the sentinel below `rendered_len` cards and observe it afresh.
    pub fn rearm(&mut self, rendered_len: usize) {
        if let Some(previous) = self.subscription.take() {
            previous.unsubscribe();
        }
        trace!(rendered_len, "Re-arming load trigger");
        self.subscription = Some(Subscription::observe(
            Arc::clone(&self.viewport),
            Sentinel {
                after: rendered_len,
            },
            self.threshold,
            Arc::clone(&self.callback),
        ));
    }

    /// Stop observing.
    pub fn disarm(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            debug!("Load trigger disarmed");
            subscription.unsubscribe();
        }
    }

    /// Whether a reported fraction counts as "sentinel visible".
    pub fn is_visible(&self, ratio: f64) -> bool {
        ratio > 0.0 && ratio >= self.threshold
    }
}

impl fmt::Debug for LoadTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadTrigger")
            .field("threshold", &self.threshold)
            .field("subscription", &self.subscription)
            .finish()
    }
}

/// Grid geometry for [`ScrollViewport`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollLayout {
    /// Cards per row.
    pub columns: usize,
    /// Row height in pixels.
    pub row_height: f64,
    /// Visible height in pixels.
    pub viewport_height: f64,
    /// Sentinel height in pixels.
    pub sentinel_height: f64,
}

impl Default for ScrollLayout {
    fn default() -> Self {
        Self {
            columns: 4,
            row_height: 220.0,
            viewport_height: 900.0,
            sentinel_height: 16.0,
        }
    }
}

impl ScrollLayout {
    /// Top edge of a sentinel.
    pub fn sentinel_top(&self, sentinel: Sentinel) -> f64 {
        let rows = sentinel.after.div_ceil(self.columns.max(1));
        rows as f64 * self.row_height
    }

    /// Visible fraction of a sentinel at a scroll offset.
    pub fn visible_fraction(&self, sentinel: Sentinel, offset: f64) -> f64 {
        let top = self.sentinel_top(sentinel);
        let bottom = top + self.sentinel_height;
        let overlap = (bottom.min(offset + self.viewport_height) - top.max(offset)).max(0.0);
        (overlap / self.sentinel_height).clamp(0.0, 1.0)
    }
}

struct Observer {
    sentinel: Sentinel,
    threshold: f64,
    callback: VisibilityCallback,
    visible: bool,
}

impl Observer {
    fn crosses(&self, ratio: f64) -> bool {
        ratio > 0.0 && ratio >= self.threshold
    }
}

#[derive(Default)]
struct ScrollState {
    offset: f64,
    tail: Sentinel,
    observers: HashMap<ObservationId, Observer>,
    next_id: u64,
}

/// In-process scrollable grid.
///
/// Notifies an observer when it starts observing an already visible
/// sentinel and on every hidden-to-visible crossing afterwards.
pub struct ScrollViewport {
    layout: ScrollLayout,
    state: Mutex<ScrollState>,
}

impl ScrollViewport {
    /// Create a viewport scrolled to the top.
    pub fn new(layout: ScrollLayout) -> Self {
        Self {
            layout,
            state: Mutex::new(ScrollState::default()),
        }
    }

    /// Grid geometry.
    pub fn layout(&self) -> ScrollLayout {
        self.layout
    }

    fn state(&self) -> MutexGuard<'_, ScrollState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current scroll offset.
    pub fn offset(&self) -> f64 {
        self.state().offset
    }

    /// Largest reachable offset for the current tail.
    pub fn max_offset(&self) -> f64 {
        let tail = self.state().tail;
        let content = self.layout.sentinel_top(tail) + self.layout.sentinel_height;
        (content - self.layout.viewport_height).max(0.0)
    }

    /// Number of live observations.
    pub fn observer_count(&self) -> usize {
        self.state().observers.len()
    }

    /// Scroll to an absolute offset, clamped to the content.
    pub fn scroll_to(&self, offset: f64) {
        let max = self.max_offset();
        let mut notify = Vec::new();
        {
            let mut state = self.state();
            state.offset = offset.clamp(0.0, max);
            let offset = state.offset;
            for observer in state.observers.values_mut() {
                let ratio = self.layout.visible_fraction(observer.sentinel, offset);
                let visible = observer.crosses(ratio);
                if visible && !observer.visible {
                    notify.push((Arc::clone(&observer.callback), ratio));
                }
                observer.visible = visible;
            }
        }
        for (callback, ratio) in notify {
            callback(ratio);
        }
    }

    /// Scroll relative to the current offset.
    pub fn scroll_by(&self, delta: f64) {
        let offset = self.offset();
        self.scroll_to(offset + delta);
    }

    /// Scroll to the bottom of the content.
    pub fn scroll_to_end(&self) {
        self.scroll_to(self.max_offset());
    }
}

impl Viewport for ScrollViewport {
    fn observe(
        &self,
        sentinel: Sentinel,
        threshold: f64,
        callback: VisibilityCallback,
    ) -> ObservationId {
        let (id, initial) = {
            let mut state = self.state();
            let id = ObservationId(state.next_id);
            state.next_id += 1;
            state.tail = sentinel;

            let ratio = self.layout.visible_fraction(sentinel, state.offset);
            let observer = Observer {
                sentinel,
                threshold,
                callback: Arc::clone(&callback),
                visible: false,
            };
            let visible = observer.crosses(ratio);
            state.observers.insert(
                id,
                Observer {
                    visible,
                    ..observer
                },
            );
            (id, visible.then_some(ratio))
        };

        if let Some(ratio) = initial {
            callback(ratio);
        }
        id
    }

    fn unobserve(&self, id: ObservationId) {
        self.state().observers.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records how often the viewport was asked to observe and unobserve.
    #[derive(Default)]
    struct CountingViewport {
        observed: AtomicUsize,
        unobserved: Mutex<Vec<ObservationId>>,
    }

    impl Viewport for CountingViewport {
        fn observe(&self, _: Sentinel, _: f64, _: VisibilityCallback) -> ObservationId {
            ObservationId(self.observed.fetch_add(1, Ordering::SeqCst) as u64)
        }

        fn unobserve(&self, id: ObservationId) {
            self.unobserved.lock().unwrap().push(id);
        }
    }

    fn counter() -> (VisibilityCallback, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&hits);
        let callback: VisibilityCallback = Arc::new(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        (callback, hits)
    }

    #[test]
    fn subscription_unobserves_exactly_once() {
        let viewport = Arc::new(CountingViewport::default());
        let (callback, _) = counter();

        let subscription = Subscription::observe(
            viewport.clone(),
            Sentinel { after: 0 },
            0.1,
            callback,
        );
        subscription.unsubscribe();

        assert_eq!(*viewport.unobserved.lock().unwrap(), vec![ObservationId(0)]);
    }

    #[test]
    fn dropping_a_subscription_unobserves() {
        let viewport = Arc::new(CountingViewport::default());
        let (callback, _) = counter();
        {
            let _subscription =
                Subscription::observe(viewport.clone(), Sentinel { after: 3 }, 0.1, callback);
        }
        assert_eq!(viewport.unobserved.lock().unwrap().len(), 1);
    }

    #[test]
    fn rearm_replaces_the_previous_observation() {
        let viewport = Arc::new(CountingViewport::default());
        let (callback, _) = counter();
        let mut trigger = LoadTrigger::new(viewport.clone(), 0.1, callback);

        trigger.rearm(0);
        trigger.rearm(18);
        trigger.rearm(36);
        assert!(trigger.is_armed());
        assert_eq!(viewport.observed.load(Ordering::SeqCst), 3);
        assert_eq!(
            *viewport.unobserved.lock().unwrap(),
            vec![ObservationId(0), ObservationId(1)]
        );

        trigger.disarm();
        trigger.disarm();
        assert!(!trigger.is_armed());
        assert_eq!(viewport.unobserved.lock().unwrap().len(), 3);
    }

    #[test]
    fn any_partial_visibility_above_threshold_counts() {
        let viewport = Arc::new(CountingViewport::default());
        let (callback, _) = counter();
        let trigger = LoadTrigger::new(viewport, 0.1, callback);

        assert!(!trigger.is_visible(0.0));
        assert!(!trigger.is_visible(0.05));
        assert!(trigger.is_visible(0.1));
        assert!(trigger.is_visible(1.0));
    }

    #[test]
    fn layout_places_sentinel_under_last_row() {
        let layout = ScrollLayout::default();
        assert_eq!(layout.sentinel_top(Sentinel { after: 0 }), 0.0);
        assert_eq!(layout.sentinel_top(Sentinel { after: 18 }), 5.0 * 220.0);
        assert_eq!(layout.sentinel_top(Sentinel { after: 20 }), 5.0 * 220.0);

        assert_eq!(layout.visible_fraction(Sentinel { after: 0 }, 0.0), 1.0);
        assert_eq!(layout.visible_fraction(Sentinel { after: 20 }, 0.0), 0.0);
        assert_eq!(layout.visible_fraction(Sentinel { after: 20 }, 216.0), 1.0);
    }

    #[test]
    fn scroll_viewport_notifies_on_crossing_only() {
        let viewport = ScrollViewport::new(ScrollLayout::default());
        let (callback, hits) = counter();

        let id = viewport.observe(Sentinel { after: 20 }, 0.1, callback);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        viewport.scroll_by(100.0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        viewport.scroll_to_end();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Still visible: no new crossing.
        viewport.scroll_to_end();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        viewport.scroll_to(0.0);
        viewport.scroll_to_end();
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        viewport.unobserve(id);
        assert_eq!(viewport.observer_count(), 0);
    }

    #[test]
    fn observing_a_visible_sentinel_notifies_immediately() {
        let viewport = ScrollViewport::new(ScrollLayout::default());
        let (callback, hits) = counter();

        viewport.observe(Sentinel { after: 0 }, 0.1, callback);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
