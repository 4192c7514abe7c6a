use std::sync::Arc;

use notice_domain::{
    reduce, Clock, NoticeKind, NoticeView, SyncError, SyncPhase, SystemClock, ViewEvent, Viewing,
};
use parking_lot::Mutex;
use tracing::instrument;

use crate::source::{NoticeSource, SnapshotSink, Subscription};

/// Receives every published view, in publication order.
///
/// Called while the engine's state lock is held: implementations must not
/// call back into the engine.
pub trait ViewObserver: Send + Sync {
    fn on_view(&self, view: &NoticeView);
}

impl<F> ViewObserver for F
where
    F: Fn(&NoticeView) + Send + Sync,
{
    fn on_view(&self, view: &NoticeView) {
        self(view)
    }
}

struct EngineState {
    view: NoticeView,
    generation: u64,
}

/// State shared between the engine and the sinks it hands out.
pub(crate) struct EngineInner {
    state: Mutex<EngineState>,
    clock: Arc<dyn Clock>,
    observers: Vec<Box<dyn ViewObserver>>,
}

impl EngineInner {
    pub(crate) fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Runs one event to completion. With `Some(generation)`, the event is
    /// dropped unless that generation is still the active one.
    pub(crate) fn apply(&self, generation: Option<u64>, event: ViewEvent) -> bool {
        let mut state = self.state.lock();
        if let Some(generation) = generation {
            if generation != state.generation {
                tracing::debug!(
                    stale = generation,
                    active = state.generation,
                    "dropping delivery from superseded subscription"
                );
                return false;
            }
        }
        self.publish(&mut state, event);
        true
    }

    fn begin(&self, refresh: bool) -> u64 {
        let mut state = self.state.lock();
        state.generation += 1;
        self.publish(&mut state, ViewEvent::SubscribeStarted { refresh });
        state.generation
    }

    fn end(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        if matches!(state.view.phase, SyncPhase::Idle | SyncPhase::Unsubscribed) {
            return;
        }
        self.publish(&mut state, ViewEvent::Unsubscribed);
    }

    fn publish(&self, state: &mut EngineState, event: ViewEvent) {
        let now = self.clock.now();
        let previous = std::mem::take(&mut state.view);
        state.view = reduce(previous, event, now);
        for observer in &self.observers {
            observer.on_view(&state.view);
        }
    }
}

pub struct SyncEngineBuilder {
    source: Arc<dyn NoticeSource>,
    kind: NoticeKind,
    viewing: Viewing,
    clock: Arc<dyn Clock>,
    observers: Vec<Box<dyn ViewObserver>>,
}

impl SyncEngineBuilder {
    pub fn new(source: Arc<dyn NoticeSource>) -> Self {
        Self {
            source,
            kind: NoticeKind::default(),
            viewing: Viewing::default(),
            clock: Arc::new(SystemClock),
            observers: Vec::new(),
        }
    }

    pub fn kind(mut self, kind: NoticeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn viewing(mut self, viewing: Viewing) -> Self {
        self.viewing = viewing;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn observer(mut self, observer: impl ViewObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn build(self) -> SyncEngine {
        SyncEngine {
            source: self.source,
            kind: self.kind,
            inner: Arc::new(EngineInner {
                state: Mutex::new(EngineState {
                    view: NoticeView::new(self.kind, self.viewing),
                    generation: 0,
                }),
                clock: self.clock,
                observers: self.observers,
            }),
            active: Mutex::new(None),
        }
    }
}

/// Keeps one live subscription to a notice collection and publishes the
/// partitioned view after every snapshot, failure and selection change.
pub struct SyncEngine {
    source: Arc<dyn NoticeSource>,
    kind: NoticeKind,
    inner: Arc<EngineInner>,
    active: Mutex<Option<Subscription>>,
}

impl SyncEngine {
    pub fn builder(source: Arc<dyn NoticeSource>) -> SyncEngineBuilder {
        SyncEngineBuilder::new(source)
    }

    pub fn kind(&self) -> NoticeKind {
        self.kind
    }

    /// Opens a subscription, replacing any existing one.
    #[instrument(skip(self), fields(collection = self.kind.collection()))]
    pub fn subscribe(&self) {
        self.open(false);
    }

    /// User-triggered re-subscription; sets `refreshing` until the next
    /// snapshot or failure.
    #[instrument(skip(self), fields(collection = self.kind.collection()))]
    pub fn refresh(&self) {
        self.open(true);
    }

    #[instrument(skip(self))]
    pub fn select(&self, viewing: Viewing) {
        self.inner.apply(None, ViewEvent::Select(viewing));
    }

    /// Re-partitions the latest snapshot against the current time.
    pub fn reevaluate(&self) {
        self.inner.apply(None, ViewEvent::Reevaluate);
    }

    /// Tears down the active subscription. Safe to call repeatedly; no
    /// delivery is applied after it returns.
    #[instrument(skip(self), fields(collection = self.kind.collection()))]
    pub fn unsubscribe(&self) {
        let mut active = self.active.lock();
        self.inner.end();
        if let Some(mut subscription) = active.take() {
            subscription.release();
        }
    }

    pub fn view(&self) -> NoticeView {
        self.inner.state.lock().view.clone()
    }

    pub fn phase(&self) -> SyncPhase {
        self.inner.state.lock().view.phase
    }

    fn open(&self, refresh: bool) {
        let mut active = self.active.lock();
        let generation = self.inner.begin(refresh);
        if let Some(mut previous) = active.take() {
            previous.release();
        }

        let sink = SnapshotSink::new(generation, Arc::clone(&self.inner));
        match self.source.subscribe(self.kind.collection(), sink) {
            Ok(handle) => {
                tracing::info!(generation, "subscribed");
                *active = Some(Subscription::new(generation, handle));
            }
            Err(err) => {
                let err = SyncError::Connectivity(format!("{err:#}"));
                self.inner
                    .apply(Some(generation), ViewEvent::DeliveryFailed(err));
            }
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
