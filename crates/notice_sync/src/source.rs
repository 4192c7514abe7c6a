use std::sync::Arc;

use anyhow::Result;
use notice_domain::{record, RawDocument, SyncError, ViewEvent};

use crate::engine::EngineInner;

/// A live remote collection that pushes full snapshots.
///
/// `subscribe` registers the sink and returns without blocking; snapshots and
/// failures arrive later through the sink, possibly on another thread.
pub trait NoticeSource: Send + Sync {
    fn subscribe(&self, collection: &str, sink: SnapshotSink) -> Result<Box<dyn SubscriptionHandle>>;
}

/// Source-side resources of one subscription.
pub trait SubscriptionHandle: Send {
    /// Stops deliveries. May be called more than once.
    fn unsubscribe(&mut self) -> Result<()>;
}

/// Delivery endpoint handed to a source for one subscription.
///
/// Deliveries from a subscription the engine has since replaced or torn down
/// are dropped.
#[derive(Clone)]
pub struct SnapshotSink {
    generation: u64,
    engine: Arc<EngineInner>,
}

impl SnapshotSink {
    pub(crate) fn new(generation: u64, engine: Arc<EngineInner>) -> Self {
        Self { generation, engine }
    }

    /// Replaces the whole record set. Returns `false` if the sink is stale.
    pub fn deliver(&self, documents: Vec<RawDocument>) -> bool {
        let records = record::map_documents(documents);
        self.engine
            .apply(Some(self.generation), ViewEvent::SnapshotReceived(records))
    }

    /// Reports a delivery failure. Returns `false` if the sink is stale.
    pub fn fail(&self, error: SyncError) -> bool {
        self.engine
            .apply(Some(self.generation), ViewEvent::DeliveryFailed(error))
    }

    pub fn is_live(&self) -> bool {
        self.engine.generation() == self.generation
    }
}

/// Owns a source handle and releases it exactly once, on `release` or drop.
pub(crate) struct Subscription {
    generation: u64,
    handle: Option<Box<dyn SubscriptionHandle>>,
}

impl Subscription {
    pub(crate) fn new(generation: u64, handle: Box<dyn SubscriptionHandle>) -> Self {
        Self {
            generation,
            handle: Some(handle),
        }
    }

    pub(crate) fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(err) = handle.unsubscribe() {
                let err = SyncError::Teardown(format!("{err:#}"));
                tracing::warn!(generation = self.generation, %err, "subscription teardown failed");
            } else {
                tracing::debug!(generation = self.generation, "subscription released");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
