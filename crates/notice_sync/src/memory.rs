use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use notice_domain::{RawDocument, SyncError};
use parking_lot::Mutex;

use crate::source::{NoticeSource, SnapshotSink, SubscriptionHandle};

#[derive(Default)]
struct MemoryState {
    collections: HashMap<String, Vec<RawDocument>>,
    subscribers: Vec<(u64, String, SnapshotSink)>,
    rejections: HashMap<String, String>,
    next_id: u64,
}

/// In-process collections driven by the embedder.
///
/// New subscribers receive the collection's latest snapshot straight away,
/// once one has been published.
#[derive(Clone, Default)]
pub struct MemorySource {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `documents` as the collection's contents and pushes them to
    /// every subscriber of that collection.
    ///
    /// Delivery happens under the source lock, so subscribers see publishes
    /// in the order they were stored.
    pub fn publish(&self, collection: &str, documents: Vec<RawDocument>) {
        let mut state = self.state.lock();
        state
            .collections
            .insert(collection.to_string(), documents.clone());
        for sink in Self::sinks_for(&state, collection) {
            sink.deliver(documents.clone());
        }
    }

    /// Pushes a delivery failure to every subscriber of the collection.
    pub fn fail(&self, collection: &str, error: SyncError) {
        let state = self.state.lock();
        for sink in Self::sinks_for(&state, collection) {
            sink.fail(error.clone());
        }
    }

    /// The collection's latest published contents.
    pub fn snapshot(&self, collection: &str) -> Option<Vec<RawDocument>> {
        self.state.lock().collections.get(collection).cloned()
    }

    /// Makes future `subscribe` calls for the collection fail with `reason`,
    /// or accept again with `None`.
    pub fn reject_subscriptions(&self, collection: &str, reason: Option<&str>) {
        let mut state = self.state.lock();
        match reason {
            Some(reason) => {
                state
                    .rejections
                    .insert(collection.to_string(), reason.to_string());
            }
            None => {
                state.rejections.remove(collection);
            }
        }
    }

    pub fn subscriber_count(&self, collection: &str) -> usize {
        self.state
            .lock()
            .subscribers
            .iter()
            .filter(|(_, name, _)| name == collection)
            .count()
    }

    fn sinks_for(state: &MemoryState, collection: &str) -> Vec<SnapshotSink> {
        state
            .subscribers
            .iter()
            .filter(|(_, name, _)| name == collection)
            .map(|(_, _, sink)| sink.clone())
            .collect()
    }
}

impl NoticeSource for MemorySource {
    fn subscribe(&self, collection: &str, sink: SnapshotSink) -> Result<Box<dyn SubscriptionHandle>> {
        let mut state = self.state.lock();
        if let Some(reason) = state.rejections.get(collection) {
            bail!("subscription to `{collection}` rejected: {reason}");
        }
        let id = state.next_id;
        state.next_id += 1;
        state
            .subscribers
            .push((id, collection.to_string(), sink.clone()));
        if let Some(documents) = state.collections.get(collection) {
            sink.deliver(documents.clone());
        }
        Ok(Box::new(MemorySubscription {
            id,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MemorySubscription {
    id: u64,
    state: Arc<Mutex<MemoryState>>,
}

impl SubscriptionHandle for MemorySubscription {
    fn unsubscribe(&mut self) -> Result<()> {
        self.state
            .lock()
            .subscribers
            .retain(|(id, _, _)| *id != self.id);
        Ok(())
    }
}
