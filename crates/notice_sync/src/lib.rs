//! Live synchronisation of notice collections.
//!
//! A [`SyncEngine`] owns one subscription to a [`NoticeSource`] at a time and
//! republishes the sorted, partitioned [`NoticeView`](notice_domain::NoticeView)
//! after every snapshot, failure or view change.

pub mod engine;
pub mod file;
pub mod memory;
pub mod source;

pub use crate::engine::{SyncEngine, SyncEngineBuilder, ViewObserver};
pub use crate::file::FileSource;
pub use crate::memory::MemorySource;
pub use crate::source::{NoticeSource, SnapshotSink, SubscriptionHandle};
