use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{self, ErrorReport, SyncError};
use crate::partition::{self, Partition, Viewing};
use crate::record::{NoticeKind, NoticeRecord};

/// Lifecycle of the remote subscription.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    Subscribing,
    Streaming,
    Error,
    Unsubscribed,
}

/// Everything that can change the published view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    SubscribeStarted { refresh: bool },
    SnapshotReceived(Vec<NoticeRecord>),
    DeliveryFailed(SyncError),
    Select(Viewing),
    Reevaluate,
    Unsubscribed,
}

/// The state handed to consumers after every event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoticeView {
    pub kind: NoticeKind,
    pub phase: SyncPhase,
    pub loading: bool,
    pub refreshing: bool,
    pub error: Option<ErrorReport>,
    pub viewing: Viewing,
    /// Latest snapshot in canonical order.
    pub records: Vec<NoticeRecord>,
    pub partition: Partition,
    pub evaluated_at: Option<NaiveDateTime>,
}

impl NoticeView {
    pub fn new(kind: NoticeKind, viewing: Viewing) -> Self {
        Self {
            kind,
            viewing,
            ..Self::default()
        }
    }

    pub fn current(&self) -> &[NoticeRecord] {
        &self.partition.current
    }

    pub fn past(&self) -> &[NoticeRecord] {
        &self.partition.past
    }

    /// The bucket selected by `viewing`.
    pub fn visible(&self) -> &[NoticeRecord] {
        self.partition.bucket(self.viewing)
    }

    pub fn find(&self, id: &str) -> Option<&NoticeRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn error_text(&self) -> Option<&str> {
        self.error.as_ref().map(|report| report.text.as_str())
    }

    /// Placeholder text when there is nothing to show, if any.
    pub fn empty_message(&self) -> Option<&'static str> {
        if self.loading {
            return None;
        }
        if self.records.is_empty() {
            return Some(self.kind.empty_collection_message());
        }
        if self.visible().is_empty() {
            return Some(self.viewing.empty_message(self.kind));
        }
        None
    }
}

/// Applies one event. Every partition is computed against `now`, which the
/// caller reads fresh for each event.
pub fn reduce(mut state: NoticeView, event: ViewEvent, now: NaiveDateTime) -> NoticeView {
    match event {
        ViewEvent::SubscribeStarted { refresh } => {
            state.phase = SyncPhase::Subscribing;
            state.loading = true;
            state.refreshing = refresh;
        }
        ViewEvent::SnapshotReceived(mut records) => {
            partition::sort_records(&mut records);
            state.records = records;
            repartition(&mut state, now);
            state.phase = SyncPhase::Streaming;
            state.loading = false;
            state.refreshing = false;
            state.error = None;
            tracing::debug!(
                total = state.records.len(),
                current = state.partition.current.len(),
                past = state.partition.past.len(),
                "applied snapshot"
            );
        }
        ViewEvent::DeliveryFailed(err) => match error::report(&err, state.kind) {
            Some(report) => {
                tracing::warn!(%err, "notice delivery failed");
                state.phase = SyncPhase::Error;
                state.loading = false;
                state.refreshing = false;
                state.error = Some(report);
            }
            None => tracing::warn!(%err, "ignoring non-reportable failure"),
        },
        ViewEvent::Select(viewing) => {
            state.viewing = viewing;
            repartition(&mut state, now);
        }
        ViewEvent::Reevaluate => repartition(&mut state, now),
        ViewEvent::Unsubscribed => {
            state.phase = SyncPhase::Unsubscribed;
            state.loading = false;
            state.refreshing = false;
        }
    }
    state
}

fn repartition(state: &mut NoticeView, now: NaiveDateTime) {
    state.partition = partition::partition(&state.records, now);
    state.evaluated_at = Some(now);
}
