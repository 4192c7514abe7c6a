use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::date::EffectiveDate;
use crate::record::{NoticeKind, NoticeRecord};

/// Which bucket the consumer is looking at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Viewing {
    #[default]
    Current,
    Past,
}

impl Viewing {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "current" | "upcoming" => Some(Viewing::Current),
            "past" | "previous" => Some(Viewing::Past),
            _ => None,
        }
    }

    pub fn label(self, kind: NoticeKind) -> &'static str {
        match (kind, self) {
            (NoticeKind::Events, Viewing::Current) => "Upcoming Events",
            (NoticeKind::Events, Viewing::Past) => "Previous Events",
            (NoticeKind::Circulars, Viewing::Current) => "Current Circulars",
            (NoticeKind::Circulars, Viewing::Past) => "Past Circulars",
        }
    }

    pub fn empty_message(self, kind: NoticeKind) -> &'static str {
        match (kind, self) {
            (NoticeKind::Events, Viewing::Current) => "No upcoming events.",
            (NoticeKind::Events, Viewing::Past) => "No previous events.",
            (NoticeKind::Circulars, Viewing::Current) => "No current circulars.",
            (NoticeKind::Circulars, Viewing::Past) => "No past circulars.",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Partition {
    pub current: Vec<NoticeRecord>,
    pub past: Vec<NoticeRecord>,
}

impl Partition {
    pub fn bucket(&self, viewing: Viewing) -> &[NoticeRecord] {
        match viewing {
            Viewing::Current => &self.current,
            Viewing::Past => &self.past,
        }
    }

    pub fn len(&self) -> usize {
        self.current.len() + self.past.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.past.is_empty()
    }
}

/// Stable ascending sort by effective date; undated records go last and keep
/// their relative order.
pub fn sort_records(records: &mut [NoticeRecord]) {
    records.sort_by(|a, b| a.effective_date.cmp(&b.effective_date));
}

/// Whether a record with this effective date is still current at `now`.
///
/// A dated record stays current through the whole of its calendar day.
pub fn is_current(effective: EffectiveDate, now: NaiveDateTime) -> bool {
    match effective {
        EffectiveDate::Absent => true,
        EffectiveDate::Dated(date) => date >= now.date(),
    }
}

/// Splits records into current and past, keeping the input order inside each
/// bucket.
pub fn partition(records: &[NoticeRecord], now: NaiveDateTime) -> Partition {
    let (current, past): (Vec<_>, Vec<_>) = records
        .iter()
        .cloned()
        .partition(|record| is_current(record.effective_date, now));
    Partition { current, past }
}
