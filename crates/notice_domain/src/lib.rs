pub mod clock;
pub mod date;
pub mod error;
pub mod partition;
pub mod record;
pub mod view;

pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::date::EffectiveDate;
pub use crate::error::{ErrorReport, SyncError, UserMessage};
pub use crate::partition::{Partition, Viewing};
pub use crate::record::{NoticeKind, NoticeRecord, RawDocument, RawNotice};
pub use crate::view::{reduce, NoticeView, SyncPhase, ViewEvent};
