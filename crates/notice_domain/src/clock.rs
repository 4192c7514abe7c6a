use chrono::{Duration, Local, NaiveDateTime};
use parking_lot::RwLock;

/// Source of the evaluation instant used for partitioning.
///
/// Read on every evaluation; never cached between events.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    instant: RwLock<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(instant: NaiveDateTime) -> Self {
        Self {
            instant: RwLock::new(instant),
        }
    }

    pub fn set(&self, instant: NaiveDateTime) {
        *self.instant.write() = instant;
    }

    /// Moves the clock forward by `by`. Past the representable range the
    /// clock stays where it was.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.instant.write();
        if let Some(next) = guard.checked_add_signed(by) {
            *guard = next;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.instant.read()
    }
}
