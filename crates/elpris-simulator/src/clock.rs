//! Danish wall clock with an adjustable offset.

use chrono::{Duration, Utc};
use chrono_tz::Europe::Copenhagen;

use elpris_core::time::{Clock, Timestamp};

/// Local time in Copenhagen, optionally pinned to a fixed start.
///
/// The offset lets the simulator step through the day to watch the window
/// roll over and tomorrow's prices appear.
#[derive(Debug, Clone)]
pub struct SimClock {
    start: Option<Timestamp>,
    offset: Duration,
}

impl SimClock {
    /// Follow the system clock.
    pub fn system() -> Self {
        Self {
            start: None,
            offset: Duration::zero(),
        }
    }

    /// Start from a fixed local time.
    pub fn pinned(start: Timestamp) -> Self {
        Self {
            start: Some(start),
            offset: Duration::zero(),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&mut self, by: Duration) {
        self.offset += by;
    }
}

impl Clock for SimClock {
    fn now(&self) -> Timestamp {
        let base = self
            .start
            .unwrap_or_else(|| Utc::now().with_timezone(&Copenhagen).naive_local());
        base + self.offset
    }
}
