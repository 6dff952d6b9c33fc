//! Wall-clock source for session timestamps.
//!
//! Only the start and completion timestamps come from here. The countdown
//! itself is driven by ticks, see [`crate::session::SessionController::tick`].

use chrono::{DateTime, Duration, Utc};

/// A clock that is either real time or pinned for deterministic tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// A clock pinned at `at`.
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// A clock pinned at the given Unix timestamp in milliseconds.
    ///
    /// Out-of-range values fall back to the Unix epoch.
    pub fn fixed_millis(epoch_millis: i64) -> Self {
        Self::Fixed(DateTime::from_timestamp_millis(epoch_millis).unwrap_or_default())
    }

    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Current time as Unix epoch milliseconds.
    pub fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// Move a fixed clock forward. No effect on the system clock.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}
