//! Deadline timers driven by tick events.
//!
//! A timer is a plain value holding its start and duration; it is checked
//! against the timestamp of each tick. Dropping the value cancels it, so a
//! timer cannot outlive the phase that owns it.

pub const DEFAULT_COUNTDOWN_SECS: u64 = 3;
pub const DEFAULT_PRACTICE_SECS: u64 = 240;
pub const PRACTICE_WARNING_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    started_at: i64,
    duration_ms: i64,
}

impl Deadline {
    pub fn start(duration_secs: u64, at: i64) -> Self {
        Self {
            started_at: at,
            duration_ms: i64::try_from(duration_secs)
                .unwrap_or(i64::MAX)
                .saturating_mul(1000),
        }
    }

    pub fn remaining_ms(&self, now: i64) -> i64 {
        self.started_at
            .saturating_add(self.duration_ms)
            .saturating_sub(now)
            .max(0)
    }

    /// Whole seconds left, rounded up, as a countdown display shows them.
    pub fn remaining_secs(&self, now: i64) -> u64 {
        u64::try_from(self.remaining_ms(now))
            .unwrap_or(0)
            .div_ceil(1000)
    }

    pub fn is_due(&self, now: i64) -> bool {
        self.remaining_ms(now) == 0
    }
}

/// Pre-sentence countdown (3, 2, 1) before input is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown(Deadline);

impl Countdown {
    pub fn start(secs: u64, at: i64) -> Self {
        Self(Deadline::start(secs, at))
    }

    pub fn remaining_secs(&self, now: i64) -> u64 {
        self.0.remaining_secs(now)
    }

    pub fn is_done(&self, now: i64) -> bool {
        self.0.is_due(now)
    }
}

/// Bounded practice period before measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PracticeTimer(Deadline);

impl PracticeTimer {
    pub fn start(secs: u64, at: i64) -> Self {
        Self(Deadline::start(secs, at))
    }

    pub fn remaining_secs(&self, now: i64) -> u64 {
        self.0.remaining_secs(now)
    }

    pub fn is_warning(&self, now: i64) -> bool {
        self.remaining_secs(now) <= PRACTICE_WARNING_SECS
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.0.is_due(now)
    }
}

/// `mm:ss`
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
