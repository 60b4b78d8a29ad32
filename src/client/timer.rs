// src/client/timer.rs

use chrono::{DateTime, TimeDelta, Utc};

/// Remaining time at or below which the countdown is shown as low.
pub const LOW_TIME_SECS: u64 = 300;
/// Remaining time at or below which the countdown is shown as critical.
pub const CRITICAL_TIME_SECS: u64 = 60;

/// Fixed end of a timed attempt.
///
/// Computed once from the server's `startedAt` and the test duration. The
/// remaining time is always re-derived from the wall clock, never decremented,
/// so a suspended client cannot drift from the true deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    started_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

impl Deadline {
    pub fn new(started_at: DateTime<Utc>, duration_minutes: u32) -> Self {
        Self {
            started_at,
            ends_at: started_at + TimeDelta::minutes(i64::from(duration_minutes)),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    /// `max(0, deadline - now)`.
    pub fn remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        (self.ends_at - now).max(TimeDelta::zero())
    }

    /// Whole seconds left, rounded down.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        self.remaining(now).num_seconds().max(0) as u64
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.ends_at
    }

    /// Share of the allotted time still available, 0.0..=100.0.
    pub fn time_progress_percent(&self, now: DateTime<Utc>) -> f64 {
        let total = (self.ends_at - self.started_at).num_milliseconds();
        if total <= 0 {
            return 0.0;
        }
        let left = self.remaining(now).num_milliseconds().min(total);
        left as f64 / total as f64 * 100.0
    }
}

/// Urgency of the countdown display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWarning {
    Normal,
    Low,
    Critical,
}

impl TimeWarning {
    pub fn from_remaining(secs: u64) -> Self {
        if secs <= CRITICAL_TIME_SECS {
            TimeWarning::Critical
        } else if secs <= LOW_TIME_SECS {
            TimeWarning::Low
        } else {
            TimeWarning::Normal
        }
    }
}

/// Formats seconds as `MM:SS`.
pub fn format_remaining(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
