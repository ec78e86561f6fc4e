//! Single-shot timers owned by the scheduler task.
//!
//! A [`Timer`] holds no runtime resources. It only records whether it is armed
//! and for when; the scheduler turns that deadline into a future with
//! [`expire`] on every loop iteration. Re-arming is therefore just replacing
//! the deadline, and a disarmed timer can never fire late.

use std::time::Duration;

use tokio::time::{self, Instant};

/// Stand-in deadline for durations too long to represent.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Whether a timer is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Not scheduled to fire.
    Disarmed,
    /// Scheduled to fire at `deadline`.
    Armed {
        /// When the timer fires.
        deadline: Instant,
    },
}

/// A single-shot timer with a fixed duration.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    duration: Duration,
    state: TimerState,
}

impl Timer {
    /// Creates a disarmed timer.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self {
            duration,
            state: TimerState::Disarmed,
        }
    }

    /// Arms the timer to fire one duration after `now`, replacing any
    /// pending deadline.
    ///
    /// A duration that overflows the clock arms the timer for the far future.
    pub fn arm(&mut self, now: Instant) {
        let deadline = now
            .checked_add(self.duration)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        self.state = TimerState::Armed { deadline };
    }

    /// Disarms the timer.
    pub fn disarm(&mut self) {
        self.state = TimerState::Disarmed;
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> TimerState {
        self.state
    }

    /// Returns the deadline if armed.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        match self.state {
            TimerState::Armed { deadline } => Some(deadline),
            TimerState::Disarmed => None,
        }
    }

    /// Returns `true` if armed.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        matches!(self.state, TimerState::Armed { .. })
    }

    /// Returns the configured duration.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }
}

/// Completes at `deadline`, or never when there is none.
pub async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
