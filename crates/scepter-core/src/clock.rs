//! World-clock day tracking and anomaly detection.
//!
//! The external world clock is the single source of temporal truth, and it
//! is *not* monotonic: console commands can rewind it, sleep-skips can jump
//! it forward, and it stalls when nobody is present. Everything here is
//! therefore derived from the absolute tick value supplied at call time —
//! never from wall-clock time.
//!
//! Two small state machines live here:
//!
//! - [`DayTracker`] decides when a scheduled rotation is due, counting
//!   whole simulated days between cycles.
//! - [`JumpDetector`] notices when the clock moved by more than a day
//!   between two consecutive polls, so the scheduler can re-evaluate
//!   expiry and trigger conditions immediately instead of waiting for its
//!   next coarse bookkeeping pass.

use tracing::info;

/// Errors that can occur during clock tracking operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Invalid clock configuration (e.g. zero ticks per day).
    #[error("invalid clock configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// Tracks simulated days and decides when a scheduled rotation is due.
///
/// The first observation only initializes the tracker — it never fires a
/// rotation, so a fresh process joining an old world does not immediately
/// reshuffle the privilege.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayTracker {
    /// Number of world-clock ticks in one simulated day.
    ticks_per_day: u64,

    /// Simulated days between scheduled rotations.
    days_between_cycles: u64,

    /// The day the last cycle was triggered on, `None` until the first
    /// observation.
    last_cycle_day: Option<u64>,
}

impl DayTracker {
    /// Create a new day tracker.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `ticks_per_day` or
    /// `days_between_cycles` is zero.
    pub fn new(ticks_per_day: u64, days_between_cycles: u64) -> Result<Self, ClockError> {
        if ticks_per_day == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "ticks_per_day must be at least 1".to_owned(),
            });
        }
        if days_between_cycles == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "days_between_cycles must be at least 1".to_owned(),
            });
        }
        Ok(Self {
            ticks_per_day,
            days_between_cycles,
            last_cycle_day: None,
        })
    }

    /// Compute the current simulated day index from an absolute tick value.
    pub fn current_day(&self, now_ticks: u64) -> u64 {
        // Division is safe: ticks_per_day >= 1 is guaranteed by the
        // constructor.
        now_ticks.checked_div(self.ticks_per_day).unwrap_or(0)
    }

    /// Check whether a scheduled rotation should fire, advancing the
    /// tracker when it does.
    ///
    /// The first call initializes `last_cycle_day` and returns `false`.
    /// Subsequent calls return `true` once `days_between_cycles` whole
    /// days have passed since the last trigger, and record the current
    /// day as the new baseline.
    pub fn should_trigger_rotation(&mut self, now_ticks: u64) -> bool {
        let current_day = self.current_day(now_ticks);

        let Some(last) = self.last_cycle_day else {
            self.last_cycle_day = Some(current_day);
            info!(day = current_day, "Cycle tracker initialized");
            return false;
        };

        if current_day >= last.saturating_add(self.days_between_cycles) {
            info!(
                last_cycle_day = last,
                current_day, "Scheduled rotation due"
            );
            self.last_cycle_day = Some(current_day);
            return true;
        }

        false
    }

    /// Days remaining until the next scheduled rotation would fire.
    ///
    /// Returns the full interval if the tracker has not been initialized
    /// yet. A backwards clock jump can make this exceed the interval; the
    /// value is reported as-is.
    pub fn days_until_next_cycle(&self, now_ticks: u64) -> u64 {
        let Some(last) = self.last_cycle_day else {
            return self.days_between_cycles;
        };
        let elapsed = self.current_day(now_ticks).saturating_sub(last);
        self.days_between_cycles.saturating_sub(elapsed)
    }

    /// The day the last cycle was triggered on, if any.
    pub const fn last_cycle_day(&self) -> Option<u64> {
        self.last_cycle_day
    }

    /// The configured number of ticks per simulated day.
    pub const fn ticks_per_day(&self) -> u64 {
        self.ticks_per_day
    }
}

/// Detects anomalous movement of the absolute world clock between polls.
///
/// A movement of more than one day's worth of ticks in either direction
/// between two consecutive observations counts as a jump. The first
/// observation only records a baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JumpDetector {
    /// Jump threshold: one simulated day's worth of ticks.
    ticks_per_day: u64,

    /// The tick value seen on the previous poll.
    last_observed: Option<u64>,
}

impl JumpDetector {
    /// Create a detector with a one-day jump threshold.
    pub const fn new(ticks_per_day: u64) -> Self {
        Self {
            ticks_per_day,
            last_observed: None,
        }
    }

    /// Record an observation and report whether the clock jumped.
    ///
    /// Returns `true` when the absolute distance from the previous
    /// observation exceeds one day of ticks. The baseline always advances
    /// to `now_ticks`, so a single jump is reported exactly once.
    pub fn observe(&mut self, now_ticks: u64) -> bool {
        let jumped = self
            .last_observed
            .is_some_and(|last| now_ticks.abs_diff(last) > self.ticks_per_day);
        self.last_observed = Some(now_ticks);
        jumped
    }
}
