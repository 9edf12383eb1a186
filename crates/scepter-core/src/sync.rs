//! Remaining-time quantization and observer sync cadence.
//!
//! Observers never see raw ticks. The server quantizes
//! `cycle_end_time − now` into the [`RemainingTime`] wire record on every
//! push, so the value is always derived fresh and never stored.
//!
//! # Quantization rule
//!
//! - `days` is the floor of `ticks_remaining / ticks_per_day`, rounded up
//!   by one whenever the remainder exceeds the configured negligible
//!   threshold. With the default threshold of 0, any nonzero remainder
//!   counts as one more day: half a day reads as 1 day, a day and one
//!   tick reads as 2 days.
//! - Exactly 1 day is displayed as 24 hours, never "0 hours".
//! - Below a day, hours are the ceiling of the remaining hour fraction;
//!   below an hour, minutes likewise. Both clamp to at least 1 while any
//!   time remains.
//!
//! The threshold boundary is deliberately preserved from the source
//! behavior rather than smoothed over; `tests` pin both sides of it.

use scepter_types::RemainingTime;

/// Hours in one simulated day.
const HOURS_PER_DAY: u64 = 24;

/// Minutes in one simulated day.
const MINUTES_PER_DAY: u64 = 1_440;

/// Quantize raw remaining ticks into the observer-facing record.
///
/// `ticks_per_day` must be nonzero (guaranteed by config validation at
/// scheduler construction); a zero value degrades to the inactive-style
/// all-zero record rather than dividing by zero.
pub fn quantize_remaining(
    ticks_remaining: u64,
    ticks_per_day: u64,
    negligible_remainder_ticks: u64,
) -> RemainingTime {
    if ticks_per_day == 0 || ticks_remaining == 0 {
        return RemainingTime {
            days: 0,
            hours: 0,
            minutes: 0,
            active: true,
        };
    }

    let floor_days = ticks_remaining.checked_div(ticks_per_day).unwrap_or(0);
    let remainder = ticks_remaining.checked_rem(ticks_per_day).unwrap_or(0);

    let days = if remainder > negligible_remainder_ticks {
        floor_days.saturating_add(1)
    } else {
        floor_days
    };

    match days {
        0 => sub_day_remaining(ticks_remaining, ticks_per_day),
        1 => RemainingTime {
            days: 1,
            hours: 24,
            minutes: 0,
            active: true,
        },
        more => RemainingTime {
            days: clamp_u32(more),
            hours: 0,
            minutes: 0,
            active: true,
        },
    }
}

/// Quantize a sub-day remainder into hours, or minutes once less than an
/// hour is left.
fn sub_day_remaining(ticks_remaining: u64, ticks_per_day: u64) -> RemainingTime {
    let ticks_per_hour = ticks_per_day.checked_div(HOURS_PER_DAY).unwrap_or(0);

    if ticks_remaining >= ticks_per_hour && ticks_per_hour > 0 {
        let hours = ceil_div(
            ticks_remaining.saturating_mul(HOURS_PER_DAY),
            ticks_per_day,
        )
        .max(1);
        RemainingTime {
            days: 0,
            hours: clamp_u32(hours),
            minutes: 0,
            active: true,
        }
    } else {
        let minutes = ceil_div(
            ticks_remaining.saturating_mul(MINUTES_PER_DAY),
            ticks_per_day,
        )
        .max(1);
        RemainingTime {
            days: 0,
            hours: 0,
            minutes: clamp_u32(minutes),
            active: true,
        }
    }
}

/// Ceiling division, saturating instead of overflowing.
fn ceil_div(numerator: u64, denominator: u64) -> u64 {
    if denominator == 0 {
        return 0;
    }
    numerator
        .saturating_add(denominator.saturating_sub(1))
        .checked_div(denominator)
        .unwrap_or(0)
}

/// Narrow to `u32`, saturating at the maximum.
fn clamp_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Adaptive push cadence for periodic remaining-time sync.
///
/// Pushes are coarse (roughly every five seconds of polls) while at least
/// an hour-equivalent of ticks remains, and fine (roughly every second)
/// below that, so the display never visibly stalls when seconds matter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCadence {
    /// Polls between pushes while remaining time is comfortable.
    coarse_interval: u64,

    /// Polls between pushes on the final stretch.
    fine_interval: u64,

    /// Remaining-tick threshold below which the fine interval applies.
    hour_ticks: u64,

    /// Polls since the last push.
    since_push: u64,
}

impl SyncCadence {
    /// Create a cadence from the configured intervals.
    ///
    /// `hour_ticks` is one hour's worth of world-clock ticks
    /// (`ticks_per_day / 24`).
    pub const fn new(coarse_interval: u64, fine_interval: u64, ticks_per_day: u64) -> Self {
        Self {
            coarse_interval: if coarse_interval == 0 { 1 } else { coarse_interval },
            fine_interval: if fine_interval == 0 { 1 } else { fine_interval },
            hour_ticks: ticks_per_day / HOURS_PER_DAY,
            since_push: 0,
        }
    }

    /// Count one poll and report whether a push is due.
    ///
    /// The active interval is chosen from the current remaining ticks, so
    /// crossing below the one-hour threshold tightens the cadence on the
    /// very next poll.
    pub fn should_push(&mut self, remaining_ticks: u64) -> bool {
        self.since_push = self.since_push.saturating_add(1);

        let interval = if remaining_ticks < self.hour_ticks {
            self.fine_interval
        } else {
            self.coarse_interval
        };

        if self.since_push >= interval {
            self.since_push = 0;
            return true;
        }
        false
    }

    /// Reset the cadence after an out-of-band push so the next periodic
    /// push waits a full interval.
    pub const fn reset(&mut self) {
        self.since_push = 0;
    }
}
