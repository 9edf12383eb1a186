//! The rotation scheduler state machine.
//!
//! One mutable [`CycleState`] instance lives here for the process
//! lifetime, owned exclusively by the [`RotationScheduler`] and mutated
//! only from the scheduler's tick (commands from other execution contexts
//! are marshaled through [`CommandQueue`](crate::commands::CommandQueue)
//! and drained at tick start).
//!
//! # Phases
//!
//! `Idle → Selecting → Active → Idle`. A rotation is two-phase: *begin*
//! snapshots the live participant set, strips the sitting holder, picks a
//! winner, and broadcasts the reveal — but defers the grant. *Commit*
//! runs after the reveal window elapses, re-entering the tick via the
//! command queue, and is guarded by the `grant_pending` flag plus a
//! per-selection token so a stale timer can never double-grant.
//!
//! Every tick checks expiry against the absolute world clock so drift is
//! at most one poll. Day-change bookkeeping (the scheduled trigger) runs
//! on a coarser interval, but a detected clock jump of more than a day
//! forces it immediately.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use scepter_types::{Participant, RemainingTime, Reveal};

use crate::clock::{ClockError, DayTracker, JumpDetector};
use crate::commands::SchedulerCommand;
use crate::config::ScepterConfig;
use crate::host::PrivilegeAuthority;
use crate::selection;
use crate::sync;

/// Errors and no-op conditions reported by scheduler operations.
///
/// None of these are fatal: callers get a failure signal and state is
/// left unchanged.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// A cycle is already running.
    #[error("a rotation cycle is already running")]
    AlreadyRunning,

    /// A selection is mid-reveal and has not committed yet.
    #[error("a selection is already in progress")]
    SelectionInProgress,

    /// No cycle is running to stop.
    #[error("no rotation cycle is currently running")]
    NotRunning,

    /// The participant pool is empty.
    #[error("no participants are present")]
    NoParticipants,

    /// Duration may only change between cycles.
    #[error("duration cannot change while a cycle is running")]
    CycleActive,

    /// Duration must be at least one day.
    #[error("duration must be at least 1 day, got {days}")]
    InvalidDuration {
        /// The rejected value.
        days: u64,
    },

    /// A grant commit arrived for a selection that is no longer in
    /// flight (already committed, or cancelled by a stop).
    #[error("stale or duplicate grant commit (token {token})")]
    StaleCommit {
        /// Token presented by the late commit.
        token: u64,
    },

    /// Clock tracking could not be constructed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

/// Where the scheduler currently is in the rotation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    /// No cycle running, no selection in flight.
    Idle,
    /// A winner has been picked and broadcast; the grant is deferred.
    Selecting,
    /// A holder has the privilege and the cycle clock is counting down.
    Active,
}

/// The authoritative cycle state.
///
/// Created once at scheduler construction (inactive) and alive for the
/// process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleState {
    /// Whether a cycle is currently running.
    pub running: bool,

    /// The sitting privilege holder, if any.
    pub current_holder: Option<Participant>,

    /// Absolute world-clock tick when the cycle ends.
    pub cycle_end_time: Option<u64>,

    /// Simulated day index the cycle started on.
    pub cycle_start_day: Option<u64>,

    /// Length of a holder's tenure in simulated days (>= 1).
    pub duration_days: u64,

    /// Whether scheduled rotations fire without an explicit start.
    pub autostart_enabled: bool,

    /// Whether a selection is awaiting its deferred grant commit. While
    /// this is set a [`PendingSelection`] exists, and no second rotation
    /// can begin — this is the invariant that prevents overlapping
    /// grants.
    pub grant_pending: bool,
}

/// A selection awaiting its deferred commit.
///
/// Created when a rotation begins and consumed exactly once, either by
/// the commit or by a cancelling stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSelection {
    /// The candidate snapshot the winner was drawn from, in host order.
    pub candidates: Vec<Participant>,

    /// The selected winner.
    pub winner: Participant,

    /// Simulated day the selection was made on.
    pub began_at_day: u64,

    /// Absolute world-clock tick the selection was made at.
    pub began_at_time: u64,

    /// Guard token a commit must present. Monotonically increasing per
    /// selection, so a timer from a cancelled selection cannot commit a
    /// later one.
    pub token: u64,
}

/// Side effects the runner performs on the scheduler's behalf.
///
/// The state machine itself never touches the network or spawns tasks;
/// it describes what should happen and the runner does it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEffect {
    /// Broadcast a reveal to all observers.
    BroadcastReveal(Reveal),

    /// Start the reveal delay; enqueue a `CommitGrant` with this token
    /// once it elapses.
    ScheduleCommit {
        /// Guard token of the selection to commit.
        token: u64,
    },

    /// Push a remaining-time update to all observers immediately.
    PushRemainingTime(RemainingTime),
}

/// Per-tick inputs gathered by the runner.
#[derive(Debug, Clone, Copy)]
pub struct TickInputs<'a> {
    /// Current absolute world-clock tick.
    pub now: u64,

    /// The live participant set, read from the directory this tick.
    pub participants: &'a [Participant],
}

/// Read-only projection of scheduler state for observers and the admin
/// status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationSnapshot {
    /// Current lifecycle phase.
    pub phase: CyclePhase,
    /// Whether a cycle is running.
    pub running: bool,
    /// The sitting holder, if any.
    pub current_holder: Option<Participant>,
    /// Configured tenure length in days.
    pub duration_days: u64,
    /// Whether scheduled rotations are enabled.
    pub autostart_enabled: bool,
    /// Whether a selection is awaiting commit.
    pub grant_pending: bool,
    /// Current simulated day index.
    pub current_day: u64,
    /// Current absolute world-clock tick.
    pub now_ticks: u64,
    /// Quantized time remaining in the cycle.
    pub remaining: RemainingTime,
    /// Number of participants present this tick.
    pub participants_online: u32,
}

impl Default for RotationSnapshot {
    /// The snapshot served before the first poll: idle, defaults intact.
    fn default() -> Self {
        Self {
            phase: CyclePhase::Idle,
            running: false,
            current_holder: None,
            duration_days: 7,
            autostart_enabled: true,
            grant_pending: false,
            current_day: 0,
            now_ticks: 0,
            remaining: RemainingTime::INACTIVE,
            participants_online: 0,
        }
    }
}

/// The rotation scheduler state machine.
///
/// See the module docs for the lifecycle. All methods are synchronous
/// and complete without observable partial state.
#[derive(Debug)]
pub struct RotationScheduler {
    /// The single authoritative cycle state.
    state: CycleState,

    /// The in-flight selection, if any. `Some` iff `state.grant_pending`.
    pending: Option<PendingSelection>,

    /// Scheduled-rotation day bookkeeping.
    days: DayTracker,

    /// Clock anomaly detection.
    jump: JumpDetector,

    /// Winner selection RNG.
    rng: SmallRng,

    /// Next selection guard token.
    next_token: u64,

    /// Polls observed, for the coarse bookkeeping interval.
    poll_counter: u64,

    /// Ticks in one simulated day.
    ticks_per_day: u64,

    /// Polls between day-change bookkeeping passes.
    time_check_interval: u64,

    /// Quantization threshold for the days-remaining display.
    negligible_remainder_ticks: u64,
}

impl RotationScheduler {
    /// Create an idle scheduler from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidDuration`] if the configured
    /// duration is zero, or [`SchedulerError::Clock`] if the clock
    /// settings are invalid.
    pub fn new(config: &ScepterConfig) -> Result<Self, SchedulerError> {
        if config.rotation.duration_days == 0 {
            return Err(SchedulerError::InvalidDuration { days: 0 });
        }

        let days = DayTracker::new(
            config.clock.ticks_per_day,
            config.rotation.days_between_cycles,
        )?;

        Ok(Self {
            state: CycleState {
                running: false,
                current_holder: None,
                cycle_end_time: None,
                cycle_start_day: None,
                duration_days: config.rotation.duration_days,
                autostart_enabled: config.rotation.autostart_enabled,
                grant_pending: false,
            },
            pending: None,
            days,
            jump: JumpDetector::new(config.clock.ticks_per_day),
            rng: SmallRng::seed_from_u64(config.service.seed),
            next_token: 1,
            poll_counter: 0,
            ticks_per_day: config.clock.ticks_per_day,
            time_check_interval: config.rotation.time_check_interval_ticks.max(1),
            negligible_remainder_ticks: config.rotation.negligible_remainder_ticks,
        })
    }

    /// The authoritative cycle state.
    pub const fn state(&self) -> &CycleState {
        &self.state
    }

    /// The in-flight selection, if any.
    pub const fn pending(&self) -> Option<&PendingSelection> {
        self.pending.as_ref()
    }

    /// Current lifecycle phase.
    pub const fn phase(&self) -> CyclePhase {
        if self.state.grant_pending {
            CyclePhase::Selecting
        } else if self.state.running {
            CyclePhase::Active
        } else {
            CyclePhase::Idle
        }
    }

    /// Raw ticks remaining in the running cycle, or `None` when idle.
    pub fn remaining_ticks(&self, now: u64) -> Option<u64> {
        if !self.state.running {
            return None;
        }
        self.state
            .cycle_end_time
            .map(|end| end.saturating_sub(now))
    }

    /// Quantized remaining time as observers should see it.
    pub fn remaining_time(&self, now: u64) -> RemainingTime {
        self.remaining_ticks(now).map_or(RemainingTime::INACTIVE, |ticks| {
            sync::quantize_remaining(ticks, self.ticks_per_day, self.negligible_remainder_ticks)
        })
    }

    /// Build the observer-facing snapshot for this tick.
    pub fn snapshot(&self, inputs: &TickInputs<'_>) -> RotationSnapshot {
        RotationSnapshot {
            phase: self.phase(),
            running: self.state.running,
            current_holder: self.state.current_holder.clone(),
            duration_days: self.state.duration_days,
            autostart_enabled: self.state.autostart_enabled,
            grant_pending: self.state.grant_pending,
            current_day: self.days.current_day(inputs.now),
            now_ticks: inputs.now,
            remaining: self.remaining_time(inputs.now),
            participants_online: u32::try_from(inputs.participants.len()).unwrap_or(u32::MAX),
        }
    }

    /// Evaluate one scheduler tick.
    ///
    /// Expiry is checked on every call. Day-change bookkeeping (the
    /// scheduled trigger) runs every `time_check_interval` polls, or
    /// immediately when the clock jumped more than a day since the last
    /// poll.
    pub fn tick(
        &mut self,
        inputs: &TickInputs<'_>,
        authority: &mut dyn PrivilegeAuthority,
    ) -> Vec<SchedulerEffect> {
        self.poll_counter = self.poll_counter.wrapping_add(1);

        let jumped = self.jump.observe(inputs.now);
        if jumped {
            warn!(
                now = inputs.now,
                "World clock jumped more than a day; re-evaluating cycle state"
            );
        }

        let mut effects = Vec::new();

        // Expiry: every tick, so drift is at most one poll.
        if self.state.running {
            if let Some(end) = self.state.cycle_end_time {
                if inputs.now >= end {
                    info!(now = inputs.now, end, "Cycle complete");
                    effects.extend(self.end_cycle(authority));
                }
            }
        }

        // Scheduled trigger: coarse interval, forced on a jump.
        let coarse_due = self
            .poll_counter
            .checked_rem(self.time_check_interval)
            .unwrap_or(0)
            == 0;

        // Watchdog: a selection whose commit never arrived (the delay
        // task was interrupted or dropped) is abandoned, so the
        // scheduler is not stuck Selecting forever. The reveal window
        // is seconds of wall clock; a full simulated day of drift means
        // the commit is not coming.
        if coarse_due || jumped {
            if let Some(pending) = self.pending.as_ref() {
                if self.state.grant_pending
                    && inputs.now.abs_diff(pending.began_at_time) > self.ticks_per_day
                {
                    warn!(
                        token = pending.token,
                        "Reveal commit never arrived; abandoning the in-flight selection"
                    );
                    self.pending = None;
                    self.state.grant_pending = false;
                }
            }
        }

        if (coarse_due || jumped)
            && !self.state.running
            && !self.state.grant_pending
            && self.state.autostart_enabled
            && !inputs.participants.is_empty()
            && self.days.should_trigger_rotation(inputs.now)
        {
            info!("Scheduled rotation starting; a new holder will be chosen");
            effects.extend(self.begin_rotation(inputs, authority));
        }

        effects
    }

    /// Apply a marshaled command on the scheduler tick.
    ///
    /// # Errors
    ///
    /// Returns the no-op condition when the command cannot apply; state
    /// is unchanged in that case.
    pub fn apply(
        &mut self,
        command: SchedulerCommand,
        inputs: &TickInputs<'_>,
        authority: &mut dyn PrivilegeAuthority,
    ) -> Result<Vec<SchedulerEffect>, SchedulerError> {
        match command {
            SchedulerCommand::Start => self.start(inputs, authority),
            SchedulerCommand::Stop => self.stop(authority),
            SchedulerCommand::SetDuration { days } => {
                self.set_duration(days)?;
                Ok(Vec::new())
            }
            SchedulerCommand::SetAutostart { enabled } => {
                self.set_autostart(enabled);
                Ok(Vec::new())
            }
            SchedulerCommand::CommitGrant { token } => self.commit_grant(token, inputs, authority),
        }
    }

    /// Begin a rotation in response to a manual start.
    fn start(
        &mut self,
        inputs: &TickInputs<'_>,
        authority: &mut dyn PrivilegeAuthority,
    ) -> Result<Vec<SchedulerEffect>, SchedulerError> {
        if self.state.running {
            return Err(SchedulerError::AlreadyRunning);
        }
        if self.state.grant_pending {
            return Err(SchedulerError::SelectionInProgress);
        }
        if inputs.participants.is_empty() {
            return Err(SchedulerError::NoParticipants);
        }
        info!("Rotation started manually");
        Ok(self.begin_rotation(inputs, authority))
    }

    /// Stop the current cycle or cancel an in-flight selection.
    fn stop(
        &mut self,
        authority: &mut dyn PrivilegeAuthority,
    ) -> Result<Vec<SchedulerEffect>, SchedulerError> {
        if !self.state.running && !self.state.grant_pending {
            return Err(SchedulerError::NotRunning);
        }

        // Dropping the pending selection invalidates its token, so a
        // commit from an already-scheduled delay task becomes a no-op.
        if let Some(pending) = self.pending.take() {
            info!(token = pending.token, winner = %pending.winner.name, "In-flight selection cancelled by stop");
        }
        self.state.grant_pending = false;

        authority.revoke_all();
        self.state.current_holder = None;
        self.state.cycle_end_time = None;
        self.state.cycle_start_day = None;
        self.state.running = false;

        info!("Rotation cycle stopped; privilege revoked");
        Ok(vec![SchedulerEffect::PushRemainingTime(
            RemainingTime::INACTIVE,
        )])
    }

    /// Change the tenure length. Only allowed between cycles.
    fn set_duration(&mut self, days: u64) -> Result<(), SchedulerError> {
        if days == 0 {
            return Err(SchedulerError::InvalidDuration { days });
        }
        if self.state.running {
            return Err(SchedulerError::CycleActive);
        }
        info!(previous = self.state.duration_days, days, "Cycle duration changed");
        self.state.duration_days = days;
        Ok(())
    }

    /// Flip the autostart flag. Pure setting; no other side effect.
    fn set_autostart(&mut self, enabled: bool) {
        info!(enabled, "Autostart setting changed");
        self.state.autostart_enabled = enabled;
    }

    /// Begin a rotation: strip the sitting holder, pick a winner, and
    /// defer the grant behind the reveal window.
    ///
    /// An empty participant snapshot aborts silently with no state
    /// change — the next scheduled tick retries.
    fn begin_rotation(
        &mut self,
        inputs: &TickInputs<'_>,
        authority: &mut dyn PrivilegeAuthority,
    ) -> Vec<SchedulerEffect> {
        let Some(winner) = selection::pick_winner(&mut self.rng, inputs.participants) else {
            debug!("No participants present; skipping rotation");
            return Vec::new();
        };
        let winner = winner.clone();

        // The outgoing holder loses the privilege before the reveal, so
        // nobody holds it during the selection window.
        authority.revoke_all();
        self.state.current_holder = None;
        self.state.cycle_end_time = None;
        self.state.cycle_start_day = None;
        self.state.running = false;

        let token = self.next_token;
        self.next_token = self.next_token.wrapping_add(1);

        let candidates: Vec<Participant> = inputs.participants.to_vec();
        info!(
            token,
            candidates = candidates.len(),
            winner = %winner.name,
            "Winner selected; grant deferred until the reveal window elapses"
        );

        let reveal = Reveal {
            candidates: candidates.iter().map(|p| p.name.clone()).collect(),
            winner: winner.name.clone(),
            is_beginning: true,
        };

        self.pending = Some(PendingSelection {
            candidates,
            winner,
            began_at_day: self.days.current_day(inputs.now),
            began_at_time: inputs.now,
            token,
        });
        self.state.grant_pending = true;

        vec![
            SchedulerEffect::BroadcastReveal(reveal),
            SchedulerEffect::ScheduleCommit { token },
        ]
    }

    /// Commit the deferred grant for a selection.
    ///
    /// Guarded by `grant_pending` and the selection token: a commit for
    /// an already-consumed or cancelled selection is rejected as a no-op
    /// so a stale timer can never double-grant.
    fn commit_grant(
        &mut self,
        token: u64,
        inputs: &TickInputs<'_>,
        authority: &mut dyn PrivilegeAuthority,
    ) -> Result<Vec<SchedulerEffect>, SchedulerError> {
        let matches = self.state.grant_pending
            && self.pending.as_ref().is_some_and(|p| p.token == token);
        if !matches {
            warn!(token, "Rejected stale or duplicate grant commit");
            return Err(SchedulerError::StaleCommit { token });
        }

        // The guard above ensures the selection exists.
        let Some(pending) = self.pending.take() else {
            return Err(SchedulerError::StaleCommit { token });
        };
        self.state.grant_pending = false;

        authority.grant(&pending.winner);

        let tenure_ticks = self.state.duration_days.saturating_mul(self.ticks_per_day);
        let end = inputs.now.saturating_add(tenure_ticks);
        self.state.cycle_end_time = Some(end);
        self.state.cycle_start_day = Some(self.days.current_day(inputs.now));
        self.state.current_holder = Some(pending.winner.clone());
        self.state.running = true;

        info!(
            winner = %pending.winner.name,
            duration_days = self.state.duration_days,
            cycle_end_time = end,
            "Privilege granted; cycle running"
        );

        Ok(vec![SchedulerEffect::PushRemainingTime(
            self.remaining_time(inputs.now),
        )])
    }

    /// End the running cycle on expiry.
    fn end_cycle(
        &mut self,
        authority: &mut dyn PrivilegeAuthority,
    ) -> Vec<SchedulerEffect> {
        authority.revoke_all();

        let outgoing = self.state.current_holder.take();
        self.state.cycle_end_time = None;
        self.state.cycle_start_day = None;
        self.state.running = false;

        let mut effects = Vec::with_capacity(2);
        if let Some(holder) = outgoing {
            info!(holder = %holder.name, "Tenure ended; privilege revoked");
            effects.push(SchedulerEffect::BroadcastReveal(Reveal {
                candidates: Vec::new(),
                winner: holder.name,
                is_beginning: false,
            }));
        }
        effects.push(SchedulerEffect::PushRemainingTime(RemainingTime::INACTIVE));
        effects
    }
}
