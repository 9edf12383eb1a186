//! The scheduler loop runner.
//!
//! [`run_rotation`] drives the single authoritative execution context: it
//! polls the world clock, snapshots the participant directory, drains the
//! command queue, ticks the [`RotationScheduler`], and performs the
//! effects the state machine hands back. Nothing here blocks the loop —
//! the reveal delay runs on its own tokio task and re-enters through the
//! command queue, which is the one cross-context handoff in the system.
//!
//! Failures inside a poll are never fatal: rejected commands are logged
//! as no-ops and the loop keeps ticking.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use scepter_types::ObserverFrame;

use crate::commands::{CommandQueue, SchedulerCommand};
use crate::config::ScepterConfig;
use crate::host::{ParticipantDirectory, PrivilegeAuthority, TimeSource};
use crate::scheduler::{RotationScheduler, RotationSnapshot, SchedulerEffect, TickInputs};
use crate::sync::SyncCadence;

/// Reason the scheduler loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEndReason {
    /// The host requested a shutdown.
    ShutdownRequested,
    /// The configured poll limit was reached (bounded runs).
    MaxPollsReached,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerReport {
    /// Why the loop stopped.
    pub end_reason: RunEndReason,
    /// Total polls executed.
    pub total_polls: u64,
}

/// Receives observer-facing output from the loop.
///
/// Implementations bridge to the observer transport (broadcast channel +
/// snapshot store). They must not block: the snapshot update in
/// particular should skip rather than wait if a reader holds the lock.
pub trait RotationSink: Send {
    /// A wire frame to fan out to every connected observer.
    fn on_frame(&mut self, frame: &ObserverFrame);

    /// The per-poll state snapshot for status endpoints.
    fn on_snapshot(&mut self, snapshot: &RotationSnapshot);
}

/// A sink that discards everything. Useful in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpSink;

impl RotationSink for NoOpSink {
    fn on_frame(&mut self, _frame: &ObserverFrame) {}

    fn on_snapshot(&mut self, _snapshot: &RotationSnapshot) {}
}

/// Run the scheduler loop until shutdown (or the poll limit on bounded
/// runs).
///
/// Each poll:
///
/// 1. reads the world clock and the live participant set,
/// 2. drains marshaled commands into the scheduler,
/// 3. evaluates the scheduler tick (expiry, triggers),
/// 4. performs the returned effects (broadcasts, the deferred-commit
///    timer),
/// 5. pushes the periodic remaining-time update when the adaptive
///    cadence says so, and
/// 6. publishes a state snapshot.
pub async fn run_rotation(
    scheduler: &mut RotationScheduler,
    time: &dyn TimeSource,
    directory: &dyn ParticipantDirectory,
    authority: &mut dyn PrivilegeAuthority,
    queue: &Arc<CommandQueue>,
    sink: &mut dyn RotationSink,
    config: &ScepterConfig,
) -> RunnerReport {
    let mut cadence = SyncCadence::new(
        config.sync.coarse_interval_ticks,
        config.sync.fine_interval_ticks,
        config.clock.ticks_per_day,
    );
    let commit_delay = Duration::from_millis(config.reveal.commit_delay_ms);
    let tick_interval_ms = config.service.tick_interval_ms;
    let max_polls = config.bounds.max_ticks;

    let mut total_polls: u64 = 0;

    info!(
        tick_interval_ms,
        commit_delay_ms = config.reveal.commit_delay_ms,
        max_polls,
        "Rotation loop starting"
    );

    loop {
        if queue.is_shutdown_requested() {
            info!(total_polls, "Shutdown requested; rotation loop stopping");
            return RunnerReport {
                end_reason: RunEndReason::ShutdownRequested,
                total_polls,
            };
        }

        if max_polls > 0 && total_polls >= max_polls {
            info!(total_polls, "Poll limit reached; rotation loop stopping");
            return RunnerReport {
                end_reason: RunEndReason::MaxPollsReached,
                total_polls,
            };
        }

        let now = time.now_ticks();
        let participants = directory.online();
        let inputs = TickInputs {
            now,
            participants: &participants,
        };

        // Marshaled re-entry: admin commands and deferred commits apply
        // here, on the scheduler's own context.
        for command in queue.drain().await {
            match scheduler.apply(command.clone(), &inputs, authority) {
                Ok(effects) => {
                    perform_effects(&effects, queue, sink, &mut cadence, commit_delay);
                }
                Err(reason) => {
                    warn!(?command, %reason, "Command ignored");
                }
            }
        }

        let effects = scheduler.tick(&inputs, authority);
        perform_effects(&effects, queue, sink, &mut cadence, commit_delay);

        // Periodic remaining-time sync while a cycle runs.
        if let Some(remaining_ticks) = scheduler.remaining_ticks(now) {
            if cadence.should_push(remaining_ticks) {
                let remaining = scheduler.remaining_time(now);
                debug!(?remaining, "Periodic remaining-time push");
                sink.on_frame(&ObserverFrame::RemainingTime(remaining));
            }
        }

        sink.on_snapshot(&scheduler.snapshot(&inputs));

        total_polls = total_polls.saturating_add(1);

        if tick_interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(tick_interval_ms)).await;
        }
    }
}

/// Perform scheduler effects: fan out frames and start reveal delays.
///
/// The deferred commit is an explicit scheduled task carrying only its
/// guard token — if the task is dropped or never fires, the in-flight
/// selection is simply cancelled by the next stop or trigger; nothing
/// crashes.
fn perform_effects(
    effects: &[SchedulerEffect],
    queue: &Arc<CommandQueue>,
    sink: &mut dyn RotationSink,
    cadence: &mut SyncCadence,
    commit_delay: Duration,
) {
    for effect in effects {
        match effect {
            SchedulerEffect::BroadcastReveal(reveal) => {
                sink.on_frame(&ObserverFrame::Reveal(reveal.clone()));
            }
            SchedulerEffect::PushRemainingTime(remaining) => {
                sink.on_frame(&ObserverFrame::RemainingTime(*remaining));
                cadence.reset();
            }
            SchedulerEffect::ScheduleCommit { token } => {
                let token = *token;
                let queue = Arc::clone(queue);
                debug!(token, ?commit_delay, "Reveal window open; commit scheduled");
                tokio::spawn(async move {
                    tokio::time::sleep(commit_delay).await;
                    queue.push(SchedulerCommand::CommitGrant { token }).await;
                });
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use scepter_types::Participant;

    use super::*;
    use crate::host::{ManualClock, NullAuthority, StaticDirectory};
    use crate::scheduler::CyclePhase;

    /// Sink that records every frame and counts snapshots.
    #[derive(Debug, Default)]
    struct RecordingSink {
        frames: Vec<ObserverFrame>,
        snapshots: u64,
    }

    impl RotationSink for RecordingSink {
        fn on_frame(&mut self, frame: &ObserverFrame) {
            self.frames.push(frame.clone());
        }

        fn on_snapshot(&mut self, _snapshot: &RotationSnapshot) {
            self.snapshots = self.snapshots.saturating_add(1);
        }
    }

    fn fast_config(max_polls: u64) -> ScepterConfig {
        let mut config = ScepterConfig::default();
        config.service.tick_interval_ms = 1;
        config.rotation.time_check_interval_ticks = 1;
        config.reveal.commit_delay_ms = 10;
        config.bounds.max_ticks = max_polls;
        config
    }

    fn roster(names: &[&str]) -> Vec<Participant> {
        names.iter().map(|name| Participant::new(*name)).collect()
    }

    #[tokio::test]
    async fn bounded_run_stops_at_poll_limit() {
        let config = fast_config(5);
        let mut scheduler = RotationScheduler::new(&config).unwrap();
        let clock = ManualClock::default();
        let directory = StaticDirectory::default();
        let mut authority = NullAuthority;
        let queue = Arc::new(CommandQueue::new());
        let mut sink = RecordingSink::default();

        let report = run_rotation(
            &mut scheduler,
            &clock,
            &directory,
            &mut authority,
            &queue,
            &mut sink,
            &config,
        )
        .await;

        assert_eq!(report.end_reason, RunEndReason::MaxPollsReached);
        assert_eq!(report.total_polls, 5);
        assert_eq!(sink.snapshots, 5);
    }

    #[tokio::test]
    async fn shutdown_request_stops_the_loop() {
        let config = fast_config(0);
        let mut scheduler = RotationScheduler::new(&config).unwrap();
        let clock = ManualClock::default();
        let directory = StaticDirectory::default();
        let mut authority = NullAuthority;
        let queue = Arc::new(CommandQueue::new());
        queue.request_shutdown();
        let mut sink = RecordingSink::default();

        let report = run_rotation(
            &mut scheduler,
            &clock,
            &directory,
            &mut authority,
            &queue,
            &mut sink,
            &config,
        )
        .await;

        assert_eq!(report.end_reason, RunEndReason::ShutdownRequested);
        assert_eq!(report.total_polls, 0);
    }

    #[tokio::test]
    async fn manual_start_reveals_then_commits_after_the_window() {
        let config = fast_config(100);
        let mut scheduler = RotationScheduler::new(&config).unwrap();
        let clock = ManualClock::default();
        let directory =
            StaticDirectory::with_participants(roster(&["Alba", "Corvin", "Maren"]));
        let mut authority = NullAuthority;
        let queue = Arc::new(CommandQueue::new());
        queue.push(SchedulerCommand::Start).await;
        let mut sink = RecordingSink::default();

        let _ = run_rotation(
            &mut scheduler,
            &clock,
            &directory,
            &mut authority,
            &queue,
            &mut sink,
            &config,
        )
        .await;

        // The reveal went out with all three candidates, then the
        // deferred commit fired and the cycle went active.
        let reveal = sink
            .frames
            .iter()
            .find_map(|frame| match frame {
                ObserverFrame::Reveal(reveal) => Some(reveal),
                ObserverFrame::RemainingTime(_) => None,
            })
            .unwrap();
        assert_eq!(reveal.candidates.len(), 3);
        assert!(reveal.candidates.contains(&reveal.winner));

        assert_eq!(scheduler.phase(), CyclePhase::Active);
        assert!(scheduler.state().current_holder.is_some());

        // The commit pushed an immediate active remaining-time frame
        // showing the full tenure.
        assert!(sink.frames.iter().any(|frame| matches!(
            frame,
            ObserverFrame::RemainingTime(remaining)
                if remaining.active && remaining.days == 7
        )));
    }

    #[tokio::test]
    async fn stop_pushes_an_inactive_update() {
        let config = fast_config(100);
        let mut scheduler = RotationScheduler::new(&config).unwrap();
        let clock = ManualClock::default();
        let directory = StaticDirectory::with_participants(roster(&["Alba", "Corvin"]));
        let mut authority = NullAuthority;
        let queue = Arc::new(CommandQueue::new());
        queue.push(SchedulerCommand::Start).await;
        let mut sink = RecordingSink::default();

        // First run: start and commit.
        let _ = run_rotation(
            &mut scheduler,
            &clock,
            &directory,
            &mut authority,
            &queue,
            &mut sink,
            &config,
        )
        .await;
        assert!(scheduler.state().running);

        // Second run: a stop arrives.
        queue.push(SchedulerCommand::Stop).await;
        let mut sink = RecordingSink::default();
        let config_short = {
            let mut c = config.clone();
            c.bounds.max_ticks = 3;
            c
        };
        let _ = run_rotation(
            &mut scheduler,
            &clock,
            &directory,
            &mut authority,
            &queue,
            &mut sink,
            &config_short,
        )
        .await;

        assert!(!scheduler.state().running);
        assert!(scheduler.state().current_holder.is_none());
        assert!(sink.frames.iter().any(|frame| matches!(
            frame,
            ObserverFrame::RemainingTime(remaining)
                if !remaining.active
                    && remaining.days == 0
                    && remaining.hours == 0
                    && remaining.minutes == 0
        )));
    }
}
