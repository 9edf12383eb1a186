//! Command marshaling into the scheduler's execution context.
//!
//! All `CycleState` mutation happens on the scheduler's own tick. Anything
//! outside that context — admin handlers, the deferred grant-commit timer —
//! enqueues a [`SchedulerCommand`] here instead of touching state directly.
//! The queue is drained exactly once per tick, so re-entrant triggers are
//! serialized onto the single writer.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// A request marshaled onto the scheduler tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerCommand {
    /// Begin a rotation now (manual trigger).
    Start,

    /// Stop the current cycle and revoke the privilege.
    Stop,

    /// Change the cycle duration. Rejected while a cycle is running.
    SetDuration {
        /// New duration in simulated days (minimum 1).
        days: u64,
    },

    /// Enable or disable scheduled rotations.
    SetAutostart {
        /// Whether scheduled triggers are honored.
        enabled: bool,
    },

    /// Commit the deferred grant for the identified selection. Enqueued
    /// by the reveal delay task; rejected unless the token matches the
    /// in-flight selection.
    CommitGrant {
        /// Guard token of the selection being committed.
        token: u64,
    },
}

/// Single-consumer command queue shared between the scheduler tick and
/// everything that needs to reach it.
///
/// Commands accumulate between ticks and are drained in arrival order.
/// Shutdown is a separate flag so the loop can observe it without taking
/// the lock.
#[derive(Debug, Default)]
pub struct CommandQueue {
    /// Commands awaiting the next drain.
    queued: Mutex<Vec<SchedulerCommand>>,

    /// Whether the host asked the loop to stop.
    shutdown_requested: AtomicBool,
}

impl CommandQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a command for the next tick.
    pub async fn push(&self, command: SchedulerCommand) {
        let mut queued = self.queued.lock().await;
        queued.push(command);
    }

    /// Drain all queued commands in arrival order.
    pub async fn drain(&self) -> Vec<SchedulerCommand> {
        let mut queued = self.queued.lock().await;
        std::mem::take(&mut *queued)
    }

    /// Ask the scheduler loop to stop after its current tick.
    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::Release);
    }

    /// Whether a shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }
}
