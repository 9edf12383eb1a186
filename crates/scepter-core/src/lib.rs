//! Rotation scheduler core for the Scepter service.
//!
//! This crate owns the state machine that rotates a single scarce
//! privilege among a pool of participants on a schedule driven by an
//! external, non-monotonic world clock.
//!
//! # Modules
//!
//! - [`clock`] -- Simulated-day tracking and clock-jump detection.
//! - [`commands`] -- Command marshaling onto the scheduler tick.
//! - [`config`] -- Configuration loading from `scepter-config.yaml`.
//! - [`host`] -- Collaborator seams: world clock, participant directory,
//!   privilege authority.
//! - [`runner`] -- The async scheduler loop.
//! - [`scheduler`] -- The rotation state machine and cycle state.
//! - [`selection`] -- Uniform winner selection.
//! - [`sync`] -- Remaining-time quantization and adaptive push cadence.

pub mod clock;
pub mod commands;
pub mod config;
pub mod host;
pub mod runner;
pub mod scheduler;
pub mod selection;
pub mod sync;

// Re-export primary types for convenience.
pub use commands::{CommandQueue, SchedulerCommand};
pub use config::ScepterConfig;
pub use runner::{RotationSink, RunEndReason, RunnerReport, run_rotation};
pub use scheduler::{
    CyclePhase, CycleState, PendingSelection, RotationScheduler, RotationSnapshot,
    SchedulerEffect, SchedulerError, TickInputs,
};
