//! Observer API server for the Scepter rotation service.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/rotation`) streaming reveals and
//!   remaining-time updates via [`tokio::sync::broadcast`], with
//!   on-demand status replies for late joiners
//! - **REST endpoints** for querying rotation state
//! - **Admin REST endpoints** that marshal commands onto the scheduler
//!   tick (start, stop, duration, autostart, clock and roster control)
//! - **Minimal HTML dashboard** (`GET /`) showing the current phase,
//!   holder, and remaining days
//!
//! It also houses the observer-side [`RevealPresentation`] — the purely
//! presentational roulette that decelerates through candidate names
//! before landing on the authoritative winner.
//!
//! # Architecture
//!
//! The observer reads from the latest
//! [`RotationSnapshot`](scepter_core::scheduler::RotationSnapshot),
//! updated each poll by the engine bridge. All REST reads are served
//! from this snapshot so the observer never blocks the scheduler loop.
//! `WebSocket` observers receive frames via a broadcast channel with
//! automatic lag handling.

pub mod admin;
pub mod error;
pub mod handlers;
pub mod presentation;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use presentation::{PresentationPhase, PresentationTiming, RevealCue, RevealPresentation};
pub use router::build_router;
pub use server::{ServerConfig, ServerError, spawn_observer, start_server};
pub use state::AppState;
