//! Shared type definitions for the Scepter privilege rotation service.
//!
//! This crate is the single source of truth for identifiers, participant
//! records, and the wire message schemas exchanged with observers. Types
//! defined here flow downstream to `TypeScript` via `ts-rs` for the
//! observer dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers
//! - [`participant`] -- Participant identity records
//! - [`messages`] -- Wire message schemas (reveals, remaining time)

pub mod ids;
pub mod messages;
pub mod participant;

// Re-export all public types at crate root for convenience.
pub use ids::ParticipantId;
pub use messages::{ClientFrame, ObserverFrame, RemainingTime, Reveal, StatusRequest};
pub use participant::Participant;
