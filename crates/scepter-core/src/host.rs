//! Collaborator seams between the rotation core and its host.
//!
//! The host owns the world clock, the live participant roster, and the
//! actual privilege mechanism. The core only ever talks to them through
//! these traits, supplied at construction and called at tick time — the
//! participant set in particular is never cached, because membership can
//! change between any two reads.
//!
//! [`ManualClock`], [`StaticDirectory`], and [`NullAuthority`] are simple
//! in-memory implementations used by tests and available to hosts.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use scepter_types::{Participant, ParticipantId};

/// The external world clock. Absolute ticks, *not* monotonic: it can
/// jump, rewind, or stall.
pub trait TimeSource: Send + Sync {
    /// The current absolute world-clock tick.
    fn now_ticks(&self) -> u64;
}

/// Supplies the live participant set at call time.
pub trait ParticipantDirectory: Send + Sync {
    /// Everyone currently present, in host order.
    fn online(&self) -> Vec<Participant>;
}

/// The mechanism that actually elevates and revokes the privilege.
///
/// A thin, stateless wrapper from the scheduler's point of view: grants
/// and revocations are applied synchronously and cannot fail partway.
pub trait PrivilegeAuthority: Send {
    /// Elevate the given participant.
    fn grant(&mut self, participant: &Participant);

    /// Revoke the privilege from everyone who holds it.
    fn revoke_all(&mut self);
}

/// Host-side control surface exposed through the admin API: world-clock
/// manipulation and roster changes.
pub trait HostControl: Send + Sync {
    /// Advance the world clock by `ticks` and return the new value.
    fn advance_time(&self, ticks: u64) -> u64;

    /// Set the world clock to an absolute tick value and return it.
    fn set_time(&self, ticks: u64) -> u64;

    /// Add a participant to the roster and return the new record.
    fn join(&self, name: &str) -> Participant;

    /// Remove a participant from the roster. Returns `false` if the ID
    /// was not present.
    fn leave(&self, id: ParticipantId) -> bool;
}

/// A hand-driven clock for tests: holds still until told to move.
#[derive(Debug, Default)]
pub struct ManualClock {
    ticks: AtomicU64,
}

impl ManualClock {
    /// Create a clock starting at the given tick.
    pub const fn starting_at(ticks: u64) -> Self {
        Self {
            ticks: AtomicU64::new(ticks),
        }
    }

    /// Advance the clock by `ticks`.
    pub fn advance(&self, ticks: u64) -> u64 {
        self.ticks
            .fetch_add(ticks, Ordering::AcqRel)
            .saturating_add(ticks)
    }

    /// Set the clock to an absolute tick value.
    pub fn set(&self, ticks: u64) -> u64 {
        self.ticks.store(ticks, Ordering::Release);
        ticks
    }
}

impl TimeSource for ManualClock {
    fn now_ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }
}

/// A directory backed by a mutable in-memory list.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    participants: Mutex<Vec<Participant>>,
}

impl StaticDirectory {
    /// Create a directory with the given initial roster.
    pub fn with_participants(participants: Vec<Participant>) -> Self {
        Self {
            participants: Mutex::new(participants),
        }
    }

    /// Replace the roster wholesale.
    pub fn set(&self, participants: Vec<Participant>) {
        if let Ok(mut guard) = self.participants.lock() {
            *guard = participants;
        }
    }
}

impl ParticipantDirectory for StaticDirectory {
    fn online(&self) -> Vec<Participant> {
        self.participants
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

/// An authority that does nothing. Useful when a test only exercises
/// scheduling decisions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuthority;

impl PrivilegeAuthority for NullAuthority {
    fn grant(&mut self, _participant: &Participant) {}

    fn revoke_all(&mut self) {}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_holds_still() {
        let clock = ManualClock::starting_at(500);
        assert_eq!(clock.now_ticks(), 500);
        assert_eq!(clock.now_ticks(), 500);
    }

    #[test]
    fn manual_clock_advances_and_sets() {
        let clock = ManualClock::default();
        assert_eq!(clock.advance(10), 10);
        assert_eq!(clock.advance(5), 15);
        assert_eq!(clock.set(1_000), 1_000);
        assert_eq!(clock.now_ticks(), 1_000);
    }

    #[test]
    fn static_directory_reflects_replacements() {
        let directory =
            StaticDirectory::with_participants(vec![Participant::new("Alba")]);
        assert_eq!(directory.online().len(), 1);

        directory.set(Vec::new());
        assert!(directory.online().is_empty());
    }
}
