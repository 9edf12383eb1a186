//! Host-side collaborators: the simulated world clock, the participant
//! roster, and the privilege registry.
//!
//! [`SimHost`] is the one object behind all three read-side seams the
//! core needs ([`TimeSource`], [`ParticipantDirectory`], [`HostControl`]),
//! so the scheduler loop, the admin API, and the clock all observe the
//! same world. The privilege registry is separate because grants go
//! through the scheduler's single mutable borrow.

use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use scepter_core::host::{HostControl, ParticipantDirectory, PrivilegeAuthority, TimeSource};
use scepter_types::{Participant, ParticipantId};

/// The simulated world host.
///
/// The clock self-advances by `ticks_per_poll` every time it is read, so
/// simulated time flows with the scheduler loop; admin jumps move it
/// arbitrarily in either direction on top of that.
#[derive(Debug)]
pub struct SimHost {
    /// Absolute world-clock ticks.
    ticks: AtomicU64,

    /// Ticks the clock advances per read.
    ticks_per_poll: u64,

    /// The live roster.
    roster: Mutex<Vec<Participant>>,
}

impl SimHost {
    /// Create a host at tick zero with the given seed roster.
    pub fn new(ticks_per_poll: u64, seed_names: &[String]) -> Self {
        let roster = seed_names
            .iter()
            .map(|name| Participant::new(name.clone()))
            .collect();
        Self {
            ticks: AtomicU64::new(0),
            ticks_per_poll,
            roster: Mutex::new(roster),
        }
    }
}

impl TimeSource for SimHost {
    fn now_ticks(&self) -> u64 {
        self.ticks
            .fetch_add(self.ticks_per_poll, Ordering::AcqRel)
            .saturating_add(self.ticks_per_poll)
    }
}

impl ParticipantDirectory for SimHost {
    fn online(&self) -> Vec<Participant> {
        self.roster
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl HostControl for SimHost {
    fn advance_time(&self, ticks: u64) -> u64 {
        let now = self
            .ticks
            .fetch_add(ticks, Ordering::AcqRel)
            .saturating_add(ticks);
        info!(ticks, now, "World clock advanced");
        now
    }

    fn set_time(&self, ticks: u64) -> u64 {
        self.ticks.store(ticks, Ordering::Release);
        info!(now = ticks, "World clock set");
        ticks
    }

    fn join(&self, name: &str) -> Participant {
        let participant = Participant::new(name);
        if let Ok(mut roster) = self.roster.lock() {
            roster.push(participant.clone());
            info!(name, id = %participant.id, online = roster.len(), "Participant joined");
        }
        participant
    }

    fn leave(&self, id: ParticipantId) -> bool {
        let Ok(mut roster) = self.roster.lock() else {
            return false;
        };
        let before = roster.len();
        roster.retain(|participant| participant.id != id);
        let removed = roster.len() < before;
        if removed {
            info!(%id, online = roster.len(), "Participant left");
        }
        removed
    }
}

/// In-memory record of who currently holds the elevated role.
///
/// The deployment seam for the real elevation mechanism — here it only
/// tracks membership and logs the transitions.
#[derive(Debug, Default)]
pub struct PrivilegeRegistry {
    holders: BTreeSet<ParticipantId>,
}

impl PrivilegeRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            holders: BTreeSet::new(),
        }
    }

    /// Whether the given participant currently holds the privilege.
    pub fn holds(&self, id: ParticipantId) -> bool {
        self.holders.contains(&id)
    }

    /// Number of current holders. At most one outside the instant of a
    /// handoff.
    pub fn holder_count(&self) -> usize {
        self.holders.len()
    }
}

impl PrivilegeAuthority for PrivilegeRegistry {
    fn grant(&mut self, participant: &Participant) {
        info!(name = %participant.name, id = %participant.id, "Elevated role granted");
        self.holders.insert(participant.id);
    }

    fn revoke_all(&mut self) {
        if self.holders.is_empty() {
            debug!("No holders to revoke");
        } else {
            info!(holders = self.holders.len(), "Elevated role revoked from all holders");
        }
        self.holders.clear();
    }
}
