//! Participant identity records.
//!
//! A participant is an opaque identity plus a display name. The live set
//! is supplied by the host at call time — nothing in this workspace
//! caches it, because membership can change between any two reads.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::ParticipantId;

/// A member of the rotation pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Participant {
    /// Stable identity of the participant.
    pub id: ParticipantId,
    /// Display name shown in reveals and status output.
    pub name: String,
}

impl Participant {
    /// Create a participant with a freshly minted ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::new(),
            name: name.into(),
        }
    }
}

impl core::fmt::Display for Participant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
