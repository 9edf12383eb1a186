//! Wire message schemas exchanged between the server and observers.
//!
//! Every message is a small fixed-schema record serialized as JSON.
//! Server→observer frames are wrapped in the tagged [`ObserverFrame`]
//! envelope so a single `WebSocket` stream can carry both reveals and
//! remaining-time updates; observer→server frames use [`ClientFrame`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Announcement of a rotation: the full candidate list, the winner, and
/// whether this reveal opens a new cycle or closes one out.
///
/// The winner is authoritative — observer-side presentation cycles
/// through `candidates` for effect, but always lands on `winner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Reveal {
    /// Display names of every candidate in the rotation, in server order.
    pub candidates: Vec<String>,
    /// Display name of the selected winner.
    pub winner: String,
    /// `true` when a new cycle is beginning, `false` when one is closing.
    pub is_beginning: bool,
}

/// Quantized time remaining in the current cycle.
///
/// Derived server-side from the cycle end time and the current world
/// clock; never stored. `active == false` means no cycle is running and
/// the numeric fields are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RemainingTime {
    /// Whole days remaining (rounded per the quantization rule).
    pub days: u32,
    /// Hours remaining, populated when less than a day is left
    /// (and fixed to 24 when exactly one day remains).
    pub hours: u32,
    /// Minutes remaining, populated when less than an hour is left.
    pub minutes: u32,
    /// Whether a cycle is currently active.
    pub active: bool,
}

impl RemainingTime {
    /// The canonical "no active cycle" update pushed on stop and expiry.
    pub const INACTIVE: Self = Self {
        days: 0,
        hours: 0,
        minutes: 0,
        active: false,
    };
}

/// Stateless observer→server pull for an immediate remaining-time push.
///
/// Used by late joiners and reconnecting observers so their display is
/// never left stale until the next periodic push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StatusRequest {}

/// Envelope for server→observer `WebSocket` frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ObserverFrame {
    /// A rotation reveal (opening or closing).
    Reveal(Reveal),
    /// A periodic or on-demand remaining-time update.
    RemainingTime(RemainingTime),
}

/// Envelope for observer→server `WebSocket` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ClientFrame {
    /// Request an immediate remaining-time push to this observer only.
    StatusRequest(StatusRequest),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveal_roundtrip() {
        let reveal = Reveal {
            candidates: vec![String::from("Alba"), String::from("Corvin")],
            winner: String::from("Alba"),
            is_beginning: true,
        };
        let json = serde_json::to_string(&ObserverFrame::Reveal(reveal.clone())).ok();
        assert!(json.is_some());
        let frame: Result<ObserverFrame, _> =
            serde_json::from_str(json.as_deref().unwrap_or(""));
        assert_eq!(frame.ok(), Some(ObserverFrame::Reveal(reveal)));
    }

    #[test]
    fn frames_are_tagged_by_type() {
        let frame = ObserverFrame::RemainingTime(RemainingTime::INACTIVE);
        let json = serde_json::to_string(&frame).unwrap_or_default();
        assert!(json.contains("\"type\":\"remaining_time\""));
        assert!(json.contains("\"active\":false"));
    }

    #[test]
    fn status_request_parses_from_tagged_frame() {
        let parsed: Result<ClientFrame, _> =
            serde_json::from_str(r#"{"type":"status_request"}"#);
        assert_eq!(parsed.ok(), Some(ClientFrame::StatusRequest(StatusRequest {})));
    }

    #[test]
    fn inactive_constant_is_zeroed() {
        assert_eq!(RemainingTime::INACTIVE.days, 0);
        assert_eq!(RemainingTime::INACTIVE.hours, 0);
        assert_eq!(RemainingTime::INACTIVE.minutes, 0);
        assert!(!RemainingTime::INACTIVE.active);
    }
}
