//! Shared application state for the Observer API server.
//!
//! [`AppState`] holds the broadcast channel that fans wire frames out to
//! every connected `WebSocket` observer, the latest [`RotationSnapshot`]
//! served by REST endpoints and on-demand status replies, and the command
//! queue through which admin endpoints reach the scheduler. Reads are
//! served from the snapshot so the observer never blocks the scheduler
//! loop.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use scepter_core::commands::CommandQueue;
use scepter_core::host::HostControl;
use scepter_core::scheduler::RotationSnapshot;
use scepter_types::ObserverFrame;
use tokio::sync::{RwLock, broadcast};

/// Capacity of the broadcast channel for observer frames.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest frame.
const BROADCAST_CAPACITY: usize = 256;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast sender for observer wire frames.
    pub tx: broadcast::Sender<ObserverFrame>,

    /// The latest scheduler snapshot (updated each poll by the engine).
    pub snapshot: Arc<RwLock<RotationSnapshot>>,

    /// Command queue into the scheduler tick.
    pub commands: Arc<CommandQueue>,

    /// Host control surface (clock manipulation, roster changes), when
    /// the host provides one.
    pub host: Option<Arc<dyn HostControl>>,

    /// Wall-clock time the service started, for the status endpoint.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create application state with an idle snapshot and no host
    /// control surface.
    pub fn new(commands: Arc<CommandQueue>) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            snapshot: Arc::new(RwLock::new(RotationSnapshot::default())),
            commands,
            host: None,
            started_at: Utc::now(),
        }
    }

    /// Create application state with a host control surface attached.
    pub fn with_host(commands: Arc<CommandQueue>, host: Arc<dyn HostControl>) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            snapshot: Arc::new(RwLock::new(RotationSnapshot::default())),
            commands,
            host: Some(host),
            started_at: Utc::now(),
        }
    }

    /// Subscribe to the observer frame broadcast.
    pub fn subscribe(&self) -> broadcast::Receiver<ObserverFrame> {
        self.tx.subscribe()
    }

    /// Publish a frame to all connected observers.
    ///
    /// Returns the number of receivers that got the frame. Zero simply
    /// means nobody is connected, which is not an error.
    pub fn broadcast(&self, frame: &ObserverFrame) -> usize {
        self.tx.send(frame.clone()).unwrap_or(0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use scepter_types::RemainingTime;

    use super::*;

    #[test]
    fn broadcast_without_subscribers_is_zero() {
        let state = AppState::new(Arc::new(CommandQueue::new()));
        let frame = ObserverFrame::RemainingTime(RemainingTime::INACTIVE);
        assert_eq!(state.broadcast(&frame), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_broadcast_frames() {
        let state = AppState::new(Arc::new(CommandQueue::new()));
        let mut rx = state.subscribe();

        let frame = ObserverFrame::RemainingTime(RemainingTime::INACTIVE);
        assert_eq!(state.broadcast(&frame), 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received, frame);
    }

    #[tokio::test]
    async fn initial_snapshot_is_idle() {
        let state = AppState::new(Arc::new(CommandQueue::new()));
        let snapshot = state.snapshot.read().await;
        assert!(!snapshot.running);
        assert!(snapshot.current_holder.is_none());
        assert!(!snapshot.remaining.active);
    }
}
