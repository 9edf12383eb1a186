//! Bridge from the scheduler loop to the Observer API state.
//!
//! Frames fan out over the broadcast channel; snapshots replace the one
//! the REST endpoints and on-demand status replies read. The snapshot
//! update uses `try_write` so a slow reader can never stall the
//! scheduler loop — a skipped update is caught up on the next poll.

use std::sync::Arc;

use tracing::debug;

use scepter_core::runner::RotationSink;
use scepter_core::scheduler::RotationSnapshot;
use scepter_observer::AppState;
use scepter_types::ObserverFrame;

/// Sink implementation backed by the observer [`AppState`].
pub struct ObserverBridge {
    state: Arc<AppState>,
}

impl ObserverBridge {
    /// Create a bridge over the given app state.
    pub const fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

impl RotationSink for ObserverBridge {
    fn on_frame(&mut self, frame: &ObserverFrame) {
        let receivers = self.state.broadcast(frame);
        debug!(receivers, "Observer frame broadcast");
    }

    fn on_snapshot(&mut self, snapshot: &RotationSnapshot) {
        if let Ok(mut current) = self.state.snapshot.try_write() {
            *current = snapshot.clone();
        }
    }
}
