//! `WebSocket` handler for real-time rotation streaming.
//!
//! Observers connect to `GET /ws/rotation` and receive JSON-encoded
//! [`ObserverFrame`]s: reveals when a rotation begins or ends, and
//! remaining-time updates on the adaptive periodic cadence. The handler
//! uses a [`broadcast::Receiver`](tokio::sync::broadcast::Receiver) so
//! all connected observers see the same stream.
//!
//! An observer may send a `status_request` frame at any time and gets an
//! immediate `remaining_time` reply on its own socket only — late
//! joiners use this so their display is never stale until the next
//! periodic push.
//!
//! If an observer falls behind, lagged frames are silently skipped and
//! it resumes from the most recent one.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::{debug, warn};

use scepter_types::{ClientFrame, ObserverFrame};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming rotation frames.
///
/// # Route
///
/// `GET /ws/rotation`
pub async fn ws_rotation(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: forward broadcast frames and answer
/// on-demand status requests.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("Observer connected");

    let mut rx = state.subscribe();

    loop {
        tokio::select! {
            // Fan-out from the scheduler loop.
            result = rx.recv() => {
                match result {
                    Ok(frame) => {
                        if send_frame(&mut socket, &frame).await.is_err() {
                            debug!("Observer disconnected (send failed)");
                            return;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!(skipped = n, "Observer lagged, skipping ahead");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            // Inbound traffic: status requests, pings, close.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(()) = handle_client_text(&mut socket, &state, text.as_str()).await {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Observer disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let pong = Message::Pong(data);
                        if socket.send(pong).await.is_err() {
                            debug!("Observer disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {
                        // Ignore binary frames from observers.
                    }
                }
            }
        }
    }
}

/// Parse an inbound text frame and answer status requests with an
/// immediate targeted remaining-time push.
///
/// Returns `Err(())` when the socket is gone.
async fn handle_client_text(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
    text: &str,
) -> Result<(), ()> {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::StatusRequest(_)) => {
            let remaining = {
                let snapshot = state.snapshot.read().await;
                snapshot.remaining
            };
            debug!(?remaining, "Answering on-demand status request");
            let reply = ObserverFrame::RemainingTime(remaining);
            if send_frame(socket, &reply).await.is_err() {
                debug!("Observer disconnected (status reply failed)");
                return Err(());
            }
            Ok(())
        }
        Err(e) => {
            warn!(%e, "Ignoring unparseable observer frame");
            Ok(())
        }
    }
}

/// Serialize and send one frame, reporting failure as `Err(())`.
async fn send_frame(socket: &mut WebSocket, frame: &ObserverFrame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize observer frame: {e}");
            return Ok(());
        }
    };
    let msg: Message = Message::Text(json.into());
    socket.send(msg).await.map_err(|_| ())
}
