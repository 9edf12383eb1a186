//! Read-only REST endpoint handlers for the Observer server.
//!
//! All handlers read from the latest [`RotationSnapshot`] via the shared
//! [`AppState`]; nothing here can touch scheduler state.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/rotation` | Current rotation snapshot |
//!
//! [`RotationSnapshot`]: scepter_core::scheduler::RotationSnapshot

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::{Html, IntoResponse};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing rotation status and API links.
///
/// This is the placeholder dashboard until a real frontend consumes the
/// `WebSocket` stream and the generated `TypeScript` bindings.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    let phase = format!("{:?}", snapshot.phase);
    let holder = snapshot
        .current_holder
        .as_ref()
        .map_or_else(|| String::from("—"), |h| h.name.clone());
    let days = snapshot.remaining.days;
    let participants = snapshot.participants_online;
    let day = snapshot.current_day;

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Scepter Observer</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #d4a017; }}
        a {{ color: #58a6ff; }}
        .stat {{ margin: 0.25rem 0; }}
    </style>
</head>
<body>
    <h1>Scepter Observer</h1>
    <div class="stat">Phase: {phase}</div>
    <div class="stat">Holder: {holder}</div>
    <div class="stat">Days remaining: {days}</div>
    <div class="stat">Day: {day}</div>
    <div class="stat">Participants: {participants}</div>
    <ul>
        <li><a href="/api/rotation">Rotation snapshot</a></li>
        <li><a href="/api/admin/status">Admin status</a></li>
        <li><code>/ws/rotation</code> — live frame stream</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/rotation
// ---------------------------------------------------------------------------

/// Return the latest rotation snapshot as JSON.
pub async fn get_rotation(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    Ok(Json(snapshot.clone()))
}
