//! Admin REST API handlers for rotation control.
//!
//! These endpoints are the operator command surface. Each one maps 1:1
//! to a scheduler operation, and none of them mutates scheduler state
//! directly: commands are enqueued on the [`CommandQueue`] and applied
//! on the scheduler's own tick. Handlers answer from the latest snapshot
//! so obviously-invalid requests (stopping an idle cycle, reconfiguring
//! a running one) get immediate feedback; the scheduler re-validates on
//! drain, so a race can still never corrupt state.
//!
//! This surface carries operator authority. Deployments are expected to
//! gate it (reverse proxy, network policy) the same way the rest of the
//! admin plane is gated.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/admin/start` | Begin a rotation now |
//! | `POST` | `/api/admin/stop` | Stop the cycle, revoke the privilege |
//! | `GET` | `/api/admin/status` | Current rotation status |
//! | `POST` | `/api/admin/duration` | Set tenure length in days |
//! | `POST` | `/api/admin/autostart` | Enable/disable scheduled rotations |
//! | `POST` | `/api/admin/advance-time` | Jump the world clock forward |
//! | `POST` | `/api/admin/set-time` | Set the world clock absolutely |
//! | `POST` | `/api/admin/participants` | Add a participant |
//! | `DELETE` | `/api/admin/participants/{id}` | Remove a participant |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use uuid::Uuid;

use scepter_core::commands::SchedulerCommand;
use scepter_core::host::HostControl;
use scepter_core::scheduler::CyclePhase;
use scepter_types::{ParticipantId, RemainingTime};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/admin/duration`.
#[derive(Debug, serde::Deserialize)]
pub struct SetDurationRequest {
    /// New tenure length in simulated days (minimum 1).
    pub days: u64,
}

/// Request body for `POST /api/admin/autostart`.
#[derive(Debug, serde::Deserialize)]
pub struct SetAutostartRequest {
    /// Whether scheduled rotations are honored.
    pub enabled: bool,
}

/// Request body for the clock manipulation endpoints.
#[derive(Debug, serde::Deserialize)]
pub struct ClockRequest {
    /// Tick count to advance by, or the absolute tick value to set.
    pub ticks: u64,
}

/// Request body for `POST /api/admin/participants`.
#[derive(Debug, serde::Deserialize)]
pub struct JoinRequest {
    /// Display name for the new participant.
    pub name: String,
}

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct AdminResponse {
    /// Whether the operation was accepted.
    ok: bool,
    /// Human-readable message.
    message: String,
}

/// Response body for `GET /api/admin/status`.
#[derive(Debug, serde::Serialize)]
pub struct AdminStatus {
    /// Current lifecycle phase.
    pub phase: CyclePhase,
    /// Whether a cycle is running.
    pub running: bool,
    /// Display name of the sitting holder, if any.
    pub current_holder: Option<String>,
    /// Days remaining in the cycle (quantized).
    pub days_remaining: u32,
    /// Full quantized remaining time.
    pub remaining: RemainingTime,
    /// Configured tenure length in days.
    pub duration_days: u64,
    /// Whether scheduled rotations are enabled.
    pub autostart_enabled: bool,
    /// Current simulated day index.
    pub current_day: u64,
    /// Current absolute world-clock tick.
    pub now_ticks: u64,
    /// Number of participants present.
    pub participants_online: u32,
    /// ISO 8601 timestamp of when the service started.
    pub started_at: String,
}

// ---------------------------------------------------------------------------
// POST /api/admin/start
// ---------------------------------------------------------------------------

/// Begin a rotation on the next scheduler tick.
///
/// The request is marshaled onto the scheduler's own execution context;
/// it never runs on the handler task.
pub async fn start(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    if snapshot.running {
        return Err(ObserverError::Conflict(
            "rotation cycle is already running".to_owned(),
        ));
    }
    if snapshot.grant_pending {
        return Err(ObserverError::Conflict(
            "a selection is already in progress".to_owned(),
        ));
    }
    if snapshot.participants_online == 0 {
        return Err(ObserverError::Conflict(
            "no participants are present".to_owned(),
        ));
    }
    drop(snapshot);

    state.commands.push(SchedulerCommand::Start).await;

    Ok(Json(AdminResponse {
        ok: true,
        message: "Rotation start requested".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/admin/stop
// ---------------------------------------------------------------------------

/// Stop the running cycle (or cancel an in-flight selection) and revoke
/// the privilege.
pub async fn stop(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    if !snapshot.running && !snapshot.grant_pending {
        return Err(ObserverError::Conflict(
            "no rotation cycle is currently running".to_owned(),
        ));
    }
    drop(snapshot);

    state.commands.push(SchedulerCommand::Stop).await;

    Ok(Json(AdminResponse {
        ok: true,
        message: "Rotation stop requested; the privilege will be revoked".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/admin/status
// ---------------------------------------------------------------------------

/// Report the current rotation status from the latest snapshot.
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;

    let status = AdminStatus {
        phase: snapshot.phase,
        running: snapshot.running,
        current_holder: snapshot
            .current_holder
            .as_ref()
            .map(|holder| holder.name.clone()),
        days_remaining: snapshot.remaining.days,
        remaining: snapshot.remaining,
        duration_days: snapshot.duration_days,
        autostart_enabled: snapshot.autostart_enabled,
        current_day: snapshot.current_day,
        now_ticks: snapshot.now_ticks,
        participants_online: snapshot.participants_online,
        started_at: state.started_at.to_rfc3339(),
    };

    Ok(Json(status))
}

// ---------------------------------------------------------------------------
// POST /api/admin/duration
// ---------------------------------------------------------------------------

/// Change the tenure length. Rejected while a cycle is running —
/// duration only changes between cycles.
pub async fn set_duration(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetDurationRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    if body.days == 0 {
        return Err(ObserverError::InvalidRequest(
            "duration must be at least 1 day".to_owned(),
        ));
    }

    let snapshot = state.snapshot.read().await;
    if snapshot.running {
        return Err(ObserverError::Conflict(
            "duration cannot change while a cycle is running".to_owned(),
        ));
    }
    drop(snapshot);

    state
        .commands
        .push(SchedulerCommand::SetDuration { days: body.days })
        .await;

    Ok(Json(AdminResponse {
        ok: true,
        message: format!("Tenure length set to {} days", body.days),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/admin/autostart
// ---------------------------------------------------------------------------

/// Enable or disable scheduled rotations. A pure setting with no other
/// side effect.
pub async fn set_autostart(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetAutostartRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    state
        .commands
        .push(SchedulerCommand::SetAutostart {
            enabled: body.enabled,
        })
        .await;

    Ok(Json(AdminResponse {
        ok: true,
        message: format!(
            "Autostart {}",
            if body.enabled { "enabled" } else { "disabled" }
        ),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/admin/advance-time
// ---------------------------------------------------------------------------

/// Jump the world clock forward by `ticks`.
///
/// Large jumps exercise the scheduler's anomaly path: expiry and trigger
/// conditions are re-evaluated on the next poll instead of waiting for
/// the coarse bookkeeping interval.
pub async fn advance_time(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ClockRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let host = require_host(&state)?;
    let now_ticks = host.advance_time(body.ticks);

    Ok(Json(serde_json::json!({
        "ok": true,
        "now_ticks": now_ticks,
    })))
}

// ---------------------------------------------------------------------------
// POST /api/admin/set-time
// ---------------------------------------------------------------------------

/// Set the world clock to an absolute tick value. Rewinds are allowed —
/// the clock is not monotonic.
pub async fn set_time(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ClockRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let host = require_host(&state)?;
    let now_ticks = host.set_time(body.ticks);

    Ok(Json(serde_json::json!({
        "ok": true,
        "now_ticks": now_ticks,
    })))
}

// ---------------------------------------------------------------------------
// POST /api/admin/participants
// ---------------------------------------------------------------------------

/// Add a participant to the roster.
pub async fn join(
    State(state): State<Arc<AppState>>,
    Json(body): Json<JoinRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    if body.name.trim().is_empty() {
        return Err(ObserverError::InvalidRequest(
            "participant name must not be empty".to_owned(),
        ));
    }

    let host = require_host(&state)?;
    let participant = host.join(body.name.trim());

    Ok(Json(participant))
}

// ---------------------------------------------------------------------------
// DELETE /api/admin/participants/{id}
// ---------------------------------------------------------------------------

/// Remove a participant from the roster.
pub async fn leave(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let uuid = Uuid::parse_str(&id).map_err(|_| ObserverError::InvalidUuid(id.clone()))?;

    let host = require_host(&state)?;
    if !host.leave(ParticipantId::from(uuid)) {
        return Err(ObserverError::NotFound(format!(
            "no participant with id {uuid}"
        )));
    }

    Ok(Json(AdminResponse {
        ok: true,
        message: "Participant removed".to_owned(),
    }))
}

/// Fetch the host control surface or fail with an internal error.
fn require_host(state: &Arc<AppState>) -> Result<&Arc<dyn HostControl>, ObserverError> {
    state
        .host
        .as_ref()
        .ok_or_else(|| ObserverError::Internal("host control not available".to_owned()))
}
