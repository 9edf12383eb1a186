//! Integration tests for the Observer API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic and routing
//! without needing a live network connection.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use scepter_core::commands::{CommandQueue, SchedulerCommand};
use scepter_core::host::HostControl;
use scepter_core::scheduler::CyclePhase;
use scepter_types::{Participant, ParticipantId, RemainingTime};
use serde_json::Value;
use tower::ServiceExt;

use scepter_observer::router::build_router;
use scepter_observer::state::AppState;

/// In-memory host control for exercising the clock and roster endpoints.
#[derive(Debug, Default)]
struct FakeHost {
    ticks: AtomicU64,
    roster: Mutex<Vec<Participant>>,
}

impl HostControl for FakeHost {
    fn advance_time(&self, ticks: u64) -> u64 {
        self.ticks
            .fetch_add(ticks, Ordering::AcqRel)
            .saturating_add(ticks)
    }

    fn set_time(&self, ticks: u64) -> u64 {
        self.ticks.store(ticks, Ordering::Release);
        ticks
    }

    fn join(&self, name: &str) -> Participant {
        let participant = Participant::new(name);
        self.roster.lock().unwrap().push(participant.clone());
        participant
    }

    fn leave(&self, id: ParticipantId) -> bool {
        let mut roster = self.roster.lock().unwrap();
        let before = roster.len();
        roster.retain(|p| p.id != id);
        roster.len() < before
    }
}

fn make_state() -> (Arc<AppState>, Arc<CommandQueue>) {
    let queue = Arc::new(CommandQueue::new());
    let state = Arc::new(AppState::with_host(
        Arc::clone(&queue),
        Arc::new(FakeHost::default()),
    ));
    (state, queue)
}

/// Mark the snapshot as an active cycle with the given holder.
async fn make_running(state: &Arc<AppState>, holder: &str, days: u32) {
    let mut snapshot = state.snapshot.write().await;
    snapshot.phase = CyclePhase::Active;
    snapshot.running = true;
    snapshot.current_holder = Some(Participant::new(holder));
    snapshot.participants_online = 3;
    snapshot.remaining = RemainingTime {
        days,
        hours: 0,
        minutes: 0,
        active: true,
    };
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn index_serves_the_status_page() {
    let (state, _queue) = make_state();
    let response = build_router(state)
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Scepter Observer"));
}

#[tokio::test]
async fn rotation_snapshot_starts_idle() {
    let (state, _queue) = make_state();
    let response = build_router(state)
        .oneshot(Request::get("/api/rotation").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["running"], Value::Bool(false));
    assert_eq!(json["phase"], Value::String(String::from("idle")));
    assert!(json["current_holder"].is_null());
}

#[tokio::test]
async fn admin_status_reports_holder_and_days() {
    let (state, _queue) = make_state();
    make_running(&state, "Alba", 7).await;

    let response = build_router(state)
        .oneshot(
            Request::get("/api/admin/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["running"], Value::Bool(true));
    assert_eq!(json["current_holder"], Value::String(String::from("Alba")));
    assert_eq!(json["days_remaining"], Value::from(7));
}

#[tokio::test]
async fn start_with_no_participants_is_a_conflict() {
    let (state, queue) = make_state();
    let response = build_router(state)
        .oneshot(json_request("POST", "/api/admin/start", serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(queue.drain().await.is_empty());
}

#[tokio::test]
async fn start_enqueues_a_marshaled_command() {
    let (state, queue) = make_state();
    {
        let mut snapshot = state.snapshot.write().await;
        snapshot.participants_online = 2;
    }

    let response = build_router(state)
        .oneshot(json_request("POST", "/api/admin/start", serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(queue.drain().await, vec![SchedulerCommand::Start]);
}

#[tokio::test]
async fn start_while_running_is_a_conflict() {
    let (state, queue) = make_state();
    make_running(&state, "Alba", 7).await;

    let response = build_router(state)
        .oneshot(json_request("POST", "/api/admin/start", serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(queue.drain().await.is_empty());
}

#[tokio::test]
async fn stop_while_idle_is_a_conflict() {
    let (state, queue) = make_state();
    let response = build_router(state)
        .oneshot(json_request("POST", "/api/admin/stop", serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(queue.drain().await.is_empty());
}

#[tokio::test]
async fn stop_while_running_enqueues_the_command() {
    let (state, queue) = make_state();
    make_running(&state, "Alba", 7).await;

    let response = build_router(state)
        .oneshot(json_request("POST", "/api/admin/stop", serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(queue.drain().await, vec![SchedulerCommand::Stop]);
}

#[tokio::test]
async fn duration_change_while_running_is_a_conflict() {
    let (state, queue) = make_state();
    make_running(&state, "Alba", 7).await;

    let response = build_router(state)
        .oneshot(json_request(
            "POST",
            "/api/admin/duration",
            serde_json::json!({"days": 3}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(queue.drain().await.is_empty());
}

#[tokio::test]
async fn duration_change_while_idle_is_accepted() {
    let (state, queue) = make_state();
    let response = build_router(state)
        .oneshot(json_request(
            "POST",
            "/api/admin/duration",
            serde_json::json!({"days": 3}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        queue.drain().await,
        vec![SchedulerCommand::SetDuration { days: 3 }]
    );
}

#[tokio::test]
async fn zero_day_duration_is_a_bad_request() {
    let (state, queue) = make_state();
    let response = build_router(state)
        .oneshot(json_request(
            "POST",
            "/api/admin/duration",
            serde_json::json!({"days": 0}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(queue.drain().await.is_empty());
}

#[tokio::test]
async fn autostart_toggle_is_enqueued() {
    let (state, queue) = make_state();
    let response = build_router(state)
        .oneshot(json_request(
            "POST",
            "/api/admin/autostart",
            serde_json::json!({"enabled": false}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        queue.drain().await,
        vec![SchedulerCommand::SetAutostart { enabled: false }]
    );
}

#[tokio::test]
async fn advance_time_moves_the_host_clock() {
    let (state, _queue) = make_state();
    let router = build_router(state);

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/admin/advance-time",
            serde_json::json!({"ticks": 24_000}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["now_ticks"], Value::from(24_000));

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/admin/set-time",
            serde_json::json!({"ticks": 500}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["now_ticks"], Value::from(500));
}

#[tokio::test]
async fn join_and_leave_manage_the_roster() {
    let (state, _queue) = make_state();
    let router = build_router(state);

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/admin/participants",
            serde_json::json!({"name": "Alba"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let id = json["id"].as_str().unwrap().to_owned();

    let path = format!("/api/admin/participants/{id}");
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(&path)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Removing again: gone.
    let response = router
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(&path)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_participant_name_is_a_bad_request() {
    let (state, _queue) = make_state();
    let response = build_router(state)
        .oneshot(json_request(
            "POST",
            "/api/admin/participants",
            serde_json::json!({"name": "   "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_participant_id_is_a_bad_request() {
    let (state, _queue) = make_state();
    let response = build_router(state)
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/admin/participants/not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
