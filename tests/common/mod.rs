#![allow(dead_code)]

//! In-process stub of the external backend.
//!
//! The product under test is a client, so the integration tests stand up a
//! small axum server with programmable responses plus a `/ws` push endpoint,
//! and run the real client against it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::broadcast;

use aquawatch::config::{RealtimeConfig, SessionConfig};

pub struct StubBackend {
    pub base_url: String,
    pub state: Arc<StubState>,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct StubState {
    pub login_status: Mutex<u16>,
    pub login_body: Mutex<Value>,
    pub me_status: Mutex<u16>,
    pub me_body: Mutex<Value>,
    pub me_delay_ms: AtomicU64,
    pub me_calls: AtomicUsize,
    pub logout_status: Mutex<u16>,
    pub logout_calls: AtomicUsize,
    pub last_authorization: Mutex<Option<String>>,

    pub users: Mutex<Vec<Value>>,
    pub next_user_id: AtomicUsize,
    pub reset_calls: AtomicUsize,

    pub sensor_status: Mutex<u16>,
    pub sensor_body: Mutex<Value>,
    pub history_body: Mutex<Value>,
    pub ai_body: Mutex<Value>,
    pub predict_status: Mutex<u16>,
    pub predict_body: Mutex<Value>,
    pub override_status: Mutex<u16>,
    pub override_body: Mutex<Value>,
    pub notifications_body: Mutex<Value>,

    pub push: broadcast::Sender<String>,
}

impl StubState {
    fn new() -> Self {
        let (push, _) = broadcast::channel(16);
        Self {
            login_status: Mutex::new(200),
            login_body: Mutex::new(default_user_body()),
            // Logged out until a test says otherwise
            me_status: Mutex::new(401),
            me_body: Mutex::new(json!({})),
            me_delay_ms: AtomicU64::new(0),
            me_calls: AtomicUsize::new(0),
            logout_status: Mutex::new(200),
            logout_calls: AtomicUsize::new(0),
            last_authorization: Mutex::new(None),
            users: Mutex::new(Vec::new()),
            next_user_id: AtomicUsize::new(1),
            reset_calls: AtomicUsize::new(0),
            sensor_status: Mutex::new(200),
            sensor_body: Mutex::new(json!({
                "timestamp": "2025-01-01T00:00:00Z",
                "tds": 120.0,
                "turbidity": 3.4,
                "ph": 7.1
            })),
            history_body: Mutex::new(json!({ "status": "success", "data": [] })),
            ai_body: Mutex::new(json!({ "status": "no_data" })),
            predict_status: Mutex::new(200),
            predict_body: Mutex::new(default_assessment()),
            override_status: Mutex::new(200),
            override_body: Mutex::new(json!({ "success": true, "message": "Override sent" })),
            notifications_body: Mutex::new(json!([])),
            push,
        }
    }

    pub fn set_login(&self, status: u16, body: Value) {
        *self.login_status.lock().unwrap() = status;
        *self.login_body.lock().unwrap() = body;
    }

    pub fn set_me(&self, status: u16, body: Value) {
        *self.me_status.lock().unwrap() = status;
        *self.me_body.lock().unwrap() = body;
    }

    pub fn set_logout_status(&self, status: u16) {
        *self.logout_status.lock().unwrap() = status;
    }

    /// Send one raw frame to every connected push client.
    pub fn push_frame(&self, frame: &str) {
        let _ = self.push.send(frame.to_string());
    }

    /// Drop every open push connection server-side.
    pub fn close_push_connections(&self) {
        let _ = self.push.send(CLOSE_SENTINEL.to_string());
    }
}

pub fn default_user_body() -> Value {
    json!({
        "user": { "id": 1, "name": "A", "email": "a@x.com", "role": "admin" },
        "token": "tok-1"
    })
}

pub fn default_assessment() -> Value {
    json!({
        "mpn_value": 240.0,
        "status": "Waspada",
        "severity": "medium",
        "reasons": ["Coliform rising"],
        "recommendations": ["Boil before drinking"],
        "alternative_use": ["Irrigation"]
    })
}

pub async fn spawn_backend() -> Result<StubBackend> {
    let state = Arc::new(StubState::new());
    let app = router(state.clone());

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let base_url = format!("http://127.0.0.1:{}", port);

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub backend");
    });

    let backend = StubBackend { base_url, state, handle };
    backend.wait_ready(Duration::from_secs(5)).await?;
    Ok(backend)
}

impl StubBackend {
    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        anyhow::bail!("stub backend did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

/// Session config pointed at a unique signal file with test-friendly timings.
pub fn session_config() -> SessionConfig {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    SessionConfig {
        poll_interval_secs: 3600,
        reconcile_delay_ms: 200,
        signal_path: std::env::temp_dir()
            .join(format!("aquawatch-it-{}-{}", std::process::id(), nanos)),
        signal_poll_ms: 25,
    }
}

pub fn realtime_config() -> RealtimeConfig {
    RealtimeConfig { enabled: true, reconnect_attempts: 3, reconnect_delay_ms: 100 }
}

/// Poll `cond` until it holds or the timeout passes.
pub async fn wait_until<F: FnMut() -> bool>(mut cond: F, timeout_ms: u64) -> bool {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}

// ----------------------------------------------------------------------
// Routes
// ----------------------------------------------------------------------

fn router(state: Arc<StubState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/:id", patch(update_user).delete(delete_user))
        .route("/api/users/:id/password", patch(reset_password))
        .route("/api/sensor", get(sensor_latest))
        .route("/api/sensor/coliform/history", get(sensor_history))
        .route("/api/sensor/ai-detection", get(ai_detection))
        .route("/api/predict", post(predict))
        .route("/override", post(manual_override))
        .route("/notifications", get(notifications))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

fn status_of(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn login(State(state): State<Arc<StubState>>, Json(_body): Json<Value>) -> impl IntoResponse {
    let status = *state.login_status.lock().unwrap();
    let body = state.login_body.lock().unwrap().clone();
    (status_of(status), Json(body))
}

async fn me(State(state): State<Arc<StubState>>, headers: HeaderMap) -> impl IntoResponse {
    state.me_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_authorization.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let delay = state.me_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let status = *state.me_status.lock().unwrap();
    let body = state.me_body.lock().unwrap().clone();
    (status_of(status), Json(body))
}

async fn logout(State(state): State<Arc<StubState>>) -> impl IntoResponse {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    let status = *state.logout_status.lock().unwrap();
    (status_of(status), Json(json!({})))
}

async fn list_users(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let users = state.users.lock().unwrap();
    let q = params.get("q").map(|s| s.to_lowercase());
    let role = params.get("role");

    let filtered: Vec<Value> = users
        .iter()
        .filter(|user| {
            let matches_q = q.as_deref().map_or(true, |q| {
                let name = user["name"].as_str().unwrap_or_default().to_lowercase();
                let email = user["email"].as_str().unwrap_or_default().to_lowercase();
                name.contains(q) || email.contains(q)
            });
            let matches_role =
                role.map_or(true, |role| user["role"].as_str() == Some(role.as_str()));
            matches_q && matches_role
        })
        .cloned()
        .collect();

    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let limit: usize = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(10);
    let start = (page.saturating_sub(1)) * limit;
    let page_items: Vec<Value> = filtered.into_iter().skip(start).take(limit).collect();

    Json(Value::Array(page_items))
}

async fn create_user(
    State(state): State<Arc<StubState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let mut users = state.users.lock().unwrap();
    let email = body["email"].as_str().unwrap_or_default().to_string();

    if users.iter().any(|user| user["email"].as_str() == Some(email.as_str())) {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Email already exists" })),
        );
    }

    let id = state.next_user_id.fetch_add(1, Ordering::SeqCst);
    let user = json!({
        "id": format!("u-{}", id),
        "name": body["name"],
        "email": email,
        "role": body["role"],
    });
    users.push(user.clone());
    (StatusCode::CREATED, Json(user))
}

async fn update_user(
    State(state): State<Arc<StubState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let mut users = state.users.lock().unwrap();
    let Some(user) = users.iter_mut().find(|user| user["id"].as_str() == Some(id.as_str())) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "User not found" })));
    };

    for field in ["name", "email", "role"] {
        if let Some(value) = body.get(field) {
            if !value.is_null() {
                user[field] = value.clone();
            }
        }
    }
    (StatusCode::OK, Json(user.clone()))
}

async fn reset_password(
    State(state): State<Arc<StubState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let users = state.users.lock().unwrap();
    if !users.iter().any(|user| user["id"].as_str() == Some(id.as_str())) {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "User not found" })));
    }

    let new_password = body["newPassword"].as_str().unwrap_or_default();
    if new_password.len() < 8 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Password too short" })),
        );
    }

    state.reset_calls.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, Json(json!({ "success": true })))
}

async fn delete_user(
    State(state): State<Arc<StubState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let mut users = state.users.lock().unwrap();
    let before = users.len();
    users.retain(|user| user["id"].as_str() != Some(id.as_str()));

    if users.len() == before {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "User not found" })));
    }
    (StatusCode::OK, Json(json!({ "success": true })))
}

async fn sensor_latest(State(state): State<Arc<StubState>>) -> impl IntoResponse {
    let status = *state.sensor_status.lock().unwrap();
    let body = state.sensor_body.lock().unwrap().clone();
    (status_of(status), Json(body))
}

async fn sensor_history(State(state): State<Arc<StubState>>) -> impl IntoResponse {
    let body = state.history_body.lock().unwrap().clone();
    Json(body)
}

async fn ai_detection(State(state): State<Arc<StubState>>) -> impl IntoResponse {
    let body = state.ai_body.lock().unwrap().clone();
    Json(body)
}

async fn predict(State(state): State<Arc<StubState>>, Json(_body): Json<Value>) -> impl IntoResponse {
    let status = *state.predict_status.lock().unwrap();
    let body = state.predict_body.lock().unwrap().clone();
    (status_of(status), Json(body))
}

async fn manual_override(State(state): State<Arc<StubState>>) -> impl IntoResponse {
    let status = *state.override_status.lock().unwrap();
    let body = state.override_body.lock().unwrap().clone();
    (status_of(status), Json(body))
}

async fn notifications(State(state): State<Arc<StubState>>) -> impl IntoResponse {
    let body = state.notifications_body.lock().unwrap().clone();
    Json(body)
}

async fn ws_handler(
    State(state): State<Arc<StubState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| push_loop(socket, state))
}

const CLOSE_SENTINEL: &str = "__close__";

async fn push_loop(mut socket: WebSocket, state: Arc<StubState>) {
    let mut frames = state.push.subscribe();
    while let Ok(frame) = frames.recv().await {
        if frame == CLOSE_SENTINEL {
            break;
        }
        if socket.send(Message::Text(frame)).await.is_err() {
            break;
        }
    }
}
