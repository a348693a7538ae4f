//! In-process fake of the fitness backend for integration tests.
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//!
//! #[tokio::test]
//! async fn something() {
//!     let backend = FakeBackend::spawn().await;
//!     let (client, navigator) = client_for(&backend, MemoryStorage::new());
//!     // ...
//! }
//! ```

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use fitness_client::{
    AccessToken, ApiClient, ClientConfig, MemoryStorage, Navigator, RefreshToken, Session,
    Storage, UserProfile,
};
use serde_json::{Value, json};

pub const EMAIL: &str = "a@b.com";
pub const PASSWORD: &str = "pw";

/// How the fake answers `POST /auth/token/refresh/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Issue `A{n+1}` for the expected refresh token.
    Issue,
    /// Issue a new access token and rotate the refresh token.
    Rotate,
    /// Reject every refresh with 401.
    Reject,
}

pub struct BackendState {
    valid_access: Mutex<String>,
    valid_refresh: Mutex<String>,
    issued: AtomicUsize,
    refresh_mode: Mutex<RefreshMode>,
    refresh_delay: Mutex<Duration>,
    logout_status: Mutex<StatusCode>,
    pub refresh_calls: AtomicUsize,
    pub login_calls: AtomicUsize,
    pub logout_bodies: Mutex<Vec<Value>>,
    pub seen_authorization: Mutex<Vec<Option<String>>>,
    pub refresh_authorization: Mutex<Vec<Option<String>>>,
}

impl BackendState {
    fn new() -> Self {
        Self {
            valid_access: Mutex::new("A1".into()),
            valid_refresh: Mutex::new("R1".into()),
            issued: AtomicUsize::new(1),
            refresh_mode: Mutex::new(RefreshMode::Issue),
            refresh_delay: Mutex::new(Duration::ZERO),
            logout_status: Mutex::new(StatusCode::OK),
            refresh_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            logout_bodies: Mutex::new(Vec::new()),
            seen_authorization: Mutex::new(Vec::new()),
            refresh_authorization: Mutex::new(Vec::new()),
        }
    }

    /// Make the current access token invalid, as if it had expired.
    pub fn expire_access_token(&self) {
        self.valid_access.lock().unwrap().push_str("-expired");
    }

    pub fn valid_access(&self) -> String {
        self.valid_access.lock().unwrap().clone()
    }

    pub fn valid_refresh(&self) -> String {
        self.valid_refresh.lock().unwrap().clone()
    }

    pub fn set_refresh_mode(&self, mode: RefreshMode) {
        *self.refresh_mode.lock().unwrap() = mode;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap() = delay;
    }

    pub fn set_logout_status(&self, status: StatusCode) {
        *self.logout_status.lock().unwrap() = status;
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn seen_authorization(&self) -> Vec<Option<String>> {
        self.seen_authorization.lock().unwrap().clone()
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let header = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        self.seen_authorization.lock().unwrap().push(header.clone());
        header.as_deref() == Some(format!("Bearer {}", self.valid_access()).as_str())
    }
}

type Shared = Arc<BackendState>;

pub struct FakeBackend {
    pub base_url: String,
    pub state: Shared,
}

impl FakeBackend {
    /// Serve the fake on a random local port under the `/api` prefix.
    pub async fn spawn() -> Self {
        let state = Arc::new(BackendState::new());
        let app = Router::new().nest("/api", routes()).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind random port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake backend crashed");
        });

        Self {
            base_url: format!("http://{addr}/api"),
            state,
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url.parse().expect("valid base url"))
    }
}

/// Navigator that records every redirect.
#[derive(Clone, Default)]
pub struct RecordingNavigator {
    visited: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visited.lock().unwrap().push(path.to_owned());
    }
}

pub fn client_for<S: Storage>(
    backend: &FakeBackend,
    storage: S,
) -> (ApiClient<S>, RecordingNavigator) {
    let navigator = RecordingNavigator::default();
    let client = ApiClient::new(backend.config(), storage)
        .expect("client")
        .with_navigator(navigator.clone());
    (client, navigator)
}

/// Store a session directly, bypassing login.
pub async fn seed_session<S: Storage>(client: &ApiClient<S>, access: &str, refresh: &str) {
    client
        .session()
        .save(&Session {
            access_token: AccessToken::new(access),
            refresh_token: RefreshToken::new(refresh),
            user: UserProfile::default().with_id(1).with_email(EMAIL),
        })
        .await
        .expect("seed session");
}

// ── Routes ─────────────────────────────────────────────────────────

fn routes() -> Router<Shared> {
    Router::new()
        .route("/auth/login/", post(login))
        .route("/auth/token/refresh/", post(refresh))
        .route("/auth/logout/", post(logout))
        .route("/auth/profile/", get(profile))
        .route("/steps/daily/today/", get(steps_today))
        .route("/steps/daily/quick_log/", post(echo_body))
        .route("/steps/daily/summary/", get(echo_query))
        .route("/steps/goals/", post(echo_body))
        .route("/steps/streaks/current/", get(streak))
        .route("/workouts/workouts/summary/", get(echo_query))
        .route("/workouts/workouts/{id}/complete/", post(complete_workout))
        .route("/workouts/workouts/{id}/", delete(no_content))
        .route("/meals/meals/", post(reject_meal))
        .route("/meals/meals/today/", get(server_error))
        .route("/meals/meals/by_date/", get(echo_query))
        .route("/always-unauthorized/", get(always_unauthorized))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Given token not valid for any token type"})),
    )
        .into_response()
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    state.login_calls.fetch_add(1, Ordering::SeqCst);
    match (body["email"].as_str(), body["password"].as_str()) {
        (Some(EMAIL), Some(PASSWORD)) => Json(json!({
            "user": {"id": 1, "email": EMAIL, "username": "abby"},
            "tokens": {"access": state.valid_access(), "refresh": state.valid_refresh()},
        }))
        .into_response(),
        (Some("silent@b.com"), _) => (StatusCode::BAD_REQUEST, Json(json!({}))).into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid credentials"})),
        )
            .into_response(),
    }
}

async fn refresh(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    state.refresh_authorization.lock().unwrap().push(
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    );

    let delay = *state.refresh_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mode = *state.refresh_mode.lock().unwrap();
    if mode == RefreshMode::Reject || body["refresh"].as_str() != Some(state.valid_refresh().as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Token is invalid or expired", "code": "token_not_valid"})),
        )
            .into_response();
    }

    let n = state.issued.fetch_add(1, Ordering::SeqCst) + 1;
    let access = format!("A{n}");
    *state.valid_access.lock().unwrap() = access.clone();

    if mode == RefreshMode::Rotate {
        let refresh = format!("R{n}");
        *state.valid_refresh.lock().unwrap() = refresh.clone();
        Json(json!({"access": access, "refresh": refresh})).into_response()
    } else {
        Json(json!({"access": access})).into_response()
    }
}

async fn logout(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    state.logout_bodies.lock().unwrap().push(body);
    let status = *state.logout_status.lock().unwrap();
    (status, Json(json!({"message": "Logged out"}))).into_response()
}

async fn profile(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({"id": 1, "email": EMAIL, "username": "abby", "height_cm": 170})).into_response()
}

async fn steps_today(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({"id": 5, "steps": 4200, "goal_achieved": false})).into_response()
}

async fn streak(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({"current_streak": 3, "longest_streak": 9, "total_days_goal_met": 40})).into_response()
}

async fn echo_body(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn echo_query(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<std::collections::BTreeMap<String, String>>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(json!(query)).into_response()
}

async fn complete_workout(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({"id": id, "status": "completed", "details": body})).into_response()
}

async fn no_content(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn reject_meal(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"calories": ["Ensure this value is greater than or equal to 0."]})),
    )
        .into_response()
}

async fn server_error(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

async fn always_unauthorized(State(state): State<Shared>, headers: HeaderMap) -> Response {
    state.authorized(&headers);
    unauthorized()
}
