//! In-process Pragya API double for client tests.
//!
//! Binds an axum router to `127.0.0.1:0` and records every request it sees.

use crate::types::{CredentialPair, SessionUser};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const STUDENT_EMAIL: &str = "asha@pragya.in";
pub const STUDENT_PASSWORD: &str = "correct-horse";
const LOCKED_EMAIL: &str = "locked@pragya.in";

pub fn student() -> SessionUser {
    let mut profile = Map::new();
    profile.insert("studentProfile".to_string(), json!({ "id": "sp1" }));
    SessionUser {
        id: "u1".to_string(),
        email: STUDENT_EMAIL.to_string(),
        role: "STUDENT".to_string(),
        profile,
    }
}

#[derive(Debug, Clone)]
struct Recorded {
    path: String,
    authorization: Option<String>,
}

#[derive(Default)]
struct MockState {
    accepted_access: Option<String>,
    reject_all: bool,
    renewals: HashMap<String, CredentialPair>,
    garble_refresh: bool,
    fail_logout: bool,
    logout_requires_auth: bool,
    on_refresh: Option<Box<dyn Fn() + Send>>,
    me_role: Option<String>,
    requests: Vec<Recorded>,
    refresh_bodies: Vec<String>,
    logout_bodies: Vec<Option<String>>,
}

type Shared = Arc<Mutex<MockState>>;

pub struct MockApi {
    pub base_url: String,
    state: Shared,
}

impl MockApi {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));

        let app = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route("/auth/refresh", post(refresh))
            .route("/auth/logout", post(logout))
            .route("/auth/me", get(me))
            .route("/jobs", get(list_jobs).post(create_job))
            .route("/jobs/{id}", delete(delete_job))
            .route("/public/careers", get(public_careers))
            .route("/files/report", get(report))
            .route("/broken", get(broken))
            .layer(middleware::from_fn_with_state(state.clone(), record))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        let mut guard = self.state.lock().unwrap();
        f(&mut guard)
    }

    pub fn accept_access_token(&self, token: &str) {
        self.with_state(|s| s.accepted_access = Some(token.to_string()));
    }

    pub fn reject_all_access_tokens(&self) {
        self.with_state(|s| s.reject_all = true);
    }

    pub fn issue_on_refresh(&self, refresh_token: &str, pair: CredentialPair) {
        self.with_state(|s| {
            s.renewals.insert(refresh_token.to_string(), pair);
        });
    }

    pub fn garble_refresh_responses(&self) {
        self.with_state(|s| s.garble_refresh = true);
    }

    pub fn fail_logout(&self) {
        self.with_state(|s| s.fail_logout = true);
    }

    pub fn require_auth_on_logout(&self) {
        self.with_state(|s| s.logout_requires_auth = true);
    }

    /// Runs `hook` inside the refresh handler, before the response is sent.
    pub fn on_refresh(&self, hook: impl Fn() + Send + 'static) {
        self.with_state(|s| s.on_refresh = Some(Box::new(hook)));
    }

    pub fn set_me_role(&self, role: &str) {
        self.with_state(|s| s.me_role = Some(role.to_string()));
    }

    pub fn calls(&self, path: &str) -> usize {
        self.with_state(|s| s.requests.iter().filter(|r| r.path == path).count())
    }

    pub fn authorizations(&self, path: &str) -> Vec<Option<String>> {
        self.with_state(|s| {
            s.requests
                .iter()
                .filter(|r| r.path == path)
                .map(|r| r.authorization.clone())
                .collect()
        })
    }

    pub fn refresh_bodies(&self) -> Vec<String> {
        self.with_state(|s| s.refresh_bodies.clone())
    }

    pub fn logout_bodies(&self) -> Vec<Option<String>> {
        self.with_state(|s| s.logout_bodies.clone())
    }
}

async fn record(State(state): State<Shared>, req: Request, next: Next) -> Response {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    state.lock().unwrap().requests.push(Recorded {
        path: req.uri().path().to_string(),
        authorization,
    });
    next.run(req).await
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "statusCode": 401, "message": message, "error": "Unauthorized" })),
    )
        .into_response()
}

fn is_authorized(state: &Shared, headers: &HeaderMap) -> bool {
    let guard = state.lock().unwrap();
    if guard.reject_all {
        return false;
    }
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    matches!((presented, guard.accepted_access.as_deref()), (Some(p), Some(a)) if p == a)
}

fn auth_body(user: &SessionUser) -> Value {
    json!({ "user": user, "accessToken": "a1", "refreshToken": "r1" })
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    if body["email"] == STUDENT_EMAIL && body["password"] == STUDENT_PASSWORD {
        state.lock().unwrap().accepted_access = Some("a1".to_string());
        (StatusCode::OK, Json(auth_body(&student()))).into_response()
    } else {
        unauthorized("Invalid credentials")
    }
}

async fn register(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if email == STUDENT_EMAIL {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "statusCode": 409, "message": "Email already registered" })),
        )
            .into_response();
    }
    if email == LOCKED_EMAIL {
        return unauthorized("Registration is closed for this account");
    }

    let mut profile = body.as_object().cloned().unwrap_or_default();
    for key in ["email", "password", "role"] {
        profile.remove(key);
    }
    let user = SessionUser {
        id: "u2".to_string(),
        email,
        role: body["role"].as_str().unwrap_or("STUDENT").to_string(),
        profile,
    };
    state.lock().unwrap().accepted_access = Some("a1".to_string());
    (StatusCode::CREATED, Json(auth_body(&user))).into_response()
}

async fn refresh(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let token = body["refreshToken"].as_str().unwrap_or_default().to_string();
    let mut guard = state.lock().unwrap();
    guard.refresh_bodies.push(token.clone());
    let Some(pair) = guard.renewals.get(&token).cloned() else {
        return unauthorized("Invalid refresh token");
    };
    if let Some(hook) = guard.on_refresh.as_ref() {
        hook();
    }
    if guard.garble_refresh {
        return (StatusCode::OK, "not json").into_response();
    }
    (StatusCode::OK, Json(json!(pair))).into_response()
}

async fn logout(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let requires_auth = {
        let mut guard = state.lock().unwrap();
        guard
            .logout_bodies
            .push(body["refreshToken"].as_str().map(|s| s.to_string()));
        guard.logout_requires_auth
    };
    if requires_auth && !is_authorized(&state, &headers) {
        return unauthorized("Unauthorized");
    }
    let guard = state.lock().unwrap();
    if guard.fail_logout {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    (StatusCode::OK, Json(json!({ "message": "Logged out successfully" }))).into_response()
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !is_authorized(&state, &headers) {
        return unauthorized("Unauthorized");
    }
    let mut user = student();
    if let Some(role) = state.lock().unwrap().me_role.clone() {
        user.role = role;
    }
    Json(user).into_response()
}

async fn list_jobs(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !is_authorized(&state, &headers) {
        return unauthorized("Unauthorized");
    }
    Json(json!([{ "id": "j1", "title": "Data Analyst" }])).into_response()
}

async fn create_job(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !is_authorized(&state, &headers) {
        return unauthorized("Unauthorized");
    }
    let mut job = body;
    job["id"] = json!("j2");
    (StatusCode::CREATED, Json(job)).into_response()
}

async fn delete_job(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !is_authorized(&state, &headers) {
        return unauthorized("Unauthorized");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn public_careers() -> Response {
    Json(json!([{ "id": "c1", "name": "Software Engineer" }])).into_response()
}

async fn report(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !is_authorized(&state, &headers) {
        return unauthorized("Unauthorized");
    }
    (
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"career-report.pdf\"",
            ),
        ],
        b"%PDF-1.4 report".to_vec(),
    )
        .into_response()
}

async fn broken() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
}
