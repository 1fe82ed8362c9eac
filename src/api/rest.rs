use axum::extract::State;
use axum::http::header::{HOST, USER_AGENT};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use crate::domain::auth::{LoginForm, LoginState};
use crate::domain::dashboard_service::DashboardService;
use crate::domain::snapshot::EnvironmentSnapshot;
use crate::domain::types::{ClientSignals, DaemonHealth};

/// Shared application state for all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<DashboardService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/snapshot", get(snapshot).post(collect))
        .route("/api/v1/login", post(login))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<DaemonHealth> {
    Json(state.dashboard.health().await)
}

/// Serve the current snapshot. Never triggers collection.
/// Returns 503 until the first cycle has completed.
async fn snapshot(
    State(state): State<AppState>,
) -> Result<Json<EnvironmentSnapshot>, (StatusCode, String)> {
    state
        .dashboard
        .current()
        .await
        .map(|s| Json(s.as_ref().clone()))
        .ok_or_else(|| {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "no snapshot collected yet".to_string(),
            )
        })
}

/// Run a collection cycle from the posted signals and return the result.
async fn collect(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(signals): Json<ClientSignals>,
) -> Json<EnvironmentSnapshot> {
    let signals = with_request_context(signals, &headers);
    Json(state.dashboard.collect(signals).await.as_ref().clone())
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
    #[serde(default)]
    attempts: u32,
}

async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Json<LoginState> {
    let prior = LoginState {
        attempts: req.attempts,
        ..LoginState::default()
    };
    let form = LoginForm {
        username: req.username,
        password: req.password,
    };
    Json(state.dashboard.login(&prior, &form))
}

/// Fill gaps in posted signals from the request itself: the `User-Agent`
/// header and the host the page was served from.
pub fn with_request_context(mut signals: ClientSignals, headers: &HeaderMap) -> ClientSignals {
    if signals.user_agent.is_none() {
        signals.user_agent = header_str(headers, USER_AGENT.as_str());
    }
    if signals.origin_host.is_none() {
        signals.origin_host = header_str(headers, HOST.as_str()).map(|h| host_without_port(&h));
    }
    signals
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn host_without_port(host: &str) -> String {
    if let Some(rest) = host.strip_prefix('[') {
        // bracketed IPv6 literal
        return match rest.split_once(']') {
            Some((addr, _)) => format!("[{}]", addr),
            None => host.to_string(),
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name.to_string(),
        _ => host.to_string(),
    }
}
