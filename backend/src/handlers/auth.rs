//! Authentication and session handlers

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::{Capability, Role, User};
use crate::services::auth::LoginResponse;
use crate::services::AuthService;
use crate::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub session_id: uuid::Uuid,
    pub started_at: Option<DateTime<Utc>>,
    pub capabilities: &'static [Capability],
    pub inactivity_timeout_secs: u64,
}

#[derive(Serialize)]
pub struct CapabilitiesResponse {
    pub role: Role,
    pub capabilities: &'static [Capability],
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let response = auth_service
        .login(&state.sessions, body.username.trim(), &body.password)
        .await?;

    Ok(Json(response))
}

/// Logout endpoint handler; cancels the session watchdog
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    auth_service.logout(&state.sessions, user.session_id)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Restores the current session if the user still exists and is active
pub async fn current_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<SessionResponse>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let current = auth_service
        .restore(&state.sessions, user.user_id, user.session_id)
        .await?;

    let started_at = state.sessions.get(user.session_id).map(|s| s.started_at);

    Ok(Json(SessionResponse {
        capabilities: current.role.capabilities(),
        session_id: user.session_id,
        started_at,
        inactivity_timeout_secs: state.config.session.inactivity_timeout_secs,
        user: current,
    }))
}

/// Interaction signal from the client. The auth middleware has already
/// reset the watchdog; this endpoint only exists so idle pages can report
/// pointer, keyboard, scroll and touch activity.
pub async fn activity(CurrentUser(_user): CurrentUser) -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Capabilities granted to the current user's role
pub async fn capabilities(CurrentUser(user): CurrentUser) -> Json<CapabilitiesResponse> {
    Json(CapabilitiesResponse {
        role: user.role,
        capabilities: user.role.capabilities(),
    })
}
