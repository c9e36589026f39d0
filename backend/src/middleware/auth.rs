//! Authentication middleware
//!
//! JWT authentication, live-session check and capability-based access control

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use shared::{can_access, Capability, Role};
use uuid::Uuid;

use crate::error::{AppError, AppResult, ErrorResponse};
use crate::services::auth::decode_token;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    /// Check if the user's role grants a capability
    pub fn can(&self, capability: Capability) -> bool {
        can_access(self.role, capability)
    }

    /// Permission guard for use in handlers
    pub fn require(&self, capability: Capability) -> AppResult<()> {
        if self.can(capability) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.user_id,
                role = %self.role,
                %capability,
                "Access denied"
            );
            Err(AppError::InsufficientPermissions)
        }
    }

    /// Check if the role grants any of the capabilities
    pub fn can_any(&self, capabilities: &[Capability]) -> bool {
        capabilities.iter().any(|c| self.can(*c))
    }
}

/// Validates the bearer token, checks the session is still live and
/// registers the request as session activity
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::InvalidToken)?;

    let claims = decode_token(token, &state.config.jwt.secret)?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;
    let session_id = Uuid::parse_str(&claims.sid).map_err(|_| AppError::InvalidToken)?;

    // Logged out, expired by inactivity, or ended by an account change
    if !state.sessions.touch(session_id) {
        return Err(AppError::SessionExpired);
    }

    request.extensions_mut().insert(AuthUser {
        user_id,
        session_id,
        username: claims.username,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: crate::error::ErrorDetail {
                        code: "UNAUTHORIZED".to_string(),
                        message_en: "Authentication required".to_string(),
                        message_es: "Debe iniciar sesión".to_string(),
                        field: None,
                    },
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}
