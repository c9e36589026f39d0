//! Authentication service: login, tokens and session restore

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::{AuditCategory, AuditEvent, Capability, Role, User};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::{BootstrapConfig, Config};
use crate::error::{AppError, AppResult};
use crate::services::user::{CreateUserInput, UserRow, USER_COLUMNS};
use crate::services::{AuditService, SessionRegistry, UserService};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    audit: AuditService,
    jwt_secret: String,
    access_token_expiry: i64,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub sid: String, // Server-side session ID
    pub username: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub session_id: Uuid,
    pub user: User,
    pub capabilities: &'static [Capability],
}

/// Hash a password with bcrypt
pub fn hash_password(password: &str) -> AppResult<String> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        let audit = AuditService::new(db.clone());
        Self {
            db,
            audit,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
        }
    }

    /// Authenticate with username and password and open a session
    pub async fn login(
        &self,
        sessions: &std::sync::Arc<SessionRegistry>,
        username: &str,
        password: &str,
    ) -> AppResult<LoginResponse> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        let valid = verify(password, &row.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        if !row.is_active {
            return Err(AppError::AccountDisabled);
        }

        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(row.id)
            .execute(&self.db)
            .await?;

        let user = row.into_user()?;
        let session = sessions.start(user.id, &user.username, user.role);
        let access_token = self.generate_token(&user, session.session_id)?;

        tracing::info!(user_id = %user.id, role = %user.role, "User signed in");
        self.audit.record(AuditEvent::new(
            user.id,
            user.username.clone(),
            AuditCategory::Login,
            "Login",
            format!("User {} signed in", user.username),
        ));

        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
            session_id: session.session_id,
            capabilities: user.role.capabilities(),
            user,
        })
    }

    /// Explicit logout: cancels the session watchdog and records the logout
    pub fn logout(&self, sessions: &SessionRegistry, session_id: Uuid) -> AppResult<()> {
        let session = sessions.end(session_id).ok_or(AppError::SessionExpired)?;

        self.audit.record(AuditEvent::new(
            session.user_id,
            session.username.clone(),
            AuditCategory::Logout,
            "Logout",
            format!("User {} signed out", session.username),
        ));

        Ok(())
    }

    /// Restores a session only while its user still exists and is active
    pub async fn restore(&self, sessions: &SessionRegistry, user_id: Uuid, session_id: Uuid) -> AppResult<User> {
        let user = UserService::new(self.db.clone())
            .find_row(user_id)
            .await?
            .map(UserRow::into_user)
            .transpose()?;

        match user {
            Some(user) if user.is_active => Ok(user),
            _ => {
                sessions.end(session_id);
                tracing::warn!(%user_id, "Session restore refused, user missing or inactive");
                Err(AppError::SessionExpired)
            }
        }
    }

    fn generate_token(&self, user: &User, session_id: Uuid) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            sid: session_id.to_string(),
            username: user.username.clone(),
            role: user.role,
            exp: (now + Duration::seconds(self.access_token_expiry)).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Creates the configured administrator when the user table is empty
    pub async fn bootstrap_admin(&self, bootstrap: &BootstrapConfig) -> AppResult<()> {
        let users = UserService::new(self.db.clone());
        if users.count().await? > 0 {
            return Ok(());
        }

        let Some(password) = bootstrap.admin_password.clone() else {
            tracing::warn!("No users exist and no bootstrap administrator password is configured");
            return Ok(());
        };

        let admin = users
            .insert(&CreateUserInput {
                username: bootstrap.admin_username.clone(),
                email: bootstrap.admin_email.clone(),
                password,
                role: Role::Administrator,
            })
            .await?;
        tracing::info!(user_id = %admin.id, "Bootstrap administrator created");

        Ok(())
    }
}

/// Decode and validate a JWT
pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}
