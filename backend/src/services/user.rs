//! User management service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{AuditCategory, AuditEvent, Role, User};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::auth::hash_password;
use crate::services::{AuditService, SessionRegistry};

/// User service
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
    audit: AuditService,
}

/// User row including the password hash
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn role(&self) -> AppResult<Role> {
        self.role
            .parse::<Role>()
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    pub fn into_user(self) -> AppResult<User> {
        let role = self.role()?;
        Ok(User {
            id: self.id,
            username: self.username,
            email: self.email,
            role,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

pub(crate) const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, is_active, created_at";

/// Input for creating a user
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role: Role,
}

/// Input for updating a user; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserInput {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(db: PgPool) -> Self {
        let audit = AuditService::new(db.clone());
        Self { db, audit }
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username"
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    pub async fn get(&self, id: Uuid) -> AppResult<User> {
        self.find_row(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?
            .into_user()
    }

    pub(crate) async fn find_row(&self, id: Uuid) -> AppResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row)
    }

    async fn ensure_username_free(&self, username: &str) -> AppResult<()> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)",
        )
        .bind(username)
        .fetch_one(&self.db)
        .await?;

        if taken {
            return Err(AppError::DuplicateEntry("username".to_string()));
        }
        Ok(())
    }

    /// Insert a user without an audit entry (used by bootstrap)
    pub(crate) async fn insert(&self, input: &CreateUserInput) -> AppResult<User> {
        shared::validate_username(&input.username)
            .map_err(|msg| AppError::ValidationError(msg.to_string()))?;
        self.ensure_username_free(&input.username).await?;
        let password_hash = hash_password(&input.password)?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&input.username)
        .bind(&input.email)
        .bind(&password_hash)
        .bind(input.role.as_str())
        .fetch_one(&self.db)
        .await?;

        row.into_user()
    }

    pub async fn create(&self, actor: &AuthUser, input: CreateUserInput) -> AppResult<User> {
        input.validate()?;
        let user = self.insert(&input).await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User created");
        self.audit.record(AuditEvent::new(
            actor.user_id,
            actor.username.clone(),
            AuditCategory::Create,
            "Create user",
            format!("User {} created with role {}", user.username, user.role),
        ));

        Ok(user)
    }

    pub async fn update(
        &self,
        actor: &AuthUser,
        sessions: &SessionRegistry,
        id: Uuid,
        input: UpdateUserInput,
    ) -> AppResult<User> {
        input.validate()?;
        let existing = self.get(id).await?;

        if id == actor.user_id && (input.is_active == Some(false) || input.role.is_some_and(|r| r != existing.role)) {
            return Err(AppError::Conflict {
                resource: "user".to_string(),
                message: "You cannot deactivate your own account or change your own role".to_string(),
                message_es: "No puede desactivar su propia cuenta ni cambiar su propio rol".to_string(),
            });
        }

        let password_hash = input.password.as_deref().map(hash_password).transpose()?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                role = COALESCE($4, role),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&input.email)
        .bind(&password_hash)
        .bind(input.role.map(|r| r.as_str()))
        .bind(input.is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;
        let user = row.into_user()?;

        // Role or status changes take effect at the next login.
        if !user.is_active || user.role != existing.role {
            let ended = sessions.end_sessions_for_user(user.id);
            tracing::info!(user_id = %user.id, ended, "Ended sessions after account change");
        }

        self.audit.record(AuditEvent::new(
            actor.user_id,
            actor.username.clone(),
            AuditCategory::Update,
            "Update user",
            format!("User {} updated", user.username),
        ));

        Ok(user)
    }

    /// Hard delete, refused for the caller's own account and for users who
    /// recorded movements
    pub async fn delete(&self, actor: &AuthUser, sessions: &SessionRegistry, id: Uuid) -> AppResult<()> {
        if id == actor.user_id {
            return Err(AppError::Conflict {
                resource: "user".to_string(),
                message: "You cannot delete your own account".to_string(),
                message_es: "No puede eliminar su propia cuenta".to_string(),
            });
        }

        let user = self.get(id).await?;

        let referenced = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM movements WHERE user_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        if referenced {
            return Err(AppError::referenced("user"));
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        sessions.end_sessions_for_user(id);

        self.audit.record(AuditEvent::new(
            actor.user_id,
            actor.username.clone(),
            AuditCategory::Delete,
            "Delete user",
            format!("User {} deleted", user.username),
        ));

        Ok(())
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}
