//! Audit recorder: append-only trail of user actions

use chrono::{DateTime, Utc};
use shared::reports::AuditFilter;
use shared::{AuditCategory, AuditEvent, AuditLogEntry};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Audit service
#[derive(Clone)]
pub struct AuditService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct AuditRow {
    id: Uuid,
    user_id: Uuid,
    user_name: String,
    action: String,
    details: String,
    category: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditLogEntry {
    type Error = AppError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(AuditLogEntry {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            action: row.action,
            details: row.details,
            category: row
                .category
                .parse::<AuditCategory>()
                .map_err(|e| AppError::Internal(e.to_string()))?,
            timestamp: row.created_at,
        })
    }
}

impl AuditService {
    /// Create a new AuditService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append one entry and wait for the write
    pub async fn append(&self, event: &AuditEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (user_id, user_name, action, details, category)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.user_id)
        .bind(&event.user_name)
        .bind(&event.action)
        .bind(&event.details)
        .bind(event.category.as_str())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Fire-and-forget append. A failed write is logged and never reaches
    /// the caller, whose mutation has already been committed.
    pub fn record(&self, event: AuditEvent) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.append(&event).await {
                tracing::warn!(
                    category = %event.category,
                    action = %event.action,
                    "Failed to write audit entry: {}",
                    e
                );
            }
        });
    }

    /// Entries matching `filter`, newest first
    pub async fn list(&self, filter: &AuditFilter) -> AppResult<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, user_id, user_name, action, details, category, created_at
            FROM audit_log
            WHERE ($1::text IS NULL OR category = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.category.map(|c| c.as_str()))
        .fetch_all(&self.db)
        .await?;

        let entries = rows
            .into_iter()
            .map(AuditLogEntry::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(filter.apply(entries))
    }
}
