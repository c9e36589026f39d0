//! Warehouse service

use serde::Deserialize;
use shared::{AuditCategory, AuditEvent, Warehouse};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::AuditService;

/// Warehouse service
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
    audit: AuditService,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct WarehouseRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    is_active: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<WarehouseRow> for Warehouse {
    fn from(row: WarehouseRow) -> Self {
        Warehouse {
            id: row.id,
            name: row.name,
            description: row.description,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWarehouseInput {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateWarehouseInput {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

pub(crate) const WAREHOUSE_COLUMNS: &str = "id, name, description, is_active, created_at";

impl WarehouseService {
    /// Create a new WarehouseService instance
    pub fn new(db: PgPool) -> Self {
        let audit = AuditService::new(db.clone());
        Self { db, audit }
    }

    pub async fn list(&self) -> AppResult<Vec<Warehouse>> {
        let rows = sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses ORDER BY created_at, name"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Warehouse::from).collect())
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Warehouse> {
        let row = sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

        Ok(row.into())
    }

    async fn ensure_name_free(&self, name: &str, except: Option<Uuid>) -> AppResult<()> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouses WHERE LOWER(name) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(except)
        .fetch_one(&self.db)
        .await?;

        if taken {
            return Err(AppError::DuplicateEntry("name".to_string()));
        }
        Ok(())
    }

    pub async fn create(&self, actor: &AuthUser, input: CreateWarehouseInput) -> AppResult<Warehouse> {
        input.validate()?;
        let name = input.name.trim().to_string();
        shared::validate_name(&name).map_err(|m| AppError::ValidationError(m.to_string()))?;
        self.ensure_name_free(&name, None).await?;

        let row = sqlx::query_as::<_, WarehouseRow>(&format!(
            "INSERT INTO warehouses (name, description) VALUES ($1, $2) RETURNING {WAREHOUSE_COLUMNS}"
        ))
        .bind(&name)
        .bind(input.description.as_deref().map(str::trim).filter(|d| !d.is_empty()))
        .fetch_one(&self.db)
        .await?;
        let warehouse = Warehouse::from(row);

        tracing::info!(warehouse_id = %warehouse.id, "Warehouse created");
        self.audit.record(AuditEvent::new(
            actor.user_id,
            actor.username.clone(),
            AuditCategory::Create,
            "Create warehouse",
            format!("Warehouse {} created", warehouse.name),
        ));

        Ok(warehouse)
    }

    pub async fn update(&self, actor: &AuthUser, id: Uuid, input: UpdateWarehouseInput) -> AppResult<Warehouse> {
        input.validate()?;
        let name = input.name.as_deref().map(str::trim).map(str::to_string);
        if let Some(name) = &name {
            shared::validate_name(name).map_err(|m| AppError::ValidationError(m.to_string()))?;
            self.ensure_name_free(name, Some(id)).await?;
        }

        let row = sqlx::query_as::<_, WarehouseRow>(&format!(
            r#"
            UPDATE warehouses SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                is_active = COALESCE($4, is_active)
            WHERE id = $1
            RETURNING {WAREHOUSE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&name)
        .bind(&input.description)
        .bind(input.is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;
        let warehouse = Warehouse::from(row);

        self.audit.record(AuditEvent::new(
            actor.user_id,
            actor.username.clone(),
            AuditCategory::Update,
            "Update warehouse",
            format!("Warehouse {} updated", warehouse.name),
        ));

        Ok(warehouse)
    }

    /// Hard delete, refused when movements or stock reference the warehouse
    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> AppResult<()> {
        let warehouse = self.get(id).await?;

        let referenced = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM movements WHERE warehouse_id = $1)
                OR EXISTS(SELECT 1 FROM medicines WHERE warehouse_stock ? $1::text)
            "#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        if referenced {
            return Err(AppError::referenced("warehouse"));
        }

        sqlx::query("DELETE FROM warehouses WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        self.audit.record(AuditEvent::new(
            actor.user_id,
            actor.username.clone(),
            AuditCategory::Delete,
            "Delete warehouse",
            format!("Warehouse {} deleted", warehouse.name),
        ));

        Ok(())
    }
}
