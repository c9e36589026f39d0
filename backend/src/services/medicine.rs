//! Medicine catalogue service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{AuditCategory, AuditEvent, Medicine, WarehouseStock};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::AuditService;

/// Medicine service
#[derive(Clone)]
pub struct MedicineService {
    db: PgPool,
    audit: AuditService,
}

#[derive(Debug, FromRow)]
pub struct MedicineRow {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub low_stock_threshold: i32,
    pub warehouse_stock: Json<WarehouseStock>,
    pub current_stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<MedicineRow> for Medicine {
    type Error = AppError;

    fn try_from(row: MedicineRow) -> Result<Self, Self::Error> {
        let out_of_range = |field: &str| AppError::Internal(format!("{field} out of range for medicine {}", row.id));
        Ok(Medicine {
            id: row.id,
            name: row.name.clone(),
            is_active: row.is_active,
            low_stock_threshold: u32::try_from(row.low_stock_threshold)
                .map_err(|_| out_of_range("low_stock_threshold"))?,
            current_stock: u32::try_from(row.current_stock)
                .map_err(|_| out_of_range("current_stock"))?,
            warehouse_stock: row.warehouse_stock.0.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(crate) const MEDICINE_COLUMNS: &str =
    "id, name, is_active, low_stock_threshold, warehouse_stock, current_stock, created_at, updated_at";

/// Input for cataloguing a medicine. New medicines start with no stock;
/// stock is only ever added through movements.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMedicineInput {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    #[validate(range(min = 1, message = "Low stock threshold must be at least 1"))]
    pub low_stock_threshold: u32,
}

/// Catalogue edit. Stock fields are deliberately absent.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateMedicineInput {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 1, message = "Low stock threshold must be at least 1"))]
    pub low_stock_threshold: Option<u32>,
    pub is_active: Option<bool>,
}

fn threshold_param(threshold: u32) -> AppResult<i32> {
    i32::try_from(threshold).map_err(|_| AppError::Validation {
        field: "low_stock_threshold".to_string(),
        message: "Low stock threshold is too large".to_string(),
        message_es: "El umbral de stock bajo es demasiado grande".to_string(),
    })
}

impl MedicineService {
    /// Create a new MedicineService instance
    pub fn new(db: PgPool) -> Self {
        let audit = AuditService::new(db.clone());
        Self { db, audit }
    }

    pub async fn list(&self) -> AppResult<Vec<Medicine>> {
        let rows = sqlx::query_as::<_, MedicineRow>(&format!(
            "SELECT {MEDICINE_COLUMNS} FROM medicines ORDER BY name"
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Medicine::try_from).collect()
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Medicine> {
        let row = sqlx::query_as::<_, MedicineRow>(&format!(
            "SELECT {MEDICINE_COLUMNS} FROM medicines WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Medicine".to_string()))?;

        row.try_into()
    }

    async fn ensure_name_free(&self, name: &str, except: Option<Uuid>) -> AppResult<()> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM medicines WHERE LOWER(name) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2))",
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

    pub async fn create(&self, actor: &AuthUser, input: CreateMedicineInput) -> AppResult<Medicine> {
        input.validate()?;
        let name = input.name.trim().to_string();
        shared::validate_name(&name).map_err(|m| AppError::ValidationError(m.to_string()))?;
        self.ensure_name_free(&name, None).await?;

        let row = sqlx::query_as::<_, MedicineRow>(&format!(
            r#"
            INSERT INTO medicines (name, low_stock_threshold)
            VALUES ($1, $2)
            RETURNING {MEDICINE_COLUMNS}
            "#
        ))
        .bind(&name)
        .bind(threshold_param(input.low_stock_threshold)?)
        .fetch_one(&self.db)
        .await?;
        let medicine = Medicine::try_from(row)?;

        tracing::info!(medicine_id = %medicine.id, "Medicine created");
        self.audit.record(AuditEvent::new(
            actor.user_id,
            actor.username.clone(),
            AuditCategory::Create,
            "Create medicine",
            format!(
                "Medicine {} created with low stock threshold {}",
                medicine.name, medicine.low_stock_threshold
            ),
        ));

        Ok(medicine)
    }

    pub async fn update(&self, actor: &AuthUser, id: Uuid, input: UpdateMedicineInput) -> AppResult<Medicine> {
        input.validate()?;
        let name = input.name.as_deref().map(str::trim).map(str::to_string);
        if let Some(name) = &name {
            shared::validate_name(name).map_err(|m| AppError::ValidationError(m.to_string()))?;
            self.ensure_name_free(name, Some(id)).await?;
        }
        let threshold = input.low_stock_threshold.map(threshold_param).transpose()?;

        let row = sqlx::query_as::<_, MedicineRow>(&format!(
            r#"
            UPDATE medicines SET
                name = COALESCE($2, name),
                low_stock_threshold = COALESCE($3, low_stock_threshold),
                is_active = COALESCE($4, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {MEDICINE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&name)
        .bind(threshold)
        .bind(input.is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Medicine".to_string()))?;
        let medicine = Medicine::try_from(row)?;

        self.audit.record(AuditEvent::new(
            actor.user_id,
            actor.username.clone(),
            AuditCategory::Update,
            "Update medicine",
            format!("Medicine {} updated", medicine.name),
        ));

        Ok(medicine)
    }

    /// Hard delete, refused once the medicine appears in the ledger
    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> AppResult<()> {
        let medicine = self.get(id).await?;

        let referenced = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM movements WHERE medicine_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        if referenced {
            return Err(AppError::referenced("medicine"));
        }

        sqlx::query("DELETE FROM medicines WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        self.audit.record(AuditEvent::new(
            actor.user_id,
            actor.username.clone(),
            AuditCategory::Delete,
            "Delete medicine",
            format!("Medicine {} deleted", medicine.name),
        ));

        Ok(())
    }
}
