//! Movement service: the stock ledger write path
//!
//! Recording a movement locks the medicine row, applies the ledger in
//! memory, writes the new stock map and inserts the movement line in one
//! transaction. Two concurrent exits against the same medicine serialize on
//! the row lock instead of both reading the same stock.

use chrono::{DateTime, Local, NaiveDate, Utc};
use shared::reports::MovementFilter;
use shared::{
    apply_with_policy, validate_movement_targets, validate_new_movement, AuditCategory, AuditEvent,
    DateRange, EntryJustification, ExitPolicy, Medicine, Movement, MovementDetails, MovementType,
    NewMovement, Warehouse,
};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::medicine::{MedicineRow, MEDICINE_COLUMNS};
use crate::services::warehouse::{WarehouseRow, WAREHOUSE_COLUMNS};
use crate::services::AuditService;

/// Movement service
#[derive(Clone)]
pub struct MovementService {
    db: PgPool,
    audit: AuditService,
    exit_policy: ExitPolicy,
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    medicine_id: Uuid,
    medicine_name: String,
    warehouse_id: Uuid,
    warehouse_name: String,
    movement_type: String,
    quantity: i64,
    clamped_quantity: i64,
    movement_date: NaiveDate,
    user_id: Uuid,
    user_name: String,
    justification: Option<String>,
    invoice_number: Option<String>,
    patient_name: Option<String>,
    patient_document: Option<String>,
    prescription_number: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for Movement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| AppError::Internal(format!("Movement {} has invalid {}", row.id, what));

        let movement_type = row
            .movement_type
            .parse::<MovementType>()
            .map_err(|_| corrupt("type"))?;
        let details = match movement_type {
            MovementType::Entry => MovementDetails::Entry {
                justification: row
                    .justification
                    .as_deref()
                    .ok_or_else(|| corrupt("justification"))?
                    .parse::<EntryJustification>()
                    .map_err(|_| corrupt("justification"))?,
                invoice_number: row.invoice_number.clone(),
            },
            MovementType::Exit => MovementDetails::Exit {
                patient_name: row.patient_name.clone().unwrap_or_default(),
                patient_document: row.patient_document.clone().unwrap_or_default(),
                prescription_number: row.prescription_number.clone(),
            },
        };

        Ok(Movement {
            id: row.id,
            medicine_id: row.medicine_id,
            medicine_name: row.medicine_name.clone(),
            warehouse_id: row.warehouse_id,
            warehouse_name: row.warehouse_name.clone(),
            quantity: u32::try_from(row.quantity).map_err(|_| corrupt("quantity"))?,
            clamped_quantity: u32::try_from(row.clamped_quantity).map_err(|_| corrupt("clamped quantity"))?,
            date: row.movement_date,
            user_id: row.user_id,
            user_name: row.user_name.clone(),
            details,
            created_at: row.created_at,
        })
    }
}

const MOVEMENT_COLUMNS: &str = r#"id, medicine_id, medicine_name, warehouse_id, warehouse_name,
    movement_type, quantity, clamped_quantity, movement_date, user_id, user_name,
    justification, invoice_number, patient_name, patient_document, prescription_number,
    created_at"#;

fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Audit details line for a recorded movement
pub fn describe_movement(movement: &Movement) -> String {
    let mut details = match &movement.details {
        MovementDetails::Entry {
            justification,
            invoice_number,
        } => {
            let mut line = format!(
                "Entry of {} units of {} into {} ({})",
                movement.quantity, movement.medicine_name, movement.warehouse_name, justification
            );
            if let Some(invoice) = invoice_number {
                line.push_str(&format!(", invoice {invoice}"));
            }
            line
        }
        MovementDetails::Exit {
            patient_name,
            patient_document,
            prescription_number,
        } => {
            let mut line = format!(
                "Exit of {} units of {} from {} for patient {} ({})",
                movement.quantity,
                movement.medicine_name,
                movement.warehouse_name,
                patient_name,
                patient_document
            );
            if let Some(prescription) = prescription_number {
                line.push_str(&format!(", prescription {prescription}"));
            }
            line
        }
    };
    if movement.clamped_quantity > 0 {
        details.push_str(&format!(
            "; {} units were not on hand and stock was floored at zero",
            movement.clamped_quantity
        ));
    }
    details
}

impl MovementService {
    /// Create a new MovementService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        let audit = AuditService::new(db.clone());
        Self {
            db,
            audit,
            exit_policy: config.ledger.exit_policy,
        }
    }

    /// Record a movement and update the medicine's stock atomically
    pub async fn record(&self, actor: &AuthUser, input: NewMovement) -> AppResult<Movement> {
        let today = Local::now().date_naive();
        let date = validate_new_movement(&input, today)?;
        let movement_type = input.details.movement_type();

        let mut tx = self.db.begin().await?;

        let medicine: Medicine = sqlx::query_as::<_, MedicineRow>(&format!(
            "SELECT {MEDICINE_COLUMNS} FROM medicines WHERE id = $1 FOR UPDATE"
        ))
        .bind(input.medicine_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Medicine".to_string()))?
        .try_into()?;

        let warehouse: Warehouse = sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses WHERE id = $1 FOR SHARE"
        ))
        .bind(input.warehouse_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?
        .into();

        validate_movement_targets(&medicine, &warehouse)?;

        let applied = apply_with_policy(
            medicine,
            warehouse.id,
            movement_type,
            input.quantity,
            self.exit_policy,
        )?;
        let medicine = applied.medicine;

        sqlx::query(
            r#"
            UPDATE medicines
            SET warehouse_stock = $2, current_stock = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(medicine.id)
        .bind(Json(&medicine.warehouse_stock))
        .bind(i64::from(medicine.current_stock))
        .execute(&mut *tx)
        .await?;

        let (justification, invoice_number, patient_name, patient_document, prescription_number) =
            match &input.details {
                MovementDetails::Entry {
                    justification,
                    invoice_number,
                } => (
                    Some(justification.as_str()),
                    trimmed(invoice_number.as_deref()),
                    None,
                    None,
                    None,
                ),
                MovementDetails::Exit {
                    patient_name,
                    patient_document,
                    prescription_number,
                } => (
                    None,
                    None,
                    trimmed(Some(patient_name.as_str())),
                    trimmed(Some(patient_document.as_str())),
                    trimmed(prescription_number.as_deref()),
                ),
            };

        let row = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            INSERT INTO movements (
                medicine_id, medicine_name, warehouse_id, warehouse_name, movement_type,
                quantity, clamped_quantity, movement_date, user_id, user_name,
                justification, invoice_number, patient_name, patient_document, prescription_number
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {MOVEMENT_COLUMNS}
            "#
        ))
        .bind(medicine.id)
        .bind(&medicine.name)
        .bind(warehouse.id)
        .bind(&warehouse.name)
        .bind(movement_type.as_str())
        .bind(i64::from(input.quantity))
        .bind(i64::from(applied.clamped_quantity))
        .bind(date)
        .bind(actor.user_id)
        .bind(&actor.username)
        .bind(justification)
        .bind(invoice_number)
        .bind(patient_name)
        .bind(patient_document)
        .bind(prescription_number)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let movement = Movement::try_from(row)?;
        if movement.clamped_quantity > 0 {
            tracing::warn!(
                movement_id = %movement.id,
                medicine_id = %movement.medicine_id,
                clamped = movement.clamped_quantity,
                "Exit exceeded stock on hand and was clamped"
            );
        }
        tracing::info!(
            movement_id = %movement.id,
            movement_type = %movement_type,
            quantity = movement.quantity,
            stock = medicine.current_stock,
            "Movement recorded"
        );

        self.audit.record(AuditEvent::new(
            actor.user_id,
            actor.username.clone(),
            AuditCategory::Movement,
            match movement_type {
                MovementType::Entry => "Record entry",
                MovementType::Exit => "Record exit",
            },
            describe_movement(&movement),
        ));

        Ok(movement)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Movement> {
        let row = sqlx::query_as::<_, MovementRow>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Movement".to_string()))?;

        row.try_into()
    }

    /// Movements matching `filter`, newest first
    pub async fn list(&self, filter: &MovementFilter) -> AppResult<Vec<Movement>> {
        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS} FROM movements
            WHERE ($1::uuid IS NULL OR warehouse_id = $1)
              AND ($2::text IS NULL OR movement_type = $2)
              AND ($3::date IS NULL OR movement_date = $3)
            ORDER BY movement_date DESC, created_at DESC
            "#
        ))
        .bind(filter.warehouse_id)
        .bind(filter.movement_type.map(|t| t.as_str()))
        .bind(filter.date)
        .fetch_all(&self.db)
        .await?;

        let movements = rows
            .into_iter()
            .map(Movement::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(filter.apply(movements))
    }

    /// Full ledger, used by reconstruction and reconciliation
    pub async fn list_all(&self) -> AppResult<Vec<Movement>> {
        self.list(&MovementFilter::default()).await
    }

    /// Movements dated inside `range`
    pub async fn list_in_range(&self, range: DateRange) -> AppResult<Vec<Movement>> {
        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS} FROM movements
            WHERE movement_date BETWEEN $1 AND $2
            ORDER BY movement_date DESC, created_at DESC
            "#
        ))
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Movement::try_from).collect()
    }
}
