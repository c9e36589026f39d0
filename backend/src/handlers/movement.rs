//! Movement handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::reports::MovementFilter;
use uuid::Uuid;

use super::reporting::{csv_response, wants_csv};
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::{Capability, EntryJustification, Movement, MovementType, NewMovement};
use crate::services::{MovementService, ReportingService};
use crate::AppState;

#[derive(Deserialize)]
pub struct MovementQuery {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub movement_type: Option<MovementType>,
    pub justification: Option<EntryJustification>,
    pub date: Option<NaiveDate>,
    pub warehouse_id: Option<Uuid>,
    pub format: Option<String>,
}

impl MovementQuery {
    fn filter(&self) -> MovementFilter {
        MovementFilter {
            search: self.search.clone(),
            movement_type: self.movement_type,
            justification: self.justification,
            date: self.date,
            warehouse_id: self.warehouse_id,
        }
    }
}

/// List movements, newest first
pub async fn list_movements(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<MovementQuery>,
) -> Result<Response, AppError> {
    if !user.can_any(&[Capability::ManageMovements, Capability::ViewReports]) {
        return Err(AppError::InsufficientPermissions);
    }

    let movement_service = MovementService::new(state.db.clone(), &state.config);
    let movements = movement_service.list(&query.filter()).await?;

    if wants_csv(query.format.as_deref()) {
        let csv = ReportingService::movements_csv(&movements)?;
        Ok(csv_response("movements.csv", csv))
    } else {
        Ok(Json(movements).into_response())
    }
}

pub async fn get_movement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Movement>, AppError> {
    if !user.can_any(&[Capability::ManageMovements, Capability::ViewReports]) {
        return Err(AppError::InsufficientPermissions);
    }

    let movement_service = MovementService::new(state.db.clone(), &state.config);
    let movement = movement_service.get(id).await?;

    Ok(Json(movement))
}

/// Record an entry or exit and update stock
pub async fn create_movement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<NewMovement>,
) -> Result<(StatusCode, Json<Movement>), AppError> {
    user.require(Capability::ManageMovements)?;

    let movement_service = MovementService::new(state.db.clone(), &state.config);
    let movement = movement_service.record(&user, input).await?;

    Ok((StatusCode::CREATED, Json(movement)))
}
