//! Medicine catalogue handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::{Capability, Medicine};
use crate::services::medicine::{CreateMedicineInput, UpdateMedicineInput};
use crate::services::MedicineService;
use crate::AppState;

/// List all medicines (active and inactive)
pub async fn list_medicines(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Medicine>>, AppError> {
    user.require(Capability::ViewDashboard)?;

    let medicine_service = MedicineService::new(state.db.clone());
    let medicines = medicine_service.list().await?;

    Ok(Json(medicines))
}

pub async fn get_medicine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Medicine>, AppError> {
    user.require(Capability::ViewDashboard)?;

    let medicine_service = MedicineService::new(state.db.clone());
    let medicine = medicine_service.get(id).await?;

    Ok(Json(medicine))
}

pub async fn create_medicine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateMedicineInput>,
) -> Result<(StatusCode, Json<Medicine>), AppError> {
    user.require(Capability::ManageMedicines)?;

    let medicine_service = MedicineService::new(state.db.clone());
    let medicine = medicine_service.create(&user, input).await?;

    Ok((StatusCode::CREATED, Json(medicine)))
}

pub async fn update_medicine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateMedicineInput>,
) -> Result<Json<Medicine>, AppError> {
    user.require(Capability::ManageMedicines)?;

    let medicine_service = MedicineService::new(state.db.clone());
    let medicine = medicine_service.update(&user, id, input).await?;

    Ok(Json(medicine))
}

pub async fn delete_medicine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    user.require(Capability::ManageMedicines)?;

    let medicine_service = MedicineService::new(state.db.clone());
    medicine_service.delete(&user, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
