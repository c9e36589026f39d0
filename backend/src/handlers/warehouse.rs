//! Warehouse handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::{Capability, Warehouse};
use crate::services::warehouse::{CreateWarehouseInput, UpdateWarehouseInput};
use crate::services::WarehouseService;
use crate::AppState;

/// Every signed-in role needs the warehouse list for movement forms and
/// report filters
pub async fn list_warehouses(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> Result<Json<Vec<Warehouse>>, AppError> {
    let warehouse_service = WarehouseService::new(state.db.clone());
    let warehouses = warehouse_service.list().await?;

    Ok(Json(warehouses))
}

pub async fn get_warehouse(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Warehouse>, AppError> {
    let warehouse_service = WarehouseService::new(state.db.clone());
    let warehouse = warehouse_service.get(id).await?;

    Ok(Json(warehouse))
}

pub async fn create_warehouse(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateWarehouseInput>,
) -> Result<(StatusCode, Json<Warehouse>), AppError> {
    user.require(Capability::ManageWarehouses)?;

    let warehouse_service = WarehouseService::new(state.db.clone());
    let warehouse = warehouse_service.create(&user, input).await?;

    Ok((StatusCode::CREATED, Json(warehouse)))
}

pub async fn update_warehouse(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateWarehouseInput>,
) -> Result<Json<Warehouse>, AppError> {
    user.require(Capability::ManageWarehouses)?;

    let warehouse_service = WarehouseService::new(state.db.clone());
    let warehouse = warehouse_service.update(&user, id, input).await?;

    Ok(Json(warehouse))
}

pub async fn delete_warehouse(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    user.require(Capability::ManageWarehouses)?;

    let warehouse_service = WarehouseService::new(state.db.clone());
    warehouse_service.delete(&user, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
