//! User administration handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::{Capability, User};
use crate::services::user::{CreateUserInput, UpdateUserInput};
use crate::services::UserService;
use crate::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<User>>, AppError> {
    user.require(Capability::ManageUsers)?;

    let user_service = UserService::new(state.db.clone());
    let users = user_service.list().await?;

    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    user.require(Capability::ManageUsers)?;

    let user_service = UserService::new(state.db.clone());
    let found = user_service.get(id).await?;

    Ok(Json(found))
}

pub async fn create_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<User>), AppError> {
    user.require(Capability::ManageUsers)?;

    let user_service = UserService::new(state.db.clone());
    let created = user_service.create(&user, input).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a user; deactivation or a role change ends their live sessions
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> Result<Json<User>, AppError> {
    user.require(Capability::ManageUsers)?;

    let user_service = UserService::new(state.db.clone());
    let updated = user_service.update(&user, &state.sessions, id, input).await?;

    Ok(Json(updated))
}

pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    user.require(Capability::ManageUsers)?;

    let user_service = UserService::new(state.db.clone());
    user_service.delete(&user, &state.sessions, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
