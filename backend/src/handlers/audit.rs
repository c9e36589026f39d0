//! Audit log handlers

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use shared::reports::AuditFilter;
use shared::Pagination;

use super::reporting::{csv_response, wants_csv};
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::{AuditCategory, Capability};
use crate::services::{AuditService, ReportingService};
use crate::AppState;

#[derive(Deserialize)]
pub struct AuditQuery {
    pub search: Option<String>,
    pub category: Option<AuditCategory>,
    pub date: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub format: Option<String>,
}

/// Audit log, newest first. JSON responses are paginated; the CSV export
/// carries every matching entry.
pub async fn list_audit_log(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<AuditQuery>,
) -> Result<Response, AppError> {
    user.require(Capability::ViewAuditLog)?;

    let filter = AuditFilter {
        search: query.search,
        category: query.category,
        date: query.date,
    };

    let audit_service = AuditService::new(state.db.clone());
    let entries = audit_service.list(&filter).await?;

    if wants_csv(query.format.as_deref()) {
        let csv = ReportingService::audit_csv(&entries)?;
        return Ok(csv_response("audit_log.csv", csv));
    }

    let defaults = Pagination::default();
    let pagination = Pagination {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page).min(500),
    };

    Ok(Json(pagination.paginate(entries)).into_response())
}
