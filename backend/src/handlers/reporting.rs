//! Reporting handlers: dashboard, inventory sheet, period and monthly
//! reports, reconciliation

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::reports::DashboardSummary;
use shared::DateRange;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::Capability;
use crate::services::reporting::ReconciliationReport;
use crate::services::ReportingService;
use crate::AppState;

#[derive(Deserialize)]
pub struct InventoryQuery {
    pub search: Option<String>,
    pub warehouse_id: Option<Uuid>,
    pub format: Option<String>, // "json" or "csv"
}

#[derive(Deserialize)]
pub struct PeriodQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub warehouse_id: Option<Uuid>,
    pub format: Option<String>,
}

#[derive(Deserialize)]
pub struct MonthlyQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub warehouse_id: Option<Uuid>,
    pub format: Option<String>,
}

pub(crate) fn wants_csv(format: Option<&str>) -> bool {
    format.is_some_and(|f| f.eq_ignore_ascii_case("csv"))
}

/// Attachment response for a CSV export
pub(crate) fn csv_response(filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// Get dashboard metrics
pub async fn get_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<DashboardSummary>> {
    user.require(Capability::ViewDashboard)?;

    let service = ReportingService::new(state.db.clone(), &state.config);
    let summary = service.dashboard().await?;
    Ok(Json(summary))
}

/// Medicine by warehouse stock sheet
pub async fn get_inventory(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<InventoryQuery>,
) -> AppResult<Response> {
    user.require(Capability::ViewReports)?;

    let service = ReportingService::new(state.db.clone(), &state.config);
    let view = service
        .inventory(query.search.as_deref(), query.warehouse_id)
        .await?;

    if wants_csv(query.format.as_deref()) {
        let csv = service.inventory_csv(&view)?;
        Ok(csv_response("inventory.csv", csv))
    } else {
        Ok(Json(view).into_response())
    }
}

/// Movements inside a date range; both bounds must be given to override
/// the default window
pub async fn get_period_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PeriodQuery>,
) -> AppResult<Response> {
    user.require(Capability::ViewReports)?;

    let range = match (query.start_date, query.end_date) {
        (Some(start), Some(end)) => Some(DateRange::new(start, end)),
        _ => None,
    };

    let service = ReportingService::new(state.db.clone(), &state.config);
    let report = service.period(range, query.warehouse_id).await?;

    if wants_csv(query.format.as_deref()) {
        let csv = service.period_csv(&report)?;
        let filename = format!("movements_{}_{}.csv", report.range.start, report.range.end);
        Ok(csv_response(&filename, csv))
    } else {
        Ok(Json(report).into_response())
    }
}

pub async fn get_monthly_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<MonthlyQuery>,
) -> AppResult<Response> {
    user.require(Capability::ViewReports)?;

    let service = ReportingService::new(state.db.clone(), &state.config);
    let report = service
        .monthly(query.year, query.month, query.warehouse_id)
        .await?;

    if wants_csv(query.format.as_deref()) {
        let csv = service.monthly_csv(&report)?;
        let filename = format!("monthly_{}_{:02}.csv", report.year, report.month);
        Ok(csv_response(&filename, csv))
    } else {
        Ok(Json(report).into_response())
    }
}

/// Stored stock against stock derived from the movement ledger
pub async fn get_reconciliation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<ReconciliationReport>> {
    user.require(Capability::ManageMedicines)?;

    let service = ReportingService::new(state.db.clone(), &state.config);
    let report = service.reconciliation().await?;
    Ok(Json(report))
}
