//! Reporting service: dashboard, inventory sheet, period/monthly reports,
//! reconciliation and CSV export

use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;
use shared::reports::{self, DashboardSummary, InventoryView, MonthlyReport, PeriodReport};
use shared::{AuditLogEntry, DateRange, Movement, MovementDetails, StockReconciliation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::services::{MedicineService, MovementService, WarehouseService};

/// Default length of the period report window
pub const DEFAULT_PERIOD_DAYS: u32 = 30;

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    medicines: MedicineService,
    warehouses: WarehouseService,
    movements: MovementService,
    institution_name: String,
}

/// Outcome of checking every medicine against its ledger
#[derive(Debug, Serialize)]
pub struct ReconciliationReport {
    pub checked: usize,
    pub consistent: usize,
    pub drifted: Vec<StockReconciliation>,
}

/// One movement as a spreadsheet row
#[derive(Debug, Serialize)]
struct MovementCsvRow<'a> {
    date: NaiveDate,
    #[serde(rename = "type")]
    movement_type: &'static str,
    medicine: &'a str,
    warehouse: &'a str,
    quantity: u32,
    justification: &'static str,
    invoice_number: &'a str,
    patient_name: &'a str,
    patient_document: &'a str,
    prescription_number: &'a str,
    user: &'a str,
}

impl<'a> From<&'a Movement> for MovementCsvRow<'a> {
    fn from(m: &'a Movement) -> Self {
        let mut row = MovementCsvRow {
            date: m.date,
            movement_type: m.movement_type().as_str(),
            medicine: &m.medicine_name,
            warehouse: &m.warehouse_name,
            quantity: m.quantity,
            justification: "",
            invoice_number: "",
            patient_name: "",
            patient_document: "",
            prescription_number: "",
            user: &m.user_name,
        };
        match &m.details {
            MovementDetails::Entry {
                justification,
                invoice_number,
            } => {
                row.justification = justification.label();
                row.invoice_number = invoice_number.as_deref().unwrap_or_default();
            }
            MovementDetails::Exit {
                patient_name,
                patient_document,
                prescription_number,
            } => {
                row.patient_name = patient_name;
                row.patient_document = patient_document;
                row.prescription_number = prescription_number.as_deref().unwrap_or_default();
            }
        }
        row
    }
}

#[derive(Debug, Serialize)]
struct AuditCsvRow<'a> {
    timestamp: String,
    user: &'a str,
    category: &'static str,
    action: &'a str,
    details: &'a str,
}

fn csv_error(e: impl std::fmt::Display) -> AppError {
    AppError::Internal(format!("CSV serialization error: {}", e))
}

fn finish_csv(wtr: csv::Writer<Vec<u8>>) -> AppResult<String> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
}

impl ReportingService {
    /// Create a new ReportingService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            medicines: MedicineService::new(db.clone()),
            warehouses: WarehouseService::new(db.clone()),
            movements: MovementService::new(db, config),
            institution_name: config.report.institution_name.clone(),
        }
    }

    pub async fn dashboard(&self) -> AppResult<DashboardSummary> {
        let medicines = self.medicines.list().await?;
        let movements = self.movements.list_all().await?;
        Ok(reports::dashboard(&medicines, &movements, Local::now().date_naive()))
    }

    pub async fn inventory(&self, search: Option<&str>, warehouse_id: Option<Uuid>) -> AppResult<InventoryView> {
        let medicines = self.medicines.list().await?;
        let warehouses = self.warehouses.list().await?;
        Ok(reports::inventory_view(&medicines, &warehouses, search, warehouse_id))
    }

    /// Movements in `range` (default: last 30 days)
    pub async fn period(&self, range: Option<DateRange>, warehouse_id: Option<Uuid>) -> AppResult<PeriodReport> {
        let range = range
            .unwrap_or_else(|| DateRange::trailing_days(Local::now().date_naive(), DEFAULT_PERIOD_DAYS));
        if !range.is_valid() {
            return Err(AppError::Validation {
                field: "start_date".to_string(),
                message: "Start date must not be after end date".to_string(),
                message_es: "La fecha inicial no puede ser posterior a la fecha final".to_string(),
            });
        }

        let movements = self.movements.list_in_range(range).await?;
        Ok(reports::period_report(&movements, range, warehouse_id))
    }

    /// Movements of one month and the closing stock at its end
    /// (default: current month)
    pub async fn monthly(
        &self,
        year: Option<i32>,
        month: Option<u32>,
        warehouse_id: Option<Uuid>,
    ) -> AppResult<MonthlyReport> {
        let today = Local::now().date_naive();
        let year = year.unwrap_or(today.year());
        let month = month.unwrap_or(today.month());

        let medicines = self.medicines.list().await?;
        let movements = self.movements.list_all().await?;

        reports::monthly_report(&medicines, &movements, year, month, warehouse_id).ok_or_else(|| {
            AppError::Validation {
                field: "month".to_string(),
                message: "Month must be between 1 and 12".to_string(),
                message_es: "El mes debe estar entre 1 y 12".to_string(),
            }
        })
    }

    /// Stored stock versus stock derived from the ledger
    pub async fn reconciliation(&self) -> AppResult<ReconciliationReport> {
        let medicines = self.medicines.list().await?;
        let movements = self.movements.list_all().await?;

        let results = shared::reconcile(&medicines, &movements);
        let checked = results.len();
        let drifted: Vec<StockReconciliation> =
            results.into_iter().filter(|r| !r.is_consistent()).collect();

        for drift in &drifted {
            tracing::warn!(
                medicine_id = %drift.medicine_id,
                stored = drift.stored_total,
                derived = drift.derived_total,
                "Stock drift detected"
            );
        }

        Ok(ReconciliationReport {
            checked,
            consistent: checked - drifted.len(),
            drifted,
        })
    }

    // ------------------------------------------------------------------------
    // CSV export
    // ------------------------------------------------------------------------

    fn report_writer(&self, title: &str) -> AppResult<csv::Writer<Vec<u8>>> {
        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_writer(vec![]);
        wtr.write_record([self.institution_name.as_str(), title])
            .map_err(csv_error)?;
        Ok(wtr)
    }

    fn write_movements(wtr: &mut csv::Writer<Vec<u8>>, movements: &[Movement]) -> AppResult<()> {
        wtr.write_record([
            "date",
            "type",
            "medicine",
            "warehouse",
            "quantity",
            "justification",
            "invoice_number",
            "patient_name",
            "patient_document",
            "prescription_number",
            "user",
        ])
        .map_err(csv_error)?;
        for movement in movements {
            wtr.serialize(MovementCsvRow::from(movement)).map_err(csv_error)?;
        }
        Ok(())
    }

    /// Flat movement listing
    pub fn movements_csv(movements: &[Movement]) -> AppResult<String> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(vec![]);
        Self::write_movements(&mut wtr, movements)?;
        finish_csv(wtr)
    }

    /// Medicine by warehouse sheet
    pub fn inventory_csv(&self, view: &InventoryView) -> AppResult<String> {
        let mut wtr = self.report_writer("Inventory")?;

        let mut header = vec!["medicine".to_string()];
        header.extend(view.warehouses.iter().map(|w| w.name.clone()));
        header.extend(["total".to_string(), "low_stock_threshold".to_string()]);
        wtr.write_record(&header).map_err(csv_error)?;

        for row in &view.rows {
            let mut record = vec![row.name.clone()];
            record.extend(row.quantities.iter().map(u32::to_string));
            record.extend([row.total.to_string(), row.low_stock_threshold.to_string()]);
            wtr.write_record(&record).map_err(csv_error)?;
        }

        finish_csv(wtr)
    }

    pub fn period_csv(&self, report: &PeriodReport) -> AppResult<String> {
        let mut wtr = self.report_writer(&format!(
            "Movements {} to {}",
            report.range.start, report.range.end
        ))?;
        Self::write_summary(&mut wtr, report)?;
        let all: Vec<Movement> = report.entries.iter().chain(&report.exits).cloned().collect();
        Self::write_movements(&mut wtr, &all)?;
        finish_csv(wtr)
    }

    fn write_summary(wtr: &mut csv::Writer<Vec<u8>>, report: &PeriodReport) -> AppResult<()> {
        let s = &report.summary;
        for (label, value) in [
            ("total_movements", s.total_movements as u64),
            ("total_entries", s.total_entries as u64),
            ("total_exits", s.total_exits as u64),
            ("units_in", s.units_in),
            ("units_out", s.units_out),
        ] {
            wtr.write_record([label, value.to_string().as_str()])
                .map_err(csv_error)?;
        }
        Ok(())
    }

    pub fn monthly_csv(&self, report: &MonthlyReport) -> AppResult<String> {
        let mut wtr = self.report_writer(&format!(
            "Monthly report {}-{:02}",
            report.year, report.month
        ))?;
        Self::write_summary(&mut wtr, &report.period)?;

        wtr.write_record(["medicine", "closing_stock"]).map_err(csv_error)?;
        for line in &report.closing_stock {
            wtr.write_record([line.name.as_str(), line.stock.to_string().as_str()])
                .map_err(csv_error)?;
        }

        let all: Vec<Movement> = report
            .period
            .entries
            .iter()
            .chain(&report.period.exits)
            .cloned()
            .collect();
        Self::write_movements(&mut wtr, &all)?;
        finish_csv(wtr)
    }

    pub fn audit_csv(entries: &[AuditLogEntry]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for entry in entries {
            wtr.serialize(AuditCsvRow {
                timestamp: entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                user: &entry.user_name,
                category: entry.category.as_str(),
                action: &entry.action,
                details: &entry.details,
            })
            .map_err(csv_error)?;
        }
        finish_csv(wtr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::EntryJustification;

    fn movement(details: MovementDetails) -> Movement {
        Movement {
            id: Uuid::new_v4(),
            medicine_id: Uuid::new_v4(),
            medicine_name: "MIDAZOLAM 5MG/ML".into(),
            warehouse_id: Uuid::new_v4(),
            warehouse_name: "Carro de paro urgencias".into(),
            quantity: 3,
            clamped_quantity: 0,
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            user_id: Uuid::new_v4(),
            user_name: "regente".into(),
            details,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_movements_csv_has_header_and_regulatory_columns() {
        let rows = vec![
            movement(MovementDetails::Entry {
                justification: EntryJustification::Purchase,
                invoice_number: Some("FV-77".into()),
            }),
            movement(MovementDetails::Exit {
                patient_name: "Marta Ruiz".into(),
                patient_document: "52000111".into(),
                prescription_number: None,
            }),
        ];

        let csv = ReportingService::movements_csv(&rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("date,type,medicine"));
        assert!(lines[1].contains("entry") && lines[1].contains("Purchase") && lines[1].contains("FV-77"));
        assert!(lines[2].contains("exit") && lines[2].contains("Marta Ruiz"));
    }
}
