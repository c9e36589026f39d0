//! Read-side views over the ledger: dashboard, inventory sheet, period and
//! monthly reports, and the movement/audit list filters.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::{reconstruct_end_of_period_stock, reconstruct_warehouse_stock};
use crate::models::{
    AuditCategory, AuditLogEntry, EntryJustification, Medicine, Movement, MovementType, Warehouse,
};
use crate::types::DateRange;

pub const DASHBOARD_WINDOW_DAYS: u32 = 30;
const DASHBOARD_TOP: usize = 5;
const DASHBOARD_RECENT: usize = 10;

/// Newest first: effective date, then recording time
fn newest_first(a: &Movement, b: &Movement) -> std::cmp::Ordering {
    b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at))
}

// ============================================================================
// Filters
// ============================================================================

/// Movement list filter. Every set criterion must match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementFilter {
    /// Case-insensitive match on medicine name, justification or patient name
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub movement_type: Option<MovementType>,
    pub justification: Option<EntryJustification>,
    pub date: Option<NaiveDate>,
    pub warehouse_id: Option<Uuid>,
}

impl MovementFilter {
    pub fn matches(&self, movement: &Movement) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let justification = movement.details.justification().map(|j| j.label().to_lowercase());
            let hit = movement.medicine_name.to_lowercase().contains(&needle)
                || justification.is_some_and(|j| j.contains(&needle))
                || movement
                    .details
                    .patient_name()
                    .is_some_and(|p| p.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if self
            .movement_type
            .is_some_and(|t| t != movement.movement_type())
        {
            return false;
        }
        if let Some(justification) = self.justification {
            if movement.details.justification() != Some(justification) {
                return false;
            }
        }
        if self.date.is_some_and(|d| d != movement.date) {
            return false;
        }
        if self.warehouse_id.is_some_and(|w| w != movement.warehouse_id) {
            return false;
        }
        true
    }

    /// Keeps the matching movements, newest first
    pub fn apply(&self, movements: Vec<Movement>) -> Vec<Movement> {
        let mut matched: Vec<Movement> = movements.into_iter().filter(|m| self.matches(m)).collect();
        matched.sort_by(newest_first);
        matched
    }
}

/// Audit log filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditFilter {
    /// Case-insensitive match on user name, action or details
    pub search: Option<String>,
    pub category: Option<AuditCategory>,
    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD` prefix of the timestamp
    pub date: Option<String>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let hit = [&entry.user_name, &entry.action, &entry.details]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if self.category.is_some_and(|c| c != entry.category) {
            return false;
        }
        if let Some(prefix) = self.date.as_deref().filter(|d| !d.is_empty()) {
            if !entry.timestamp.to_rfc3339().starts_with(prefix) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, entries: Vec<AuditLogEntry>) -> Vec<AuditLogEntry> {
        let mut matched: Vec<AuditLogEntry> = entries.into_iter().filter(|e| self.matches(e)).collect();
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matched
    }
}

// ============================================================================
// Summaries
// ============================================================================

/// Counts over a list of movements
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovementSummary {
    pub total_movements: usize,
    pub total_entries: usize,
    pub total_exits: usize,
    pub units_in: u64,
    pub units_out: u64,
}

pub fn summarize(movements: &[Movement]) -> MovementSummary {
    movements
        .iter()
        .fold(MovementSummary::default(), |mut summary, m| {
            summary.total_movements += 1;
            match m.movement_type() {
                MovementType::Entry => {
                    summary.total_entries += 1;
                    summary.units_in += u64::from(m.effective_quantity());
                }
                MovementType::Exit => {
                    summary.total_exits += 1;
                    summary.units_out += u64::from(m.effective_quantity());
                }
            }
            summary
        })
}

// ============================================================================
// Dashboard
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LowStockItem {
    pub medicine_id: Uuid,
    pub name: String,
    pub current_stock: u32,
    pub low_stock_threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedicineActivity {
    pub medicine_id: Uuid,
    pub name: String,
    pub current_stock: u32,
    pub movement_count: usize,
    pub units: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardSummary {
    pub total_medicines: usize,
    pub active_medicines: usize,
    pub movements_today: usize,
    pub low_stock: Vec<LowStockItem>,
    pub top_exits: Vec<MedicineActivity>,
    pub least_moved: Vec<MedicineActivity>,
    pub recent_movements: Vec<Movement>,
}

/// Active medicines whose total is below their threshold
pub fn low_stock(medicines: &[Medicine]) -> Vec<LowStockItem> {
    medicines
        .iter()
        .filter(|m| m.is_active && m.is_low_stock())
        .map(|m| LowStockItem {
            medicine_id: m.id,
            name: m.name.clone(),
            current_stock: m.current_stock,
            low_stock_threshold: m.low_stock_threshold,
        })
        .collect()
}

/// Medicines with the most exit units inside `window`
pub fn top_exits(
    medicines: &[Medicine],
    movements: &[Movement],
    window: DateRange,
    limit: usize,
) -> Vec<MedicineActivity> {
    let mut totals: HashMap<Uuid, (usize, u64)> = HashMap::new();
    for m in movements.iter().filter(|m| m.is_exit() && window.contains(m.date)) {
        let entry = totals.entry(m.medicine_id).or_default();
        entry.0 += 1;
        entry.1 += u64::from(m.quantity);
    }

    let mut ranked: Vec<MedicineActivity> = medicines
        .iter()
        .filter_map(|medicine| {
            let (movement_count, units) = totals.get(&medicine.id).copied()?;
            (units > 0).then(|| MedicineActivity {
                medicine_id: medicine.id,
                name: medicine.name.clone(),
                current_stock: medicine.current_stock,
                movement_count,
                units,
            })
        })
        .collect();
    ranked.sort_by(|a, b| b.units.cmp(&a.units));
    ranked.truncate(limit);
    ranked
}

/// Active medicines with the fewest movements inside `window`
pub fn least_moved(
    medicines: &[Medicine],
    movements: &[Movement],
    window: DateRange,
    limit: usize,
) -> Vec<MedicineActivity> {
    let mut ranked: Vec<MedicineActivity> = medicines
        .iter()
        .filter(|m| m.is_active)
        .map(|medicine| {
            let in_window: Vec<&Movement> = movements
                .iter()
                .filter(|m| m.medicine_id == medicine.id && window.contains(m.date))
                .collect();
            MedicineActivity {
                medicine_id: medicine.id,
                name: medicine.name.clone(),
                current_stock: medicine.current_stock,
                movement_count: in_window.len(),
                units: in_window.iter().map(|m| u64::from(m.quantity)).sum(),
            }
        })
        .collect();
    ranked.sort_by_key(|a| a.movement_count);
    ranked.truncate(limit);
    ranked
}

/// The `limit` most recent movements
pub fn recent_movements(movements: &[Movement], limit: usize) -> Vec<Movement> {
    let mut recent = movements.to_vec();
    recent.sort_by(newest_first);
    recent.truncate(limit);
    recent
}

pub fn dashboard(medicines: &[Medicine], movements: &[Movement], today: NaiveDate) -> DashboardSummary {
    let window = DateRange::trailing_days(today, DASHBOARD_WINDOW_DAYS);

    DashboardSummary {
        total_medicines: medicines.len(),
        active_medicines: medicines.iter().filter(|m| m.is_active).count(),
        movements_today: movements.iter().filter(|m| m.date == today).count(),
        low_stock: low_stock(medicines),
        top_exits: top_exits(medicines, movements, window, DASHBOARD_TOP),
        least_moved: least_moved(medicines, movements, window, DASHBOARD_TOP),
        recent_movements: recent_movements(movements, DASHBOARD_RECENT),
    }
}

// ============================================================================
// Inventory sheet
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarehouseColumn {
    pub warehouse_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryRow {
    pub medicine_id: Uuid,
    pub name: String,
    /// Aligned with [`InventoryView::warehouses`]
    pub quantities: Vec<u32>,
    pub total: u32,
    pub low_stock_threshold: u32,
    pub is_low_stock: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryView {
    pub warehouses: Vec<WarehouseColumn>,
    pub rows: Vec<InventoryRow>,
}

/// Active medicines by active warehouse. With `warehouse_id` set only the
/// medicines holding stock there are listed.
pub fn inventory_view(
    medicines: &[Medicine],
    warehouses: &[Warehouse],
    search: Option<&str>,
    warehouse_id: Option<Uuid>,
) -> InventoryView {
    let columns: Vec<WarehouseColumn> = warehouses
        .iter()
        .filter(|w| w.is_active)
        .map(|w| WarehouseColumn {
            warehouse_id: w.id,
            name: w.name.clone(),
        })
        .collect();
    let needle = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let rows = medicines
        .iter()
        .filter(|m| m.is_active)
        .filter(|m| {
            needle
                .as_deref()
                .map_or(true, |n| m.name.to_lowercase().contains(n))
        })
        .filter(|m| warehouse_id.map_or(true, |w| m.stock_in(w) > 0))
        .map(|m| InventoryRow {
            medicine_id: m.id,
            name: m.name.clone(),
            quantities: columns.iter().map(|c| m.stock_in(c.warehouse_id)).collect(),
            total: m.current_stock,
            low_stock_threshold: m.low_stock_threshold,
            is_low_stock: m.is_low_stock(),
        })
        .collect();

    InventoryView {
        warehouses: columns,
        rows,
    }
}

// ============================================================================
// Period and monthly reports
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeriodReport {
    pub range: DateRange,
    pub warehouse_id: Option<Uuid>,
    pub summary: MovementSummary,
    pub entries: Vec<Movement>,
    pub exits: Vec<Movement>,
}

fn in_scope(m: &Movement, range: DateRange, warehouse_id: Option<Uuid>) -> bool {
    range.contains(m.date) && warehouse_id.map_or(true, |w| m.warehouse_id == w)
}

pub fn period_report(
    movements: &[Movement],
    range: DateRange,
    warehouse_id: Option<Uuid>,
) -> PeriodReport {
    let mut selected: Vec<Movement> = movements
        .iter()
        .filter(|m| in_scope(m, range, warehouse_id))
        .cloned()
        .collect();
    selected.sort_by(newest_first);

    let summary = summarize(&selected);
    let (entries, exits) = selected.into_iter().partition(Movement::is_entry);

    PeriodReport {
        range,
        warehouse_id,
        summary,
        entries,
        exits,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthEndStock {
    pub medicine_id: Uuid,
    pub name: String,
    pub stock: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub period: PeriodReport,
    /// Closing stock of every active medicine
    pub closing_stock: Vec<MonthEndStock>,
}

/// Closing stock of each active medicine at the end of `period_end`.
/// With a warehouse selected the per-warehouse reconstruction is used.
pub fn month_end_stock(
    medicines: &[Medicine],
    movements: &[Movement],
    period_end: NaiveDate,
    warehouse_id: Option<Uuid>,
) -> Vec<MonthEndStock> {
    medicines
        .iter()
        .filter(|m| m.is_active)
        .map(|medicine| MonthEndStock {
            medicine_id: medicine.id,
            name: medicine.name.clone(),
            stock: match warehouse_id {
                Some(w) => reconstruct_warehouse_stock(movements, medicine, w, period_end),
                None => reconstruct_end_of_period_stock(movements, medicine, period_end),
            },
        })
        .collect()
}

/// `None` when `month` is not a calendar month
pub fn monthly_report(
    medicines: &[Medicine],
    movements: &[Movement],
    year: i32,
    month: u32,
    warehouse_id: Option<Uuid>,
) -> Option<MonthlyReport> {
    let range = DateRange::month(year, month)?;
    Some(MonthlyReport {
        year,
        month,
        period: period_report(movements, range, warehouse_id),
        closing_stock: month_end_stock(medicines, movements, range.end, warehouse_id),
    })
}
