//! Stock ledger
//!
//! A medicine's per-warehouse stock map is a materialised view over its
//! movement history. Everything in this module is pure: the backend runs it
//! inside a locked transaction, the browser runs it for previews.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Medicine, Movement, MovementType, WarehouseStock};

/// Errors raised by the strict ledger operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient stock in warehouse {warehouse_id}: {available} available, {requested} requested")]
    InsufficientStock {
        warehouse_id: Uuid,
        available: u32,
        requested: u32,
    },

    #[error("movement quantity must be greater than zero")]
    InvalidQuantity,

    #[error("stock would exceed the supported maximum")]
    StockOverflow,
}

/// How an exit larger than the stock on hand is handled
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExitPolicy {
    /// Refuse the movement with [`LedgerError::InsufficientStock`]
    #[default]
    Reject,
    /// Floor the warehouse at zero and record the shortfall on the movement
    Clamp,
}

/// Result of applying one movement
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedMovement {
    pub medicine: Medicine,
    /// Units of an exit that were not on hand (always zero for entries)
    pub clamped_quantity: u32,
}

// ============================================================================
// Applying movements
// ============================================================================

/// Sum of all warehouse quantities
pub fn total_stock(stock: &WarehouseStock) -> u32 {
    stock.values().fold(0u32, |acc, q| acc.saturating_add(*q))
}

/// Applies a movement with zero-clamping on exits.
///
/// Entries add to the warehouse, exits subtract and floor at zero. The map
/// entry is written even when the result is zero, then the total is
/// recomputed from the map.
pub fn apply_movement(
    medicine: Medicine,
    warehouse_id: Uuid,
    movement_type: MovementType,
    quantity: u32,
) -> Medicine {
    apply_movement_clamped(medicine, warehouse_id, movement_type, quantity).medicine
}

/// Same as [`apply_movement`] but also reports how many units were clamped
pub fn apply_movement_clamped(
    mut medicine: Medicine,
    warehouse_id: Uuid,
    movement_type: MovementType,
    quantity: u32,
) -> AppliedMovement {
    let current = medicine.stock_in(warehouse_id);
    let (next, clamped_quantity) = match movement_type {
        MovementType::Entry => (current.saturating_add(quantity), 0),
        MovementType::Exit => (
            current.saturating_sub(quantity),
            quantity.saturating_sub(current),
        ),
    };

    medicine.warehouse_stock.insert(warehouse_id, next);
    medicine.current_stock = total_stock(&medicine.warehouse_stock);

    AppliedMovement {
        medicine,
        clamped_quantity,
    }
}

/// Entries never clamp: both the warehouse quantity and the total must
/// stay representable
fn check_entry_fits(medicine: &Medicine, warehouse_id: Uuid, quantity: u32) -> Result<(), LedgerError> {
    let available = medicine.stock_in(warehouse_id);
    let others = total_stock(&medicine.warehouse_stock).saturating_sub(available);
    available
        .checked_add(quantity)
        .and_then(|next| next.checked_add(others))
        .map(|_| ())
        .ok_or(LedgerError::StockOverflow)
}

/// Strict variant: refuses zero quantities, exits above the stock on hand,
/// and entries that would overflow the total.
pub fn try_apply_movement(
    medicine: Medicine,
    warehouse_id: Uuid,
    movement_type: MovementType,
    quantity: u32,
) -> Result<Medicine, LedgerError> {
    if quantity == 0 {
        return Err(LedgerError::InvalidQuantity);
    }

    let available = medicine.stock_in(warehouse_id);
    match movement_type {
        MovementType::Entry => check_entry_fits(&medicine, warehouse_id, quantity)?,
        MovementType::Exit if quantity > available => {
            return Err(LedgerError::InsufficientStock {
                warehouse_id,
                available,
                requested: quantity,
            });
        }
        MovementType::Exit => {}
    }

    Ok(apply_movement(medicine, warehouse_id, movement_type, quantity))
}

/// Applies a movement under the configured exit policy
pub fn apply_with_policy(
    medicine: Medicine,
    warehouse_id: Uuid,
    movement_type: MovementType,
    quantity: u32,
    policy: ExitPolicy,
) -> Result<AppliedMovement, LedgerError> {
    match policy {
        ExitPolicy::Reject => {
            try_apply_movement(medicine, warehouse_id, movement_type, quantity).map(|medicine| {
                AppliedMovement {
                    medicine,
                    clamped_quantity: 0,
                }
            })
        }
        ExitPolicy::Clamp => {
            if quantity == 0 {
                return Err(LedgerError::InvalidQuantity);
            }
            if movement_type == MovementType::Entry {
                check_entry_fits(&medicine, warehouse_id, quantity)?;
            }
            Ok(apply_movement_clamped(
                medicine,
                warehouse_id,
                movement_type,
                quantity,
            ))
        }
    }
}

// ============================================================================
// Point-in-time reconstruction
// ============================================================================

/// Total stock of `medicine` at the end of `period_end`.
///
/// Starts from the current total and reverses every movement of this
/// medicine dated strictly after `period_end`. Clamped exit units never
/// left the shelf, so only the effective quantity is reversed.
pub fn reconstruct_end_of_period_stock(
    movements: &[Movement],
    medicine: &Medicine,
    period_end: NaiveDate,
) -> u32 {
    reverse_replay(
        i64::from(medicine.current_stock),
        movements
            .iter()
            .filter(|m| m.medicine_id == medicine.id && m.date > period_end),
    )
}

/// Per-warehouse variant of [`reconstruct_end_of_period_stock`]
pub fn reconstruct_warehouse_stock(
    movements: &[Movement],
    medicine: &Medicine,
    warehouse_id: Uuid,
    period_end: NaiveDate,
) -> u32 {
    reverse_replay(
        i64::from(medicine.stock_in(warehouse_id)),
        movements.iter().filter(|m| {
            m.medicine_id == medicine.id && m.warehouse_id == warehouse_id && m.date > period_end
        }),
    )
}

fn reverse_replay<'a>(start: i64, later: impl Iterator<Item = &'a Movement>) -> u32 {
    let stock = later.fold(start, |acc, m| acc - m.signed_effect());
    u32::try_from(stock.max(0)).unwrap_or(u32::MAX)
}

/// Last calendar day of a month
pub fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// First and last day of the month containing `date`
pub fn month_bounds(date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let start = date.with_day(1)?;
    let end = month_end(date.year(), date.month())?;
    Some((start, end))
}

// ============================================================================
// Reconciliation
// ============================================================================

/// Rebuilds a medicine's warehouse map from its movements alone
pub fn derive_stock_from_ledger(movements: &[Movement], medicine_id: Uuid) -> WarehouseStock {
    let mut sums: std::collections::BTreeMap<Uuid, i64> = Default::default();
    for movement in movements.iter().filter(|m| m.medicine_id == medicine_id) {
        *sums.entry(movement.warehouse_id).or_default() += movement.signed_effect();
    }

    sums.into_iter()
        .map(|(warehouse_id, sum)| {
            (
                warehouse_id,
                u32::try_from(sum.max(0)).unwrap_or(u32::MAX),
            )
        })
        .collect()
}

/// Stored versus ledger-derived quantity for one warehouse
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WarehouseDrift {
    pub warehouse_id: Uuid,
    pub stored: u32,
    pub derived: u32,
}

/// Outcome of comparing one medicine's stored stock with its ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockReconciliation {
    pub medicine_id: Uuid,
    pub medicine_name: String,
    pub stored_total: u32,
    pub derived_total: u32,
    /// Only the warehouses whose quantities disagree
    pub drifts: Vec<WarehouseDrift>,
}

impl StockReconciliation {
    pub fn is_consistent(&self) -> bool {
        self.stored_total == self.derived_total && self.drifts.is_empty()
    }
}

/// Compares one medicine's stored map with the map its movements produce
pub fn reconcile_medicine(medicine: &Medicine, movements: &[Movement]) -> StockReconciliation {
    let derived = derive_stock_from_ledger(movements, medicine.id);

    let mut warehouses: Vec<Uuid> = medicine
        .warehouse_stock
        .keys()
        .chain(derived.keys())
        .copied()
        .collect();
    warehouses.sort();
    warehouses.dedup();

    let drifts = warehouses
        .into_iter()
        .filter_map(|warehouse_id| {
            let stored = medicine.stock_in(warehouse_id);
            let derived = derived.get(&warehouse_id).copied().unwrap_or(0);
            (stored != derived).then_some(WarehouseDrift {
                warehouse_id,
                stored,
                derived,
            })
        })
        .collect();

    StockReconciliation {
        medicine_id: medicine.id,
        medicine_name: medicine.name.clone(),
        stored_total: medicine.current_stock,
        derived_total: total_stock(&derived),
        drifts,
    }
}

/// Reconciles every medicine against the full movement history
pub fn reconcile(medicines: &[Medicine], movements: &[Movement]) -> Vec<StockReconciliation> {
    medicines
        .iter()
        .map(|medicine| reconcile_medicine(medicine, movements))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryJustification, MovementDetails};
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn movement(medicine: &Medicine, warehouse_id: Uuid, kind: MovementType, qty: u32, on: NaiveDate) -> Movement {
        let details = match kind {
            MovementType::Entry => MovementDetails::Entry {
                justification: EntryJustification::Transfer,
                invoice_number: None,
            },
            MovementType::Exit => MovementDetails::Exit {
                patient_name: "Paciente".into(),
                patient_document: "123".into(),
                prescription_number: None,
            },
        };
        Movement {
            id: Uuid::new_v4(),
            medicine_id: medicine.id,
            medicine_name: medicine.name.clone(),
            warehouse_id,
            warehouse_name: "Farmacia Central".into(),
            quantity: qty,
            clamped_quantity: 0,
            date: on,
            user_id: Uuid::nil(),
            user_name: "admin".into(),
            details,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_month_end() {
        assert_eq!(month_end(2024, 2), Some(date(2024, 2, 29)));
        assert_eq!(month_end(2023, 2), Some(date(2023, 2, 28)));
        assert_eq!(month_end(2024, 12), Some(date(2024, 12, 31)));
        assert_eq!(month_end(2024, 13), None);
    }

    #[test]
    fn test_month_bounds() {
        let (start, end) = month_bounds(date(2024, 4, 17)).unwrap();
        assert_eq!(start, date(2024, 4, 1));
        assert_eq!(end, date(2024, 4, 30));
    }

    #[test]
    fn test_clamped_exit_reports_shortfall() {
        let w = Uuid::new_v4();
        let medicine = apply_movement(Medicine::new("KETAMINA 500MG/10ML", 10), w, MovementType::Entry, 5);
        let applied = apply_movement_clamped(medicine, w, MovementType::Exit, 8);
        assert_eq!(applied.medicine.stock_in(w), 0);
        assert_eq!(applied.clamped_quantity, 3);
    }

    #[test]
    fn test_policy_rejects_zero_quantity() {
        let medicine = Medicine::new("TIOPENTAL 1G AMP", 15);
        let result = apply_with_policy(medicine, Uuid::new_v4(), MovementType::Entry, 0, ExitPolicy::Clamp);
        assert_eq!(result, Err(LedgerError::InvalidQuantity));
    }

    #[test]
    fn test_reconstruction_uses_effective_quantity() {
        let w = Uuid::new_v4();
        let mut medicine = apply_movement(Medicine::new("MORFINA 50MG / 5ML", 10), w, MovementType::Entry, 5);
        let mut exit = movement(&medicine, w, MovementType::Exit, 8, date(2024, 5, 3));
        let applied = apply_movement_clamped(medicine, w, MovementType::Exit, 8);
        exit.clamped_quantity = applied.clamped_quantity;
        medicine = applied.medicine;

        // Only 5 units left the shelf, so the April close was 5, not 8.
        assert_eq!(reconstruct_end_of_period_stock(&[exit], &medicine, date(2024, 4, 30)), 5);
    }

    #[test]
    fn test_reconcile_detects_drift() {
        let w = Uuid::new_v4();
        let mut medicine = Medicine::new("FENTANILO 0.5MG/10 ML AMP", 10);
        let entry = movement(&medicine, w, MovementType::Entry, 20, date(2024, 1, 5));
        medicine = apply_movement(medicine, w, MovementType::Entry, 20);
        assert!(reconcile_medicine(&medicine, &[entry.clone()]).is_consistent());

        medicine.warehouse_stock.insert(w, 25);
        medicine.current_stock = 25;
        let report = reconcile_medicine(&medicine, &[entry]);
        assert!(!report.is_consistent());
        assert_eq!(
            report.drifts,
            vec![WarehouseDrift {
                warehouse_id: w,
                stored: 25,
                derived: 20
            }]
        );
    }
}
