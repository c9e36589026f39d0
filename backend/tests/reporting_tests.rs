//! Reporting tests
//!
//! Tests for the dashboard, movement and audit filters, the inventory sheet
//! and the period and monthly reports:
//! - Property 10: Period Summary Counts Every Movement Once
//! - Property 11: Filters Only Narrow

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use shared::reports::{
    dashboard, inventory_view, monthly_report, period_report, AuditFilter, MovementFilter,
};
use shared::{
    apply_movement, AuditCategory, AuditLogEntry, DateRange, EntryJustification, Medicine,
    Movement, MovementDetails, MovementType, Warehouse,
};
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn warehouse(name: &str) -> Warehouse {
    Warehouse {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        is_active: true,
        created_at: Utc::now(),
    }
}

fn entry_of(medicine: &Medicine, warehouse: &Warehouse, quantity: u32, on: NaiveDate) -> Movement {
    movement(
        medicine,
        warehouse,
        quantity,
        on,
        MovementDetails::Entry {
            justification: EntryJustification::Purchase,
            invoice_number: Some("FV-10".to_string()),
        },
    )
}

fn exit_of(medicine: &Medicine, warehouse: &Warehouse, quantity: u32, on: NaiveDate, patient: &str) -> Movement {
    movement(
        medicine,
        warehouse,
        quantity,
        on,
        MovementDetails::Exit {
            patient_name: patient.to_string(),
            patient_document: "1000".to_string(),
            prescription_number: None,
        },
    )
}

fn movement(
    medicine: &Medicine,
    warehouse: &Warehouse,
    quantity: u32,
    on: NaiveDate,
    details: MovementDetails,
) -> Movement {
    Movement {
        id: Uuid::new_v4(),
        medicine_id: medicine.id,
        medicine_name: medicine.name.clone(),
        warehouse_id: warehouse.id,
        warehouse_name: warehouse.name.clone(),
        quantity,
        clamped_quantity: 0,
        date: on,
        user_id: Uuid::new_v4(),
        user_name: "auxiliar".to_string(),
        details,
        created_at: Utc::now(),
    }
}

fn stocked(name: &str, threshold: u32, warehouse: &Warehouse, quantity: u32) -> Medicine {
    let medicine = Medicine::new(name, threshold);
    if quantity == 0 {
        return medicine;
    }
    apply_movement(medicine, warehouse.id, MovementType::Entry, quantity)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_dashboard_low_stock_and_activity() {
        let today = date(2024, 6, 20);
        let central = warehouse("Farmacia central");

        let morphine = stocked("MORFINA 10MG/ML", 10, &central, 4);
        let fentanyl = stocked("FENTANILO 50MCG/ML", 10, &central, 40);
        let mut ketamine = stocked("KETAMINA 50MG/ML", 10, &central, 1);
        ketamine.is_active = false;
        let medicines = vec![morphine.clone(), fentanyl.clone(), ketamine];

        let movements = vec![
            exit_of(&fentanyl, &central, 12, today, "Ana"),
            exit_of(&morphine, &central, 3, today - Duration::days(2), "Luis"),
            // Outside the 30 day window
            exit_of(&morphine, &central, 50, today - Duration::days(45), "Eva"),
        ];

        let summary = dashboard(&medicines, &movements, today);
        assert_eq!(summary.total_medicines, 3);
        assert_eq!(summary.active_medicines, 2);
        assert_eq!(summary.movements_today, 1);

        // Inactive medicines never alert
        assert_eq!(summary.low_stock.len(), 1);
        assert_eq!(summary.low_stock[0].medicine_id, morphine.id);

        assert_eq!(summary.top_exits[0].medicine_id, fentanyl.id);
        assert_eq!(summary.top_exits[0].units, 12);
        assert_eq!(summary.top_exits[1].units, 3);

        assert!(summary.least_moved.iter().all(|m| m.movement_count == 1));
        assert_eq!(summary.recent_movements.len(), 3);
        assert_eq!(summary.recent_movements[0].date, today);
    }

    #[test]
    fn test_threshold_is_strictly_below() {
        let central = warehouse("Farmacia central");
        let at_threshold = stocked("MIDAZOLAM 5MG/ML", 10, &central, 10);

        let summary = dashboard(&[at_threshold], &[], date(2024, 6, 20));
        assert!(summary.low_stock.is_empty());
    }

    #[test]
    fn test_movement_filter_search_fields() {
        let central = warehouse("Farmacia central");
        let morphine = Medicine::new("MORFINA 10MG/ML", 5);
        let movements = vec![
            entry_of(&morphine, &central, 10, date(2024, 6, 3)),
            exit_of(&morphine, &central, 2, date(2024, 6, 4), "Carmen Salazar"),
        ];

        let by_patient = MovementFilter {
            search: Some("salazar".to_string()),
            ..Default::default()
        };
        assert_eq!(by_patient.apply(movements.clone()).len(), 1);

        let by_justification = MovementFilter {
            search: Some("purch".to_string()),
            ..Default::default()
        };
        assert_eq!(by_justification.apply(movements.clone()).len(), 1);

        let by_medicine = MovementFilter {
            search: Some("morfina".to_string()),
            ..Default::default()
        };
        let all = by_medicine.apply(movements.clone());
        assert_eq!(all.len(), 2);
        // Newest first
        assert_eq!(all[0].date, date(2024, 6, 4));

        let exits = MovementFilter {
            movement_type: Some(MovementType::Exit),
            ..Default::default()
        };
        assert!(exits.apply(movements).iter().all(Movement::is_exit));
    }

    #[test]
    fn test_movement_filter_from_query_string_names() {
        let filter: MovementFilter = serde_json::from_value(serde_json::json!({
            "type": "entry",
            "justification": "opening_balance"
        }))
        .unwrap();
        assert_eq!(filter.movement_type, Some(MovementType::Entry));
        assert_eq!(filter.justification, Some(EntryJustification::OpeningBalance));
    }

    #[test]
    fn test_audit_filter() {
        let at = |d: u32| Utc.with_ymd_and_hms(2024, 6, d, 9, 30, 0).unwrap();
        let entry = |d: u32, category: AuditCategory, action: &str| AuditLogEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_name: "admin".to_string(),
            action: action.to_string(),
            details: String::new(),
            category,
            timestamp: at(d),
        };
        let entries = vec![
            entry(1, AuditCategory::Login, "Login"),
            entry(2, AuditCategory::Movement, "Record exit"),
            entry(3, AuditCategory::Logout, "Logout"),
        ];

        let filter = AuditFilter {
            date: Some("2024-06-02".to_string()),
            ..Default::default()
        };
        let matched = filter.apply(entries.clone());
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].category, AuditCategory::Movement);

        let all = AuditFilter::default().apply(entries.clone());
        assert_eq!(all[0].timestamp, at(3));

        let logins = AuditFilter {
            category: Some(AuditCategory::Login),
            search: Some("LOG".to_string()),
            ..Default::default()
        };
        assert_eq!(logins.apply(entries).len(), 1);
    }

    #[test]
    fn test_inventory_view_columns_and_warehouse_filter() {
        let central = warehouse("Farmacia central");
        let er = warehouse("Urgencias");
        let mut closed = warehouse("Ambulancia 3");
        closed.is_active = false;

        let morphine = stocked("MORFINA 10MG/ML", 5, &central, 8);
        let morphine = apply_movement(morphine, er.id, MovementType::Entry, 2);
        let fentanyl = stocked("FENTANILO 50MCG/ML", 5, &central, 3);
        let warehouses = vec![central.clone(), er.clone(), closed];

        let view = inventory_view(&[morphine.clone(), fentanyl.clone()], &warehouses, None, None);
        assert_eq!(view.warehouses.len(), 2);
        assert_eq!(view.rows.len(), 2);
        let row = view.rows.iter().find(|r| r.medicine_id == morphine.id).unwrap();
        assert_eq!(row.quantities, vec![8, 2]);
        assert_eq!(row.total, 10);

        let er_only = inventory_view(&[morphine.clone(), fentanyl.clone()], &warehouses, None, Some(er.id));
        assert_eq!(er_only.rows.len(), 1);
        assert_eq!(er_only.rows[0].medicine_id, morphine.id);

        let searched = inventory_view(&[morphine, fentanyl], &warehouses, Some("fenta"), None);
        assert_eq!(searched.rows.len(), 1);
        assert!(searched.rows[0].is_low_stock);
    }

    #[test]
    fn test_period_report_splits_entries_and_exits() {
        let central = warehouse("Farmacia central");
        let er = warehouse("Urgencias");
        let morphine = Medicine::new("MORFINA 10MG/ML", 5);
        let movements = vec![
            entry_of(&morphine, &central, 20, date(2024, 6, 1)),
            exit_of(&morphine, &central, 5, date(2024, 6, 10), "Ana"),
            exit_of(&morphine, &er, 7, date(2024, 6, 11), "Luis"),
            entry_of(&morphine, &central, 99, date(2024, 7, 1)),
        ];

        let june = DateRange::new(date(2024, 6, 1), date(2024, 6, 30));
        let report = period_report(&movements, june, None);
        assert_eq!(report.summary.total_movements, 3);
        assert_eq!(report.summary.units_in, 20);
        assert_eq!(report.summary.units_out, 12);
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.exits.len(), 2);

        let central_only = period_report(&movements, june, Some(central.id));
        assert_eq!(central_only.summary.total_movements, 2);
    }

    #[test]
    fn test_monthly_report_closing_stock() {
        let central = warehouse("Farmacia central");
        let er = warehouse("Urgencias");

        let mut morphine = Medicine::new("MORFINA 10MG/ML", 5);
        let movements = vec![
            entry_of(&morphine, &central, 30, date(2024, 5, 2)),
            entry_of(&morphine, &er, 10, date(2024, 5, 3)),
            exit_of(&morphine, &central, 5, date(2024, 6, 4), "Ana"),
        ];
        morphine = apply_movement(morphine, central.id, MovementType::Entry, 30);
        morphine = apply_movement(morphine, er.id, MovementType::Entry, 10);
        morphine = apply_movement(morphine, central.id, MovementType::Exit, 5);

        let may = monthly_report(&[morphine.clone()], &movements, 2024, 5, None).unwrap();
        assert_eq!(may.period.summary.total_movements, 2);
        assert_eq!(may.closing_stock[0].stock, 40);

        let may_central = monthly_report(&[morphine.clone()], &movements, 2024, 5, Some(central.id)).unwrap();
        assert_eq!(may_central.closing_stock[0].stock, 30);

        let june = monthly_report(&[morphine.clone()], &movements, 2024, 6, None).unwrap();
        assert_eq!(june.closing_stock[0].stock, 35);

        assert!(monthly_report(&[morphine], &movements, 2024, 13, None).is_none());
    }

    #[test]
    fn test_monthly_report_handles_leap_february() {
        let report = monthly_report(&[], &[], 2024, 2, None).unwrap();
        assert_eq!(report.period.range.end, date(2024, 2, 29));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// (day offset, is exit, quantity)
    fn movements_strategy() -> impl Strategy<Value = Vec<(i64, bool, u32)>> {
        prop::collection::vec((0i64..90, any::<bool>(), 1u32..500), 0..40)
    }

    fn build(steps: &[(i64, bool, u32)], medicine: &Medicine, warehouse: &Warehouse) -> Vec<Movement> {
        let origin = date(2024, 1, 1);
        steps
            .iter()
            .map(|(day, is_exit, qty)| {
                let on = origin + Duration::days(*day);
                if *is_exit {
                    exit_of(medicine, warehouse, *qty, on, "Paciente")
                } else {
                    entry_of(medicine, warehouse, *qty, on)
                }
            })
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property 10: Period Summary Counts Every Movement Once
        #[test]
        fn prop_period_summary_is_partition(steps in movements_strategy(), start in 0i64..90, len in 0i64..90) {
            let central = warehouse("Farmacia central");
            let medicine = Medicine::new("MORFINA 10MG/ML", 5);
            let movements = build(&steps, &medicine, &central);

            let origin = date(2024, 1, 1);
            let range = DateRange::new(origin + Duration::days(start), origin + Duration::days(start + len));
            let report = period_report(&movements, range, None);

            let expected = movements.iter().filter(|m| range.contains(m.date)).count();
            prop_assert_eq!(report.summary.total_movements, expected);
            prop_assert_eq!(report.entries.len() + report.exits.len(), expected);
            prop_assert_eq!(report.summary.total_entries, report.entries.len());
            prop_assert_eq!(
                report.summary.units_out,
                report.exits.iter().map(|m| u64::from(m.quantity)).sum::<u64>()
            );
        }

        /// Property 11: Filters Only Narrow
        /// Adding a criterion never returns a movement the looser filter dropped.
        #[test]
        fn prop_filters_only_narrow(steps in movements_strategy(), day in 0i64..90) {
            let central = warehouse("Farmacia central");
            let medicine = Medicine::new("MORFINA 10MG/ML", 5);
            let movements = build(&steps, &medicine, &central);

            let loose = MovementFilter {
                movement_type: Some(MovementType::Exit),
                ..Default::default()
            };
            let tight = MovementFilter {
                date: Some(date(2024, 1, 1) + Duration::days(day)),
                ..loose.clone()
            };

            let loose_ids: Vec<Uuid> = loose.apply(movements.clone()).iter().map(|m| m.id).collect();
            for m in tight.apply(movements) {
                prop_assert!(loose_ids.contains(&m.id));
            }
        }
    }
}
