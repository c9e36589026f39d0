//! Movement validation tests
//!
//! Tests for the rules applied before a movement reaches the ledger:
//! - Property 8: Quantity Must Be Positive
//! - Property 9: Movements Are Dated In The Open Month

use chrono::{Datelike, Duration, NaiveDate, Utc};
use proptest::prelude::*;
use shared::{
    validate_movement_date, validate_movement_targets, validate_new_movement, validate_quantity,
    EntryJustification, Medicine, MovementDetails, NewMovement, Warehouse,
};
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn entry(justification: EntryJustification, invoice: Option<&str>) -> MovementDetails {
    MovementDetails::Entry {
        justification,
        invoice_number: invoice.map(str::to_string),
    }
}

fn exit(patient_name: &str, patient_document: &str) -> MovementDetails {
    MovementDetails::Exit {
        patient_name: patient_name.to_string(),
        patient_document: patient_document.to_string(),
        prescription_number: None,
    }
}

fn request(quantity: u32, on: Option<NaiveDate>, details: MovementDetails) -> NewMovement {
    NewMovement {
        medicine_id: Uuid::new_v4(),
        warehouse_id: Uuid::new_v4(),
        quantity,
        date: on,
        details,
    }
}

fn warehouse(is_active: bool) -> Warehouse {
    Warehouse {
        id: Uuid::new_v4(),
        name: "Ambulancia 1".to_string(),
        description: None,
        is_active,
        created_at: Utc::now(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_missing_date_defaults_to_today() {
        let today = date(2024, 6, 18);
        let resolved = validate_new_movement(
            &request(5, None, entry(EntryJustification::Transfer, None)),
            today,
        );
        assert_eq!(resolved, Ok(today));
    }

    #[test]
    fn test_backdating_inside_month_allowed() {
        let today = date(2024, 6, 18);
        let resolved = validate_new_movement(
            &request(5, Some(date(2024, 6, 1)), exit("Luis Gómez", "79000111")),
            today,
        );
        assert_eq!(resolved, Ok(date(2024, 6, 1)));
    }

    #[test]
    fn test_previous_month_rejected() {
        let err = validate_new_movement(
            &request(5, Some(date(2024, 5, 31)), exit("Luis Gómez", "79000111")),
            date(2024, 6, 1),
        )
        .unwrap_err();
        assert_eq!(err.field, "date");
    }

    #[test]
    fn test_same_day_next_year_rejected() {
        assert!(validate_movement_date(date(2025, 6, 18), date(2024, 6, 18)).is_err());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let err = validate_quantity(0).unwrap_err();
        assert_eq!(err.field, "quantity");
        assert!(!err.message_es.is_empty());
    }

    #[test]
    fn test_purchase_requires_invoice() {
        let today = date(2024, 6, 18);
        let err = validate_new_movement(&request(5, None, entry(EntryJustification::Purchase, None)), today)
            .unwrap_err();
        assert_eq!(err.field, "invoice_number");

        let blank = validate_new_movement(
            &request(5, None, entry(EntryJustification::Purchase, Some("   "))),
            today,
        );
        assert!(blank.is_err());

        let ok = validate_new_movement(
            &request(5, None, entry(EntryJustification::Purchase, Some("FV-2024-118"))),
            today,
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_only_purchase_requires_invoice() {
        for justification in EntryJustification::ALL {
            assert_eq!(
                justification.requires_invoice(),
                justification == EntryJustification::Purchase
            );
        }
    }

    #[test]
    fn test_exit_requires_patient_fields() {
        let today = date(2024, 6, 18);
        let no_name = validate_new_movement(&request(1, None, exit("  ", "79000111")), today).unwrap_err();
        assert_eq!(no_name.field, "patient_name");

        let no_document = validate_new_movement(&request(1, None, exit("Ana Ríos", "")), today).unwrap_err();
        assert_eq!(no_document.field, "patient_document");
    }

    #[test]
    fn test_inactive_targets_rejected() {
        let active = Medicine::new("MORFINA 10MG/ML", 5);
        let mut inactive = active.clone();
        inactive.is_active = false;

        assert!(validate_movement_targets(&active, &warehouse(true)).is_ok());
        assert_eq!(
            validate_movement_targets(&inactive, &warehouse(true)).unwrap_err().field,
            "medicine_id"
        );
        assert_eq!(
            validate_movement_targets(&active, &warehouse(false)).unwrap_err().field,
            "warehouse_id"
        );
    }

    /// Request JSON carries the type tag next to the common fields
    #[test]
    fn test_new_movement_json_shape() {
        let json = serde_json::json!({
            "medicine_id": Uuid::new_v4(),
            "warehouse_id": Uuid::new_v4(),
            "quantity": 2,
            "type": "exit",
            "patient_name": "Ana Ríos",
            "patient_document": "52111222",
            "prescription_number": "RX-55"
        });

        let parsed: NewMovement = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.date, None);
        assert_eq!(parsed.details.patient_name(), Some("Ana Ríos"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property 8: Quantity Must Be Positive
        #[test]
        fn prop_positive_quantities_accepted(quantity in 1u32..u32::MAX) {
            prop_assert!(validate_quantity(quantity).is_ok());
        }

        /// Property 9: Movements Are Dated In The Open Month
        /// A date is accepted exactly when it shares year and month with today.
        #[test]
        fn prop_date_accepted_iff_same_month(offset in -400i64..400, day in 1u32..=28) {
            let today = date(2024, 6, day);
            let candidate = today + Duration::days(offset);

            let accepted = validate_movement_date(candidate, today).is_ok();
            let same_month = candidate.year() == 2024 && candidate.month() == 6;
            prop_assert_eq!(accepted, same_month);
        }
    }
}
