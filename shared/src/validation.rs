//! Validation utilities for the Controlled Medicine Inventory
//!
//! Movement rules follow the pharmacy's controlled-substance book: every line
//! is dated in the open month and carries the regulatory metadata for its
//! direction.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Medicine, MovementDetails, NewMovement, Warehouse};
use crate::types::same_month;

/// A rejected form field, with English and Spanish messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
    pub message_es: &'static str,
}

impl FieldError {
    pub const fn new(field: &'static str, message: &'static str, message_es: &'static str) -> Self {
        Self {
            field,
            message,
            message_es,
        }
    }
}

// ============================================================================
// Movement Validations
// ============================================================================

/// Validate movement quantity is a positive number of units
pub fn validate_quantity(quantity: u32) -> Result<(), FieldError> {
    if quantity == 0 {
        return Err(FieldError::new(
            "quantity",
            "Quantity must be greater than zero",
            "La cantidad debe ser mayor que cero",
        ));
    }
    Ok(())
}

/// Movements can only be dated inside the current calendar month
pub fn validate_movement_date(date: NaiveDate, today: NaiveDate) -> Result<(), FieldError> {
    if !same_month(date, today) {
        return Err(FieldError::new(
            "date",
            "Movement date must be in the current month",
            "La fecha del movimiento debe estar en el mes actual",
        ));
    }
    Ok(())
}

/// Validate the type-specific regulatory fields
pub fn validate_movement_details(details: &MovementDetails) -> Result<(), FieldError> {
    match details {
        MovementDetails::Entry {
            justification,
            invoice_number,
        } => {
            let has_invoice = invoice_number
                .as_deref()
                .is_some_and(|n| !n.trim().is_empty());
            if justification.requires_invoice() && !has_invoice {
                return Err(FieldError::new(
                    "invoice_number",
                    "Invoice number is required for purchases",
                    "El número de factura es obligatorio para compras",
                ));
            }
        }
        MovementDetails::Exit {
            patient_name,
            patient_document,
            ..
        } => {
            if patient_name.trim().is_empty() {
                return Err(FieldError::new(
                    "patient_name",
                    "Patient name is required",
                    "El nombre del paciente es obligatorio",
                ));
            }
            if patient_document.trim().is_empty() {
                return Err(FieldError::new(
                    "patient_document",
                    "Patient document is required",
                    "El documento del paciente es obligatorio",
                ));
            }
        }
    }
    Ok(())
}

/// Validate a movement request and resolve its effective date.
///
/// A missing date defaults to `today`.
pub fn validate_new_movement(
    movement: &NewMovement,
    today: NaiveDate,
) -> Result<NaiveDate, FieldError> {
    validate_quantity(movement.quantity)?;
    let date = movement.date.unwrap_or(today);
    validate_movement_date(date, today)?;
    validate_movement_details(&movement.details)?;
    Ok(date)
}

/// Movements may only reference active medicines and warehouses
pub fn validate_movement_targets(
    medicine: &Medicine,
    warehouse: &Warehouse,
) -> Result<(), FieldError> {
    if !medicine.is_active {
        return Err(FieldError::new(
            "medicine_id",
            "Medicine is inactive",
            "El medicamento está inactivo",
        ));
    }
    if !warehouse.is_active {
        return Err(FieldError::new(
            "warehouse_id",
            "Warehouse is inactive",
            "La bodega está inactiva",
        ));
    }
    Ok(())
}

// ============================================================================
// Catalogue Validations
// ============================================================================

/// Validate low-stock threshold is at least one unit
pub fn validate_threshold(threshold: u32) -> Result<(), &'static str> {
    if threshold < 1 {
        return Err("Low stock threshold must be at least 1");
    }
    Ok(())
}

/// Validate a catalogue name (medicine or warehouse)
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required");
    }
    if trimmed.chars().count() > 200 {
        return Err("Name must be at most 200 characters");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err("Invalid email format"),
    }
}

/// Validate username: 3-50 characters, letters, digits, dot, dash or underscore
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err("Username must be between 3 and 50 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err("Username may only contain letters, digits, '.', '-' and '_'");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}
