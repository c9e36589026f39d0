//! WebAssembly module for the Controlled Medicine Inventory
//!
//! Provides client-side computation for:
//! - Role gating of pages and actions
//! - Stock previews before a movement is submitted
//! - Month-end stock reconstruction
//! - Movement form validation

use chrono::NaiveDate;
use serde::Serialize;
use shared::{ExitPolicy, MovementType};
use uuid::Uuid;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("controlled inventory bindings loaded"));
}

#[derive(Serialize)]
struct MovementPreview<'a> {
    medicine: &'a Medicine,
    clamped_quantity: u32,
}

fn parse_capability(capability: &str) -> Result<Capability, String> {
    Capability::ALL
        .into_iter()
        .find(|c| c.as_str() == capability)
        .ok_or_else(|| format!("Unknown capability: {}", capability))
}

fn parse_uuid(value: &str, field: &str) -> Result<Uuid, String> {
    Uuid::parse_str(value).map_err(|e| format!("Invalid {}: {}", field, e))
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, String> {
    value
        .parse::<NaiveDate>()
        .map_err(|e| format!("Invalid {}: {}", field, e))
}

fn check_access(role: &str, capability: &str) -> Result<bool, String> {
    let role = role.parse::<Role>().map_err(|e| e.to_string())?;
    Ok(shared::can_access(role, parse_capability(capability)?))
}

fn preview_movement(
    medicine_json: &str,
    warehouse_id: &str,
    movement_type: &str,
    quantity: u32,
    policy: &str,
) -> Result<String, String> {
    let medicine: Medicine = serde_json::from_str(medicine_json)
        .map_err(|e| format!("Invalid medicine JSON: {}", e))?;
    let warehouse_id = parse_uuid(warehouse_id, "warehouse id")?;
    let movement_type = movement_type
        .parse::<MovementType>()
        .map_err(|e| e.to_string())?;
    let policy = match policy {
        "reject" => ExitPolicy::Reject,
        "clamp" => ExitPolicy::Clamp,
        other => return Err(format!("Unknown exit policy: {}", other)),
    };

    let applied = shared::apply_with_policy(medicine, warehouse_id, movement_type, quantity, policy)
        .map_err(|e| e.to_string())?;

    serde_json::to_string(&MovementPreview {
        medicine: &applied.medicine,
        clamped_quantity: applied.clamped_quantity,
    })
    .map_err(|e| e.to_string())
}

fn reconstruct(
    movements_json: &str,
    medicine_json: &str,
    period_end: &str,
    warehouse_id: Option<String>,
) -> Result<u32, String> {
    let movements: Vec<Movement> = serde_json::from_str(movements_json)
        .map_err(|e| format!("Invalid movements JSON: {}", e))?;
    let medicine: Medicine = serde_json::from_str(medicine_json)
        .map_err(|e| format!("Invalid medicine JSON: {}", e))?;
    let period_end = parse_date(period_end, "period end")?;

    Ok(match warehouse_id.as_deref().filter(|w| !w.is_empty()) {
        Some(w) => shared::reconstruct_warehouse_stock(
            &movements,
            &medicine,
            parse_uuid(w, "warehouse id")?,
            period_end,
        ),
        None => shared::reconstruct_end_of_period_stock(&movements, &medicine, period_end),
    })
}

/// Validation failure as JSON, so forms can highlight the field
fn check_movement(movement_json: &str, today: &str) -> Result<String, String> {
    let movement: NewMovement = serde_json::from_str(movement_json)
        .map_err(|e| format!("Invalid movement JSON: {}", e))?;
    let today = parse_date(today, "today")?;

    match validate_new_movement(&movement, today) {
        Ok(date) => Ok(date.to_string()),
        Err(field_error) => Err(serde_json::to_string(&field_error).map_err(|e| e.to_string())?),
    }
}

/// Whether a role may use a capability (e.g. `"operator"`, `"manage_medicines"`)
#[wasm_bindgen]
pub fn can_access(role: &str, capability: &str) -> Result<bool, JsValue> {
    check_access(role, capability).map_err(|e| JsValue::from_str(&e))
}

/// Capability names granted to a role
#[wasm_bindgen]
pub fn role_capabilities(role: &str) -> Result<js_sys::Array, JsValue> {
    let role = role
        .parse::<Role>()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    Ok(role
        .capabilities()
        .iter()
        .map(|c| JsValue::from_str(c.as_str()))
        .collect())
}

/// Stock after a movement, as `{ medicine, clamped_quantity }` JSON
#[wasm_bindgen]
pub fn apply_movement_preview(
    medicine_json: &str,
    warehouse_id: &str,
    movement_type: &str,
    quantity: u32,
    policy: &str,
) -> Result<String, JsValue> {
    preview_movement(medicine_json, warehouse_id, movement_type, quantity, policy)
        .map_err(|e| JsValue::from_str(&e))
}

/// Stock at the end of `period_end`, optionally for one warehouse
#[wasm_bindgen]
pub fn reconstruct_stock(
    movements_json: &str,
    medicine_json: &str,
    period_end: &str,
    warehouse_id: Option<String>,
) -> Result<u32, JsValue> {
    reconstruct(movements_json, medicine_json, period_end, warehouse_id)
        .map_err(|e| JsValue::from_str(&e))
}

/// Resolved movement date on success; the field error JSON on failure
#[wasm_bindgen]
pub fn validate_movement(movement_json: &str, today: &str) -> Result<String, JsValue> {
    check_movement(movement_json, today).map_err(|e| JsValue::from_str(&e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn medicine_json(warehouse_id: Uuid, stock: u32) -> String {
        let medicine = shared::apply_movement(
            Medicine::new("MORFINA 10MG/ML", 5),
            warehouse_id,
            MovementType::Entry,
            stock,
        );
        serde_json::to_string(&medicine).unwrap()
    }

    #[test]
    fn test_check_access() {
        assert_eq!(check_access("operator", "manage_movements"), Ok(true));
        assert_eq!(check_access("supervisor", "manage_users"), Ok(false));
        assert!(check_access("owner", "manage_users").is_err());
        assert!(check_access("operator", "delete_everything").is_err());
    }

    #[test]
    fn test_preview_movement() {
        let w = Uuid::new_v4();
        let json = medicine_json(w, 10);

        let preview = preview_movement(&json, &w.to_string(), "exit", 4, "reject").unwrap();
        let value: serde_json::Value = serde_json::from_str(&preview).unwrap();
        assert_eq!(value["medicine"]["current_stock"], 6);
        assert_eq!(value["clamped_quantity"], 0);

        assert!(preview_movement(&json, &w.to_string(), "exit", 11, "reject").is_err());

        let clamped = preview_movement(&json, &w.to_string(), "exit", 11, "clamp").unwrap();
        let value: serde_json::Value = serde_json::from_str(&clamped).unwrap();
        assert_eq!(value["clamped_quantity"], 1);
    }

    #[test]
    fn test_reconstruct_without_movements_returns_current() {
        let w = Uuid::new_v4();
        let json = medicine_json(w, 12);

        assert_eq!(reconstruct("[]", &json, "2024-02-29", None), Ok(12));
        assert_eq!(reconstruct("[]", &json, "2024-02-29", Some(w.to_string())), Ok(12));
        assert!(reconstruct("[]", &json, "29/02/2024", None).is_err());
    }

    #[test]
    fn test_check_movement() {
        let movement = serde_json::json!({
            "medicine_id": Uuid::new_v4(),
            "warehouse_id": Uuid::new_v4(),
            "quantity": 3,
            "type": "entry",
            "justification": "purchase"
        })
        .to_string();

        let err = check_movement(&movement, "2024-06-18").unwrap_err();
        assert!(err.contains("invoice_number"));

        let exit = serde_json::json!({
            "medicine_id": Uuid::new_v4(),
            "warehouse_id": Uuid::new_v4(),
            "quantity": 3,
            "date": "2024-06-02",
            "type": "exit",
            "patient_name": "Ana Ríos",
            "patient_document": "52111222"
        })
        .to_string();
        assert_eq!(check_movement(&exit, "2024-06-18"), Ok("2024-06-02".to_string()));
    }
}
