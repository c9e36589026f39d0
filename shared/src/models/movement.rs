//! Stock movement (ledger) models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;

/// Direction of a movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Inbound, increases stock
    Entry,
    /// Outbound, decreases stock
    Exit,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entry => "entry",
            MovementType::Exit => "exit",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry" => Ok(MovementType::Entry),
            "exit" => Ok(MovementType::Exit),
            other => Err(UnknownVariant::new("movement type", other)),
        }
    }
}

/// Regulatory reason recorded on every entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntryJustification {
    Purchase,
    Return,
    WriteOffRecovery,
    Transfer,
    InventoryAdjustment,
    OpeningBalance,
}

impl EntryJustification {
    pub const ALL: [EntryJustification; 6] = [
        EntryJustification::Purchase,
        EntryJustification::Return,
        EntryJustification::WriteOffRecovery,
        EntryJustification::Transfer,
        EntryJustification::InventoryAdjustment,
        EntryJustification::OpeningBalance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryJustification::Purchase => "purchase",
            EntryJustification::Return => "return",
            EntryJustification::WriteOffRecovery => "write_off_recovery",
            EntryJustification::Transfer => "transfer",
            EntryJustification::InventoryAdjustment => "inventory_adjustment",
            EntryJustification::OpeningBalance => "opening_balance",
        }
    }

    /// Human label used on reports
    pub fn label(&self) -> &'static str {
        match self {
            EntryJustification::Purchase => "Purchase",
            EntryJustification::Return => "Return",
            EntryJustification::WriteOffRecovery => "Write-off recovery",
            EntryJustification::Transfer => "Transfer",
            EntryJustification::InventoryAdjustment => "Inventory adjustment",
            EntryJustification::OpeningBalance => "Opening balance",
        }
    }

    /// Purchases must carry the supplier invoice number
    pub fn requires_invoice(&self) -> bool {
        matches!(self, EntryJustification::Purchase)
    }
}

impl fmt::Display for EntryJustification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EntryJustification {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryJustification::ALL
            .into_iter()
            .find(|j| j.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("entry justification", s))
    }
}

/// Type-specific regulatory metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MovementDetails {
    Entry {
        justification: EntryJustification,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        invoice_number: Option<String>,
    },
    Exit {
        patient_name: String,
        patient_document: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prescription_number: Option<String>,
    },
}

impl MovementDetails {
    pub fn movement_type(&self) -> MovementType {
        match self {
            MovementDetails::Entry { .. } => MovementType::Entry,
            MovementDetails::Exit { .. } => MovementType::Exit,
        }
    }

    pub fn justification(&self) -> Option<EntryJustification> {
        match self {
            MovementDetails::Entry { justification, .. } => Some(*justification),
            MovementDetails::Exit { .. } => None,
        }
    }

    pub fn patient_name(&self) -> Option<&str> {
        match self {
            MovementDetails::Exit { patient_name, .. } => Some(patient_name),
            MovementDetails::Entry { .. } => None,
        }
    }
}

/// One append-only ledger line. Names are snapshots taken when the movement
/// was recorded and stay valid even if the referenced record is renamed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movement {
    pub id: Uuid,
    pub medicine_id: Uuid,
    pub medicine_name: String,
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub quantity: u32,
    /// Units of an exit that were not on hand and therefore not removed
    #[serde(default)]
    pub clamped_quantity: u32,
    pub date: NaiveDate,
    pub user_id: Uuid,
    pub user_name: String,
    #[serde(flatten)]
    pub details: MovementDetails,
    pub created_at: DateTime<Utc>,
}

impl Movement {
    pub fn movement_type(&self) -> MovementType {
        self.details.movement_type()
    }

    pub fn is_entry(&self) -> bool {
        self.movement_type() == MovementType::Entry
    }

    pub fn is_exit(&self) -> bool {
        self.movement_type() == MovementType::Exit
    }

    /// Units that actually changed the stock
    pub fn effective_quantity(&self) -> u32 {
        self.quantity.saturating_sub(self.clamped_quantity)
    }

    /// Signed change this movement applied to the stock
    pub fn signed_effect(&self) -> i64 {
        match self.movement_type() {
            MovementType::Entry => i64::from(self.effective_quantity()),
            MovementType::Exit => -i64::from(self.effective_quantity()),
        }
    }
}

/// Request to record a movement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMovement {
    pub medicine_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: u32,
    /// Defaults to today
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(flatten)]
    pub details: MovementDetails,
}
