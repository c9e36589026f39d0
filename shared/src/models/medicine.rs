//! Medicine and stock models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Units on hand per warehouse. A key exists only for warehouses that have
/// held this medicine at some point; a present key may hold zero.
pub type WarehouseStock = BTreeMap<Uuid, u32>;

/// A controlled medicine and its materialised stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medicine {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    /// Alert when the total falls below this value (always >= 1)
    pub low_stock_threshold: u32,
    pub warehouse_stock: WarehouseStock,
    /// Always equal to the sum of `warehouse_stock`
    pub current_stock: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Medicine {
    /// A freshly catalogued medicine with no stock anywhere
    pub fn new(name: impl Into<String>, low_stock_threshold: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            is_active: true,
            low_stock_threshold,
            warehouse_stock: WarehouseStock::new(),
            current_stock: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Units on hand in one warehouse (zero when the key is absent)
    pub fn stock_in(&self, warehouse_id: Uuid) -> u32 {
        self.warehouse_stock.get(&warehouse_id).copied().unwrap_or(0)
    }

    pub fn is_low_stock(&self) -> bool {
        self.current_stock < self.low_stock_threshold
    }

    /// Checks the materialised-total invariant
    pub fn is_consistent(&self) -> bool {
        self.current_stock == crate::ledger::total_stock(&self.warehouse_stock)
    }
}
