//! Audit trail models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;

/// Category tag of an audit entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Login,
    Logout,
    Create,
    Update,
    Delete,
    Movement,
}

impl AuditCategory {
    pub const ALL: [AuditCategory; 6] = [
        AuditCategory::Login,
        AuditCategory::Logout,
        AuditCategory::Create,
        AuditCategory::Update,
        AuditCategory::Delete,
        AuditCategory::Movement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditCategory::Login => "login",
            AuditCategory::Logout => "logout",
            AuditCategory::Create => "create",
            AuditCategory::Update => "update",
            AuditCategory::Delete => "delete",
            AuditCategory::Movement => "movement",
        }
    }
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("audit category", s))
    }
}

/// Append-only record of a user action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub action: String,
    pub details: String,
    pub category: AuditCategory,
    pub timestamp: DateTime<Utc>,
}

/// An audit event before it is stored
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub user_id: Uuid,
    pub user_name: String,
    pub action: String,
    pub details: String,
    pub category: AuditCategory,
}

impl AuditEvent {
    pub fn new(
        user_id: Uuid,
        user_name: impl Into<String>,
        category: AuditCategory,
        action: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            user_name: user_name.into(),
            action: action.into(),
            details: details.into(),
            category,
        }
    }
}
