//! HTTP request handlers

pub mod audit;
pub mod auth;
pub mod health;
pub mod medicine;
pub mod movement;
pub mod reporting;
pub mod user;
pub mod warehouse;

pub use audit::*;
pub use auth::*;
pub use health::*;
pub use medicine::*;
pub use movement::*;
pub use reporting::{get_dashboard, get_inventory, get_monthly_report, get_period_report, get_reconciliation};
pub use user::*;
pub use warehouse::*;
