//! Shared types and models for the Controlled Medicine Inventory
//!
//! This crate contains the domain model and the pure stock ledger logic shared
//! between the backend, the browser (via WASM), and the test suites.

pub mod ledger;
pub mod models;
pub mod reports;
pub mod types;
pub mod validation;

pub use ledger::*;
pub use models::*;
pub use types::*;
pub use validation::*;
