//! Domain models for the Controlled Medicine Inventory
//!
//! Re-exports models from the shared crate; database row types live next to
//! the services that read them.

pub use shared::models::*;
