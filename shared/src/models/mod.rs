//! Domain models for the Controlled Medicine Inventory

mod audit;
mod medicine;
mod movement;
mod user;
mod warehouse;

pub use audit::*;
pub use medicine::*;
pub use movement::*;
pub use user::*;
pub use warehouse::*;
