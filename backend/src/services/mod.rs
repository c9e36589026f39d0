//! Business logic services for the Controlled Medicine Inventory

pub mod audit;
pub mod auth;
pub mod medicine;
pub mod movement;
pub mod reporting;
pub mod session;
pub mod user;
pub mod warehouse;

pub use audit::AuditService;
pub use auth::AuthService;
pub use medicine::MedicineService;
pub use movement::MovementService;
pub use reporting::ReportingService;
pub use session::{InactivityWatchdog, SessionRegistry};
pub use user::UserService;
pub use warehouse::WarehouseService;
