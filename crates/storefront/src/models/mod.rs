//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the `sqlx` row types
//! that live next to each repository. All of them serialize with the field
//! names the SPA expects.

pub mod audit;
pub mod backup;
pub mod catalog;
pub mod order;
pub mod payment;
pub mod user;

pub use audit::{AuditLogEntry, AuditStats, NewAuditEntry};
pub use backup::{BackupRecord, BackupSummary};
pub use catalog::{Category, CategoryInput, Manufacturer, ManufacturerInput, Product, ProductInput};
pub use order::{NewAddress, NewOrder, Order, OrderItem, OrderLine};
pub use payment::Payment;
pub use user::{NewUser, ProfileUpdate, User};
