//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration, login, profile updates, access tokens
//! - `audit` - Queued audit trail writer
//! - `backup` - `pg_dump`/`psql` backups and their metadata
//! - `cart` - Session-backed shopping cart

pub mod audit;
pub mod auth;
pub mod backup;
pub mod cart;

pub use audit::{AuditLogger, AuditSink};
pub use auth::{AuthError, AuthService, Claims, JwtKeys};
pub use backup::{BackupError, BackupService};
pub use cart::{Cart, CartView};
