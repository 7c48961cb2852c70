//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (when origins are configured)
//! 5. Session layer on cart routes (tower-sessions with `PostgreSQL` store)
//! 6. Rate limiting on auth routes (governor)

pub mod auth;
pub mod client_info;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{AuthRejection, AuthUser, RequireAdmin, RequireAuth, RequireStaff};
pub use client_info::ClientInfo;
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
