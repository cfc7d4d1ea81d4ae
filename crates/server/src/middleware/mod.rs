//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS
//! 5. Rate limiting (governor) on the credential routes only

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::RequireUser;
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
