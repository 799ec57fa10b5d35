//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request span)
//! 3. Request ID
//! 4. CORS
//! 5. Security headers
//! 6. Rate limiting (under `/api` only)
//!
//! Authentication is per handler through the [`RequireAuth`] and
//! [`OptionalAuth`] extractors.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{OptionalAuth, RequireAuth};
pub use rate_limit::{RateLimitPolicy, RateLimiter, rate_limit_middleware};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
