//! HTTP API layer for agora.
//!
//! - **Endpoints**: JSON REST API mounted under `/api`
//! - **Extractors**: Authenticated caller
//! - **Middleware**: Session authentication, rate limiting
//! - **Views**: camelCase projections of core results
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod rate_limit;
pub mod response;
pub mod views;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
pub use rate_limit::{ApiRateLimiter, RateLimitConfig, RateLimiterState, rate_limit_middleware};
