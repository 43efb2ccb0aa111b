//! Request/response middleware, applied by [`App`](crate::http::App) in order:
//! request id, metrics, security headers, CORS, body limit, rate limit.

pub mod body_limit;
pub mod cors;
pub mod rate_limit;
pub mod request_id;
pub mod security;

pub use body_limit::BodyCheck;
pub use cors::CorsPolicy;
pub use rate_limit::{client_key, FixedWindowLimiter, RateDecision};
pub use security::SECURITY_HEADERS;
