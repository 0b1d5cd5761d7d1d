//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Parsed request:
//!     → cors.rs (origin check, CORS headers; also on OPTIONS preflight)
//!     → rate_limit.rs (middleware, per-IP sliding window)
//!     → route handler
//! Normal response:
//!     → headers.rs (security headers, when enabled)
//! ```
//!
//! # Design Decisions
//! - These are collaborators of the core: they only see the request /
//!   response pair and the middleware contract
//! - The rate limiter's cleanup holds its lock only while pruning

pub mod cors;
pub mod headers;
pub mod rate_limit;

pub use cors::CorsOptions;
pub use rate_limit::{rate_limit_middleware, RateLimiter};
