//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     get/post/.../middleware/nest
//!     → stack.rs (tree of StackNode, patterns validated)
//!     → frozen inside the server, shared read-only
//!
//! Per request:
//!     (method, path)
//!     → resolver.rs (depth-first walk, first match wins)
//!     → [middleware..., route] + bound path parameters, or no match
//! ```
//!
//! # Design Decisions
//! - Node kinds form a closed enum; traversal is an exhaustive match
//! - No wildcard segments: segment counts must agree exactly
//! - Deterministic: same input always resolves to the same chain

pub mod path;
pub mod resolver;
pub mod stack;

pub use path::{validate_path, RoutePatternError};
pub use resolver::{resolve, Step};
pub use stack::{Handler, Middleware, Route, Router, StackNode};
