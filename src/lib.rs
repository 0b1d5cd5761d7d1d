//! Minimal HTTP/1.1 server engine.
//!
//! Parses requests straight off the socket, resolves them against a tree of
//! routers, middleware and routes, runs the matched chain and writes the
//! response back, including long-lived Server-Sent-Events streams.
//!
//! ```text
//!  listener ──▶ connection task ──▶ parser ──▶ resolver ──▶ middleware… route
//!                                                                   │
//!                      close ◀── writer ◀──────────────────────────┤
//!                                                                   ▼
//!               EventStreamRegistry ──push──▶ streaming task (data: …\n\n)
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::ServerConfig;
pub use http::{
    EventStreamRegistry, HandlerError, HandlerResult, HttpServer, Request, Response,
};
pub use lifecycle::Shutdown;
pub use routing::{Middleware, Router};
