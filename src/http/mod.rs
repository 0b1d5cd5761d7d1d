//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → parser.rs (request line + headers)
//!     → [routing::resolve builds the execution list]
//!     → server.rs (runs middleware, reads body, runs route)
//!     → writer.rs (normal response, or SSE head + frames)
//!     → close, or hold open while the event stream lives
//!
//! Application code
//!     → event_stream.rs (push into an open stream by identifier)
//! ```

pub mod error;
pub mod event_stream;
pub mod parser;
pub mod request;
pub mod response;
pub mod server;
pub mod writer;

pub use error::{HandlerError, HandlerResult};
pub use event_stream::{EventStream, EventStreamRegistry, PushOutcome};
pub use request::{ExtensionError, Extensions, PathParams, QueryParams, Request};
pub use response::{Headers, Response};
pub use server::HttpServer;
