//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop)
//!     → tls.rs (optional handshake, inside the connection task)
//!     → connection.rs (id, state machine, active tracking)
//!     → timeouts.rs (read/write deadlines armed once)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - One task per connection, no pooling or backpressure
//! - Each connection tracked for graceful shutdown

pub mod connection;
pub mod listener;
pub mod timeouts;
pub mod tls;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionState, ConnectionTracker};
pub use listener::{Listener, ListenerError};
pub use timeouts::{DeadlineExceeded, Deadlines};
pub use tls::{load_tls_acceptor, TlsError};
