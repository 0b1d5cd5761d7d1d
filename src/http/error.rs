//! Handler failures.

use thiserror::Error;

use crate::http::request::ExtensionError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Status of every response produced by a failed middleware or route.
pub const HANDLER_FAILURE_STATUS: u16 = 500;

/// Failure returned by a middleware or route handler.
///
/// Aborts the chain and always answers [`HANDLER_FAILURE_STATUS`]. The client
/// sees `message`; `source` stays on the server and is only logged.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

pub type HandlerResult = Result<(), HandlerError>;

impl HandlerError {
    /// A failure with a client-facing message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying cause. It is never sent to the client.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<ExtensionError> for HandlerError {
    fn from(err: ExtensionError) -> Self {
        Self::new(err.to_string()).with_source(err)
    }
}
