//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacities > 0, windows > 0)
//! - Check addresses parse before anything binds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address {0:?}")]
    BindAddress(String),

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("limits.max_request_size must be greater than zero")]
    ZeroRequestSize,

    #[error("limits.{0} must be greater than zero")]
    HeadLimit(&'static str),

    #[error("streams.channel_capacity must be greater than zero")]
    ZeroStreamCapacity,

    #[error("rate_limit.{0} must be greater than zero")]
    RateLimit(&'static str),

    #[error("cors.origins must not be empty")]
    EmptyCorsOrigins,

    #[error("tls.{0} must not be empty")]
    TlsPath(&'static str),
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.limits.max_request_size == Some(0) {
        errors.push(ValidationError::ZeroRequestSize);
    }

    if config.limits.max_line_bytes == 0 {
        errors.push(ValidationError::HeadLimit("max_line_bytes"));
    }
    if config.limits.max_headers == 0 {
        errors.push(ValidationError::HeadLimit("max_headers"));
    }

    if config.streams.channel_capacity == 0 {
        errors.push(ValidationError::ZeroStreamCapacity);
    }

    if config.rate_limit.enabled {
        if config.rate_limit.requests == 0 {
            errors.push(ValidationError::RateLimit("requests"));
        }
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::RateLimit("window_secs"));
        }
    }

    if let Some(cors) = &config.cors {
        if cors.origins.is_empty() {
            errors.push(ValidationError::EmptyCorsOrigins);
        }
    }

    if let Some(tls) = &config.tls {
        if tls.cert_path.as_os_str().is_empty() {
            errors.push(ValidationError::TlsPath("cert_path"));
        }
        if tls.key_path.as_os_str().is_empty() {
            errors.push(ValidationError::TlsPath("key_path"));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
