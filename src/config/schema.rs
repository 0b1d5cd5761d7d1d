//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::http::parser::HeadLimits;
use crate::security::cors::CorsOptions;

/// Body size limit applied when no explicit `max_request_size` is configured.
pub const DEFAULT_MAX_REQUEST_SIZE: u64 = 10 * 1024 * 1024;

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// TLS termination. Plain HTTP when absent.
    pub tls: Option<TlsConfig>,

    /// Per-connection deadlines.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// CORS collaborator settings. Disabled when absent.
    pub cors: Option<CorsOptions>,

    /// Security header injection.
    pub security: SecurityConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Event-stream settings.
    pub streams: StreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Certificate chain and private key, both PEM.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Deadlines armed once per accepted connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Read deadline in seconds, measured from accept. `None` or 0 disables it.
    pub read_secs: Option<u64>,

    /// Write deadline in seconds, measured from accept. `None` or 0 disables it.
    pub write_secs: Option<u64>,

    /// How long shutdown waits for active connections to finish.
    pub drain_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: None,
            write_secs: None,
            drain_secs: 5,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Explicit cap on bytes read per connection and on accepted body length.
    pub max_request_size: Option<u64>,

    /// Longest request line or header line, in bytes.
    pub max_line_bytes: usize,

    /// Most header lines accepted in one request.
    pub max_headers: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let head = HeadLimits::default();
        Self {
            max_request_size: None,
            max_line_bytes: head.max_line_bytes,
            max_headers: head.max_headers,
        }
    }
}

impl LimitsConfig {
    /// Largest body length the parser will accept.
    pub fn body_limit(&self) -> u64 {
        self.max_request_size.unwrap_or(DEFAULT_MAX_REQUEST_SIZE)
    }

    pub fn head_limits(&self) -> HeadLimits {
        HeadLimits {
            max_line_bytes: self.max_line_bytes,
            max_headers: self.max_headers,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SecurityConfig {
    /// Add the standard security headers to every normal response.
    pub headers: bool,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests allowed per client within one window.
    pub requests: usize,

    /// Window length in seconds (also the cleanup interval).
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests: 100,
            window_secs: 60,
        }
    }
}

/// Event-stream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Messages buffered per stream before a push is treated as blocked.
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { channel_capacity: 16 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log line format.
    pub log_format: LogFormat,

    /// Expose a Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Full,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Full,
    Compact,
}
