//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.timeouts.read_secs, None);
        assert_eq!(config.limits.max_request_size, None);
        assert_eq!(config.streams.channel_capacity, 16);
        assert!(config.cors.is_none());
        assert!(config.tls.is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:3000"

            [timeouts]
            read_secs = 10
            write_secs = 15

            [tls]
            cert_path = "certs/server.pem"
            key_path = "certs/server.key"

            [limits]
            max_request_size = 1048576
            max_headers = 32

            [cors]
            origins = ["https://example.com"]
            allow_credentials = true

            [security]
            headers = true

            [observability]
            log_format = "compact"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:3000");
        assert_eq!(config.timeouts.read_secs, Some(10));
        assert_eq!(config.timeouts.write_secs, Some(15));
        assert_eq!(config.limits.body_limit(), 1_048_576);
        assert_eq!(config.limits.max_headers, 32);
        assert_eq!(config.limits.max_line_bytes, 8 * 1024);
        let tls = config.tls.unwrap();
        assert_eq!(tls.cert_path, Path::new("certs/server.pem"));
        assert_eq!(tls.key_path, Path::new("certs/server.key"));
        let cors = config.cors.unwrap();
        assert_eq!(cors.origins, vec!["https://example.com".to_string()]);
        assert!(cors.allow_credentials);
        assert!(config.security.headers);
        assert_eq!(config.observability.log_format, LogFormat::Compact);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = parse_config("[listener\nbind_address = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn semantic_problems_are_reported_together() {
        let err = parse_config(
            r#"
            [listener]
            bind_address = "not-an-address"

            [streams]
            channel_capacity = 0
            "#,
        )
        .unwrap_err();

        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
