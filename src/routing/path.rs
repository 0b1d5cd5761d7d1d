//! Path pattern validation and joining.

use thiserror::Error;

/// Invalid route or router path pattern. Raised at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutePatternError {
    #[error("path {0:?} must start with /")]
    MissingLeadingSlash(String),

    #[error("path {0:?} cannot contain path traversal sequences")]
    Traversal(String),

    #[error("path {0:?} contains invalid characters")]
    ControlCharacter(String),
}

/// Check a registration pattern.
pub fn validate_path(path: &str) -> Result<(), RoutePatternError> {
    if !path.starts_with('/') {
        return Err(RoutePatternError::MissingLeadingSlash(path.to_string()));
    }

    let lowered = path.to_ascii_lowercase();
    if path.contains("..") || lowered.contains("%2e%2e") {
        return Err(RoutePatternError::Traversal(path.to_string()));
    }

    if path.chars().any(|c| (c as u32) < 32 || c as u32 == 127) {
        return Err(RoutePatternError::ControlCharacter(path.to_string()));
    }

    Ok(())
}

/// Join two path pieces with exactly one slash between them.
pub fn join(prefix: &str, path: &str) -> String {
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Non-empty segments of `path`.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_patterns() {
        for path in ["/", "/users/:id", "/a/b/c", "/files/%20name"] {
            assert_eq!(validate_path(path), Ok(()), "{path}");
        }
    }

    #[test]
    fn rejects_bad_patterns() {
        assert!(matches!(
            validate_path("users"),
            Err(RoutePatternError::MissingLeadingSlash(_))
        ));
        for path in ["/a/../b", "/a/%2e%2e/b", "/a/%2E%2E/b", "/a/%2e%2E"] {
            assert!(
                matches!(validate_path(path), Err(RoutePatternError::Traversal(_))),
                "{path}"
            );
        }
        assert!(matches!(
            validate_path("/a\0b"),
            Err(RoutePatternError::ControlCharacter(_))
        ));
        assert!(matches!(
            validate_path("/a\x7f"),
            Err(RoutePatternError::ControlCharacter(_))
        ));
    }

    #[test]
    fn join_normalizes_slashes() {
        assert_eq!(join("", "/"), "/");
        assert_eq!(join("/", "/api"), "/api");
        assert_eq!(join("/api/", "/users"), "/api/users");
        assert_eq!(join("/api", "users/"), "/api/users/");
    }

    #[test]
    fn segments_ignore_empty_pieces() {
        let parts: Vec<_> = segments("//a///b/").collect();
        assert_eq!(parts, ["a", "b"]);
        assert_eq!(segments("/").count(), 0);
    }
}
