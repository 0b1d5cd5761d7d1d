//! CORS response headers.
//!
//! Runs on every parsed request before resolution, including the OPTIONS
//! preflight that short-circuits with 204.

use serde::{Deserialize, Serialize};

use crate::http::request::Request;
use crate::http::response::Response;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsOptions {
    /// Allowed origins; `*` allows any origin.
    pub origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub exposed_headers: Vec<String>,
    pub allow_credentials: bool,
    /// Preflight cache lifetime in seconds; 0 omits the header.
    pub max_age: u32,
}

impl CorsOptions {
    fn allows(&self, origin: &str) -> bool {
        self.origins.iter().any(|o| o == "*" || o == origin)
    }

    /// Add the CORS headers for `req` to `res`.
    pub fn apply(&self, req: &Request, res: &mut Response) {
        let Some(origin) = req.header("origin") else {
            return;
        };
        if !self.allows(origin) {
            tracing::debug!(origin = %origin, "Origin not allowed by CORS policy");
            return;
        }

        res.headers.add("Access-Control-Allow-Origin", origin);

        if self.allow_credentials {
            res.headers.add("Access-Control-Allow-Credentials", "true");
        }

        if req.method == "OPTIONS" {
            if !self.allowed_methods.is_empty() {
                res.headers
                    .add("Access-Control-Allow-Methods", self.allowed_methods.join(","));
            }
            if !self.allowed_headers.is_empty() {
                res.headers
                    .add("Access-Control-Allow-Headers", self.allowed_headers.join(","));
            }
            if self.max_age > 0 {
                res.headers.add("Access-Control-Max-Age", self.max_age);
            }
        }

        if !self.exposed_headers.is_empty() {
            res.headers
                .add("Access-Control-Expose-Headers", self.exposed_headers.join(","));
        }
    }
}
