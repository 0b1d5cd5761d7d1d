//! Security response headers.
//!
//! Added to normal responses right before they are written when
//! `security.headers` is enabled. Event streams are left untouched.

use crate::http::response::Response;

pub const SECURITY_HEADERS: [(&str, &str); 3] = [
    ("X-Content-Type-Options", "nosniff"),
    ("X-Frame-Options", "DENY"),
    ("X-XSS-Protection", "1; mode=block"),
];

pub fn apply(res: &mut Response) {
    for (name, value) in SECURITY_HEADERS {
        res.headers.add(name, value);
    }
}
