//! Minimal HTTP response model.
//!
//! The simulated server keeps one **canned** response and restamps its status
//! on every reply. Callers receive a snapshot taken at stamp time, so holding
//! on to a response does not pin the server's copy.
//!
//! ## Notes
//! - The body is stored as raw `Vec<u8>`. For text use [`Response::body_text`],
//!   for JSON use [`Response::json`].
//! - `headers` is an `http::HeaderMap`, which is **case-insensitive** for
//!   header names.
//! - `status_text` is the full status line (`"200 OK"`), derived from the
//!   code's canonical reason phrase. Non-standard codes get `"Unknown"`.
//!
use http::{HeaderMap, StatusCode};

const DEFAULT_PROTO: &str = "HTTP/1.0";

/// Simple structure for HTTP responses.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status line (e.g., `"200 OK"`, `"404 Not Found"`).
    pub status_text: String,

    /// Numeric HTTP status code (e.g., `200`, `404`).
    pub status: u16,

    /// Protocol version string.
    pub proto: String,

    /// Response headers as a case-insensitive map.
    pub headers: HeaderMap,

    /// Raw response body bytes.
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status_text: status_line(status),
            status,
            proto: DEFAULT_PROTO.to_string(),
            headers,
            body: body.into(),
        }
    }

    /// Restamps the status code and status line in place.
    pub fn set_status(&mut self, status: u16) {
        self.status = status;
        self.status_text = status_line(status);
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

fn status_line(status: u16) -> String {
    let reason = StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    format!("{status} {reason}")
}
