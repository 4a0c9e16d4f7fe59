//! Built-in endpoint handlers for the gateway.
//!
//! This module provides response generators for:
//! - `/health` - Health check endpoint
//! - `/metrics` - Prometheus metrics export
//! - fallback 404 and 405 answers
//!
//! Functions return `EndpointResponse` instead of writing directly to the
//! session; the caller writes it out.

use std::time::Instant;

use bytes::Bytes;

use crate::metrics::Metrics;
use crate::pipeline::HttpResponse;

/// Methods every route answers
pub const ALLOWED_METHODS: &str = "GET, HEAD";

/// Response from a built-in endpoint handler.
#[derive(Debug, Clone)]
pub struct EndpointResponse {
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value
    pub content_type: &'static str,
    /// Extra headers beyond Content-Type
    pub headers: Vec<(&'static str, String)>,
    /// Response body
    pub body: String,
}

impl EndpointResponse {
    /// Create a JSON response with the given status and body.
    pub fn json(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "application/json",
            headers: Vec::new(),
            body,
        }
    }

    /// Create a plain text response (for Prometheus metrics).
    pub fn prometheus(body: String) -> Self {
        Self {
            status: 200,
            content_type: "text/plain; version=0.0.4",
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn into_http(self) -> HttpResponse {
        let mut headers = vec![("Content-Type", self.content_type.to_string())];
        headers.extend(self.headers);
        HttpResponse {
            status: self.status,
            headers,
            body: Bytes::from(self.body),
        }
    }
}

/// Generate response for /health endpoint.
///
/// Returns health status with uptime and version information.
pub fn handle_health(start_time: Instant) -> EndpointResponse {
    let uptime_seconds = start_time.elapsed().as_secs();
    let version = env!("CARGO_PKG_VERSION");

    let body = serde_json::json!({
        "status": "healthy",
        "uptime_seconds": uptime_seconds,
        "version": version
    })
    .to_string();

    EndpointResponse::json(200, body)
}

/// Generate response for /metrics endpoint.
pub fn handle_metrics(metrics: &Metrics) -> EndpointResponse {
    EndpointResponse::prometheus(metrics.export_prometheus())
}

pub fn not_found() -> EndpointResponse {
    EndpointResponse::json(404, serde_json::json!({ "error": "Not Found" }).to_string())
}

pub fn method_not_allowed() -> EndpointResponse {
    EndpointResponse::json(
        405,
        serde_json::json!({ "error": "Method Not Allowed" }).to_string(),
    )
    .with_header("Allow", ALLOWED_METHODS)
}
