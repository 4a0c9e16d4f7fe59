//! Response envelope
//!
//! Every outcome of the optimize route is one of three shapes. The HTTP
//! adapter only ever sees the flattened [`HttpResponse`].

use bytes::Bytes;
use serde::Serialize;

use super::placeholder::PlaceholderDescriptor;
use crate::constants::IMAGE_CACHE_CONTROL;
use crate::error::PipelineError;

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Top-level message for any failure after path resolution
pub const PROCESSING_FAILED_MESSAGE: &str = "Image processing failed";

/// JSON error body: `{"error": ..., "details": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope {
    /// Binary image; always carries the public cache policy
    Image { data: Bytes, content_type: String },
    /// Placeholder descriptor; no cache policy
    PlaceholderJson(PlaceholderDescriptor),
    /// JSON error; no cache policy
    Error { status: u16, body: ErrorBody },
}

impl ResponseEnvelope {
    /// Map a pipeline failure to its client-facing envelope.
    ///
    /// A missing path is the only 400; everything else, malformed encoding
    /// included, is a 500 whose `details` is the error's own message.
    pub fn from_error(err: &PipelineError) -> Self {
        match err {
            PipelineError::EmptyPath => ResponseEnvelope::Error {
                status: 400,
                body: ErrorBody::new(err.to_string()),
            },
            _ => ResponseEnvelope::Error {
                status: 500,
                body: ErrorBody::with_details(PROCESSING_FAILED_MESSAGE, err.to_string()),
            },
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            ResponseEnvelope::Image { .. } | ResponseEnvelope::PlaceholderJson(_) => 200,
            ResponseEnvelope::Error { status, .. } => *status,
        }
    }

    /// Flatten into status, headers and body
    pub fn into_http(self) -> HttpResponse {
        match self {
            ResponseEnvelope::Image { data, content_type } => HttpResponse {
                status: 200,
                headers: vec![
                    ("Content-Type", content_type),
                    ("Cache-Control", IMAGE_CACHE_CONTROL.to_string()),
                ],
                body: data,
            },
            ResponseEnvelope::PlaceholderJson(descriptor) => {
                HttpResponse::json(200, serialize_json(&descriptor))
            }
            ResponseEnvelope::Error { status, body } => {
                HttpResponse::json(status, serialize_json(&body))
            }
        }
    }
}

fn serialize_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialize response body");
        format!(r#"{{"error":"{}"}}"#, PROCESSING_FAILED_MESSAGE)
    })
}

/// Transport-neutral HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type", CONTENT_TYPE_JSON.to_string())],
            body: Bytes::from(body.into()),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
