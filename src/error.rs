// Error types module

use std::string::FromUtf8Error;
use thiserror::Error;

use crate::engine::EngineError;

/// Percent-decoding failures while resolving the image path
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A `%` that is not followed by two hex digits
    #[error("URI malformed: invalid escape sequence at byte {position}")]
    InvalidEscape { position: usize },
    /// Escapes that decode to bytes which are not valid UTF-8
    #[error("URI malformed: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),
}

/// Failures of the request-to-operation pipeline
///
/// The orchestrator returns these; `ResponseEnvelope::from_error` is the only
/// place they are mapped to HTTP status codes.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Client supplied no path segments, or they resolved to nothing
    #[error("Missing image path")]
    EmptyPath,

    /// Percent-decoding of the joined path failed
    #[error(transparent)]
    MalformedEncoding(#[from] DecodeError),

    /// The image engine rejected the request
    #[error("{source}")]
    Engine {
        locator: String,
        #[source]
        source: EngineError,
    },

    /// The engine returned a payload this pipeline cannot emit as bytes
    #[error("Unsupported data type for image processing: {kind}")]
    UnsupportedResultType { locator: String, kind: &'static str },

    /// The absolute request URL could not be rebuilt
    #[error("Invalid request URL: {0}")]
    InvalidRequestUrl(String),
}

impl PipelineError {
    /// Locator that was being processed when the failure happened, if resolved
    pub fn locator(&self) -> Option<&str> {
        match self {
            PipelineError::Engine { locator, .. }
            | PipelineError::UnsupportedResultType { locator, .. } => Some(locator),
            _ => None,
        }
    }

    /// Whether the failure is attributable to the client's request shape
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::EmptyPath)
    }
}
