//! Image engine error types
//!
//! Every variant surfaces to clients as a generic processing failure; the
//! variants exist so the message in `details` and the logs says what went
//! wrong.

use thiserror::Error;

/// Errors that can occur while fetching, transforming or encoding an image
#[derive(Debug, Error)]
pub enum EngineError {
    // === Source Errors ===
    /// Local source file does not exist
    #[error("Source image not found: {locator}")]
    SourceNotFound { locator: String },
    /// Locator points outside the storage root or uses a forbidden form
    #[error("Source not allowed: {locator}")]
    SourceNotAllowed { locator: String },
    /// Remote or local fetch failed
    #[error("Failed to fetch source image {locator}: {message}")]
    FetchFailed { locator: String, message: String },
    /// The HTTP client used for remote sources could not be built
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),
    /// Source exceeds the configured size limit
    #[error("Source size {size} bytes exceeds maximum {max_size} bytes")]
    SourceTooLarge { size: usize, max_size: usize },

    // === Decoding Errors ===
    /// Source bytes are not in a supported image format
    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: String },
    /// Failed to decode image data
    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: String },
    /// Image dimensions exceed safety limits (image bomb protection)
    #[error("Image dimensions {width}x{height} ({pixels} pixels) exceed limit of {max_pixels} pixels")]
    ImageBombDetected {
        width: u32,
        height: u32,
        pixels: u64,
        max_pixels: u64,
    },

    // === Parameter Errors ===
    /// Invalid transformation parameter
    #[error("Invalid parameter '{param}': {message}")]
    InvalidParameter { param: String, message: String },
    /// Requested dimensions are invalid
    #[error("Invalid dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        width: u32,
        height: u32,
        reason: String,
    },

    // === Processing Errors ===
    /// Resize operation failed
    #[error("Resize failed: {message}")]
    ResizeFailed { message: String },
    /// Encoding to output format failed
    #[error("Failed to encode to {format}: {message}")]
    EncodeFailed { format: String, message: String },
    /// The blocking worker running the transform did not complete
    #[error("Processing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn fetch_failed(locator: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::FetchFailed {
            locator: locator.into(),
            message: message.into(),
        }
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        EngineError::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        EngineError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        EngineError::ResizeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn invalid_param(param: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    pub fn image_bomb(width: u32, height: u32, max_pixels: u64) -> Self {
        EngineError::ImageBombDetected {
            width,
            height,
            pixels: width as u64 * height as u64,
            max_pixels,
        }
    }
}
