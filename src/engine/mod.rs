//! Image engine
//!
//! The pipeline only knows the [`ImageEngine`] trait. [`PixelEngine`] is the
//! engine shipped with the gateway:
//!
//! - Sources from local storage or `http(s)` URLs
//! - Extract, trim, resize, extend, rotate and mirror
//! - Blur, sharpen, median, gamma, negate, normalize, grayscale, threshold, tint
//! - JPEG, PNG, GIF, lossy WebP and AVIF output
//!
//! An empty operation set skips decoding entirely and returns the source as is.

pub mod effects;
pub mod encoder;
pub mod error;
pub mod params;
pub mod processor;
pub mod source;

pub use encoder::{EncodedImage, EncoderFactory, EncoderQuality, ImageEncoder};
pub use error::EngineError;
pub use params::{Color, FitMode, Gravity, Kernel, OutputFormat, TransformParams};
pub use processor::{process_image, ProcessingLimits};
pub use source::{SourceFetcher, SourceLocation};

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::EngineConfig;
use crate::pipeline::{CanonicalOperation, ImageLocator};

/// Payload returned by an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageData {
    Bytes(Bytes),
    /// Textual image representation, e.g. SVG markup
    Text(String),
}

impl ImageData {
    /// Name of the payload kind, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            ImageData::Bytes(_) => "bytes",
            ImageData::Text(_) => "text",
        }
    }
}

/// Engine output: payload plus format tag (`webp`, `jpeg`, ...) when known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub data: ImageData,
    pub format: Option<String>,
}

/// Pixel-level decode/transform/encode collaborator.
#[async_trait]
pub trait ImageEngine: Send + Sync {
    async fn process(
        &self,
        locator: &ImageLocator,
        operations: &CanonicalOperation,
    ) -> Result<ProcessedImage, EngineError>;
}

/// Reference engine: local or remote sources, CPU work on the blocking pool
pub struct PixelEngine {
    fetcher: SourceFetcher,
    limits: ProcessingLimits,
}

impl PixelEngine {
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        Ok(Self {
            fetcher: SourceFetcher::new(config)?,
            limits: ProcessingLimits::from(config),
        })
    }
}

#[async_trait]
impl ImageEngine for PixelEngine {
    async fn process(
        &self,
        locator: &ImageLocator,
        operations: &CanonicalOperation,
    ) -> Result<ProcessedImage, EngineError> {
        let source = self.fetcher.fetch(locator.as_str()).await?;

        if operations.is_empty() {
            return Ok(passthrough(source));
        }

        let params = TransformParams::from_operations(operations)?;
        let limits = self.limits.clone();
        let encoded =
            tokio::task::spawn_blocking(move || process_image(&source, &params, &limits)).await??;

        tracing::debug!(
            locator = %locator,
            operations = %operations,
            format = encoded.format.as_str(),
            size = encoded.data.len(),
            "Image processed"
        );

        Ok(ProcessedImage {
            format: Some(encoded.format.as_str().to_string()),
            data: ImageData::Bytes(Bytes::from(encoded.data)),
        })
    }
}

/// Source bytes returned untouched; SVG stays textual
fn passthrough(source: Bytes) -> ProcessedImage {
    if processor::is_svg(&source) {
        if let Ok(markup) = String::from_utf8(source.to_vec()) {
            return ProcessedImage {
                data: ImageData::Text(markup),
                format: Some("svg+xml".to_string()),
            };
        }
    }
    ProcessedImage {
        format: processor::detect_format(&source).map(str::to_string),
        data: ImageData::Bytes(source),
    }
}
