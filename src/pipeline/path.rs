//! Source path resolution
//!
//! Turns the router's path segments into an [`ImageLocator`]: join, strip the
//! `_/` no-op marker, percent-decode, and repair a `scheme:/host` prefix that
//! lost a slash during segmentation.

use std::fmt;
use std::ops::Deref;

use crate::error::{DecodeError, PipelineError};

/// Prefix meaning "no operations" in IPX-style URLs
const NO_OP_MARKER: &str = "_/";

/// A resolved source image reference: a storage path or an absolute URL.
///
/// Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageLocator(String);

impl ImageLocator {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for ImageLocator {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ImageLocator {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(PipelineError::EmptyPath);
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for ImageLocator {
    type Error = PipelineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_string())
    }
}

/// Resolve router path segments into an image locator.
pub fn parse_image_path<S: AsRef<str>>(segments: &[S]) -> Result<ImageLocator, PipelineError> {
    if segments.is_empty() {
        return Err(PipelineError::EmptyPath);
    }

    let joined = segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("/");
    let stripped = joined.strip_prefix(NO_OP_MARKER).unwrap_or(&joined);
    let decoded = decode_uri_component(stripped)?;

    ImageLocator::try_from(restore_protocol_slashes(&decoded))
}

/// Re-insert the slash lost from `http:/host` or `https:/host`.
///
/// Only the leading scheme is touched; `:/` elsewhere in the string is kept.
pub fn restore_protocol_slashes(path: &str) -> String {
    for scheme in ["https:/", "http:/"] {
        if let Some(rest) = path.strip_prefix(scheme) {
            if !rest.is_empty() && !rest.starts_with('/') {
                return format!("{}/{}", scheme, rest);
            }
            break;
        }
    }
    path.to_string()
}

/// Percent-decode with `decodeURIComponent` strictness.
///
/// Every `%` must introduce two hex digits and the decoded bytes must be
/// valid UTF-8. `+` is left alone.
pub fn decode_uri_component(input: &str) -> Result<String, DecodeError> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(DecodeError::InvalidEscape { position: i });
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    Ok(urlencoding::decode(input)?.into_owned())
}
