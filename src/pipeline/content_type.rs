// Content-type resolution for processed images

/// MIME type for an engine format tag.
///
/// The tag is interpolated verbatim into `image/<tag>`; no validation or
/// normalization happens here (`jpg` becomes `image/jpg`).
pub fn resolve_content_type(format: &str) -> String {
    format!("image/{}", format)
}
