//! Blur placeholder planning
//!
//! `?placeholder=blur` swaps the requested operations for a tiny, heavily
//! blurred WebP preview. With `format=json` the preview is wrapped in a
//! descriptor that also points at the full optimized image.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::Url;
use serde::Serialize;

use super::operations::{CanonicalOperation, OperationKey};
use super::query::QueryParams;
use crate::constants::{
    DEFAULT_FORMAT, DEFAULT_PLACEHOLDER_BLUR, DEFAULT_PLACEHOLDER_QUALITY,
    DEFAULT_PLACEHOLDER_WIDTH,
};

pub const PLACEHOLDER_PARAM: &str = "placeholder";
pub const PLACEHOLDER_TYPE_BLUR: &str = "blur";
pub const PLACEHOLDER_WIDTH_PARAM: &str = "placeholderWidth";
pub const PLACEHOLDER_QUALITY_PARAM: &str = "placeholderQuality";
pub const PLACEHOLDER_BLUR_PARAM: &str = "placeholderBlur";

/// Query parameter and value selecting the JSON descriptor response
pub const JSON_FORMAT_PARAM: &str = "format";
pub const JSON_FORMAT_VALUE: &str = "json";

/// Parameters that only make sense in placeholder mode
pub const PLACEHOLDER_ONLY_PARAMS: [&str; 4] = [
    PLACEHOLDER_PARAM,
    PLACEHOLDER_WIDTH_PARAM,
    PLACEHOLDER_QUALITY_PARAM,
    PLACEHOLDER_BLUR_PARAM,
];

/// Whether the request asks for a blur placeholder
pub fn is_blur_placeholder(query: &QueryParams) -> bool {
    query.get(PLACEHOLDER_PARAM) == Some(PLACEHOLDER_TYPE_BLUR)
}

/// Whether the placeholder should be returned as a JSON descriptor
pub fn wants_json(query: &QueryParams) -> bool {
    query.get(JSON_FORMAT_PARAM) == Some(JSON_FORMAT_VALUE)
}

/// Reduced operation set for blur previews
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderPlan {
    pub width: String,
    pub quality: String,
    pub blur: String,
    /// Always `webp`; not client-configurable
    pub format: String,
}

impl Default for PlaceholderPlan {
    fn default() -> Self {
        Self {
            width: DEFAULT_PLACEHOLDER_WIDTH.to_string(),
            quality: DEFAULT_PLACEHOLDER_QUALITY.to_string(),
            blur: DEFAULT_PLACEHOLDER_BLUR.to_string(),
            format: DEFAULT_FORMAT.to_string(),
        }
    }
}

impl PlaceholderPlan {
    /// The plan as the four-key operation set the engine consumes
    pub fn to_operations(&self) -> CanonicalOperation {
        CanonicalOperation::new()
            .with(OperationKey::Width, &self.width)
            .with(OperationKey::Quality, &self.quality)
            .with(OperationKey::Blur, &self.blur)
            .with(OperationKey::Format, &self.format)
    }
}

/// Build the placeholder plan; absent or empty values take the defaults.
pub fn build_blur_placeholder_operations(query: &QueryParams) -> PlaceholderPlan {
    let pick = |param: &str, default: &str| {
        query
            .get(param)
            .filter(|value| !value.is_empty())
            .unwrap_or(default)
            .to_string()
    };

    PlaceholderPlan {
        width: pick(PLACEHOLDER_WIDTH_PARAM, DEFAULT_PLACEHOLDER_WIDTH),
        quality: pick(PLACEHOLDER_QUALITY_PARAM, DEFAULT_PLACEHOLDER_QUALITY),
        blur: pick(PLACEHOLDER_BLUR_PARAM, DEFAULT_PLACEHOLDER_BLUR),
        format: DEFAULT_FORMAT.to_string(),
    }
}

/// Copy of `url` without the placeholder-only query parameters.
///
/// Remaining pairs keep their order and are re-serialized form-urlencoded.
pub fn remove_placeholder_params_from_url(url: &Url) -> String {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| !PLACEHOLDER_ONLY_PARAMS.contains(&name.as_ref()))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    let mut normalized = url.clone();
    if kept.is_empty() {
        normalized.set_query(None);
    } else {
        normalized.query_pairs_mut().clear().extend_pairs(kept);
    }
    normalized.to_string()
}

/// Encode bytes as a `data:` URL
pub fn encode_data_url(data: &[u8], mime_type: &str) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(data))
}

/// Integer parsing with JavaScript `parseInt(value, 10)` leniency.
///
/// Leading whitespace and an optional sign are accepted and trailing garbage
/// is ignored; `None` when there are no leading digits. Digit runs beyond
/// the `i64` range saturate.
pub fn parse_int_lenient(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let magnitude = rest[..digits_len].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// JSON body returned for `placeholder=blur&format=json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderDescriptor {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub placeholder_data_url: String,
    pub optimized_image_url: String,
    pub placeholder_width: Option<i64>,
    pub placeholder_quality: Option<i64>,
    pub blur_sigma: Option<i64>,
}

impl PlaceholderDescriptor {
    pub fn new(
        plan: &PlaceholderPlan,
        data: &[u8],
        mime_type: &str,
        request_url: &Url,
    ) -> Self {
        Self {
            kind: PLACEHOLDER_TYPE_BLUR,
            placeholder_data_url: encode_data_url(data, mime_type),
            optimized_image_url: remove_placeholder_params_from_url(request_url),
            placeholder_width: parse_int_lenient(&plan.width),
            placeholder_quality: parse_int_lenient(&plan.quality),
            blur_sigma: parse_int_lenient(&plan.blur),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_from_empty_query() {
        let plan = build_blur_placeholder_operations(&QueryParams::default());
        assert_eq!(plan, PlaceholderPlan::default());

        let operations = plan.to_operations();
        assert_eq!(operations.len(), 4);
        assert_eq!(operations.get(OperationKey::Width), Some("32"));
        assert_eq!(operations.get(OperationKey::Quality), Some("50"));
        assert_eq!(operations.get(OperationKey::Blur), Some("3"));
        assert_eq!(operations.get(OperationKey::Format), Some("webp"));
    }

    #[test]
    fn test_plan_uses_client_values() {
        let query = QueryParams::parse(
            "placeholder=blur&placeholderWidth=64&placeholderQuality=30&placeholderBlur=8",
        );
        let plan = build_blur_placeholder_operations(&query);
        assert_eq!(plan.width, "64");
        assert_eq!(plan.quality, "30");
        assert_eq!(plan.blur, "8");
        assert_eq!(plan.format, "webp");
    }

    #[test]
    fn test_plan_empty_values_fall_back() {
        let query = QueryParams::parse("placeholderWidth=&placeholderBlur=");
        let plan = build_blur_placeholder_operations(&query);
        assert_eq!(plan.width, "32");
        assert_eq!(plan.blur, "3");
    }

    #[test]
    fn test_plan_format_is_not_configurable() {
        let query = QueryParams::parse("f=png&format=avif");
        let plan = build_blur_placeholder_operations(&query);
        assert_eq!(plan.format, "webp");
    }

    #[test]
    fn test_is_blur_placeholder() {
        assert!(is_blur_placeholder(&QueryParams::parse("placeholder=blur")));
        assert!(!is_blur_placeholder(&QueryParams::parse("placeholder=color")));
        assert!(!is_blur_placeholder(&QueryParams::parse("placeholder")));
        assert!(!is_blur_placeholder(&QueryParams::parse("w=10")));
    }

    #[test]
    fn test_wants_json_reads_long_name_only() {
        assert!(wants_json(&QueryParams::parse("format=json")));
        assert!(!wants_json(&QueryParams::parse("f=json")));
        assert!(!wants_json(&QueryParams::parse("format=webp")));
    }

    #[test]
    fn test_remove_placeholder_params_preserves_others() {
        let url = Url::parse(
            "http://localhost:8080/optimize/a.png?w=800&placeholder=blur&q=80&placeholderWidth=16&format=json&placeholderQuality=1&placeholderBlur=2",
        )
        .unwrap();
        let cleaned = remove_placeholder_params_from_url(&url);
        assert_eq!(
            cleaned,
            "http://localhost:8080/optimize/a.png?w=800&q=80&format=json"
        );
    }

    #[test]
    fn test_remove_placeholder_params_drops_empty_query() {
        let url = Url::parse("http://localhost/optimize/a.png?placeholder=blur").unwrap();
        assert_eq!(
            remove_placeholder_params_from_url(&url),
            "http://localhost/optimize/a.png"
        );
    }

    #[test]
    fn test_remove_placeholder_params_reencodes_values() {
        let url = Url::parse("http://localhost/optimize/a.png?b=%23fff&placeholder=blur").unwrap();
        let cleaned = remove_placeholder_params_from_url(&url);
        let reparsed = QueryParams::from_url(&Url::parse(&cleaned).unwrap());
        assert_eq!(reparsed.get("b"), Some("#fff"));
        assert!(!reparsed.has("placeholder"));
    }

    #[test]
    fn test_encode_data_url() {
        assert_eq!(
            encode_data_url(b"abc", "image/webp"),
            "data:image/webp;base64,YWJj"
        );
    }

    #[test]
    fn test_parse_int_lenient() {
        assert_eq!(parse_int_lenient("32"), Some(32));
        assert_eq!(parse_int_lenient("  7px"), Some(7));
        assert_eq!(parse_int_lenient("-3"), Some(-3));
        assert_eq!(parse_int_lenient("+5"), Some(5));
        assert_eq!(parse_int_lenient("2.9"), Some(2));
        assert_eq!(parse_int_lenient("abc"), None);
        assert_eq!(parse_int_lenient(""), None);
        assert_eq!(parse_int_lenient("-"), None);
        assert_eq!(parse_int_lenient("99999999999999999999"), Some(i64::MAX));
        assert_eq!(parse_int_lenient("-99999999999999999999"), Some(-i64::MAX));
    }

    #[test]
    fn test_descriptor_serializes_camel_case() {
        let url = Url::parse("http://localhost/optimize/a.png?placeholder=blur&format=json").unwrap();
        let plan = PlaceholderPlan {
            blur: "soft".to_string(),
            ..Default::default()
        };
        let descriptor = PlaceholderDescriptor::new(&plan, b"abc", "image/webp", &url);
        let json = serde_json::to_value(&descriptor).unwrap();

        assert_eq!(json["type"], "blur");
        assert_eq!(json["placeholderDataUrl"], "data:image/webp;base64,YWJj");
        assert_eq!(
            json["optimizedImageUrl"],
            "http://localhost/optimize/a.png?format=json"
        );
        assert_eq!(json["placeholderWidth"], 32);
        assert_eq!(json["placeholderQuality"], 50);
        assert!(json["blurSigma"].is_null());
    }
}
