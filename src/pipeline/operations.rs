//! Query alias canonicalization
//!
//! The open set of query aliases (`w`, `width`, `q`, `quality`, ...) is mapped
//! onto a closed vocabulary of [`OperationKey`]s by one loop over the static
//! [`OPERATION_TABLE`].
//!
//! Short aliases are consulted before long ones (`w ?? width`), so when a
//! client sends both the short form wins. Values are copied verbatim; range
//! and syntax validation belongs to the image engine.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::query::QueryParams;
use crate::constants::DEFAULT_FORMAT;

/// Canonical operation names understood by the image engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationKey {
    Width,
    Height,
    Resize,
    Quality,
    Format,
    Fit,
    Position,
    Blur,
    Sharpen,
    Rotate,
    Flip,
    Flop,
    Grayscale,
    Trim,
    Extend,
    Extract,
    Background,
    Kernel,
    Enlarge,
    Median,
    Gamma,
    Negate,
    Normalize,
    Threshold,
    Tint,
    Animated,
}

impl OperationKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Width => "width",
            Self::Height => "height",
            Self::Resize => "resize",
            Self::Quality => "quality",
            Self::Format => "format",
            Self::Fit => "fit",
            Self::Position => "position",
            Self::Blur => "blur",
            Self::Sharpen => "sharpen",
            Self::Rotate => "rotate",
            Self::Flip => "flip",
            Self::Flop => "flop",
            Self::Grayscale => "grayscale",
            Self::Trim => "trim",
            Self::Extend => "extend",
            Self::Extract => "extract",
            Self::Background => "background",
            Self::Kernel => "kernel",
            Self::Enlarge => "enlarge",
            Self::Median => "median",
            Self::Gamma => "gamma",
            Self::Negate => "negate",
            Self::Normalize => "normalize",
            Self::Threshold => "threshold",
            Self::Tint => "tint",
            Self::Animated => "animated",
        }
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OPERATION_TABLE
            .iter()
            .map(|spec| spec.key)
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown operation: {}", s))
    }
}

/// How a query alias contributes to its canonical key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Value copied verbatim; empty values are dropped
    Value,
    /// Presence alone sets the key to `"true"`
    Flag,
}

/// One row of the alias table
#[derive(Debug, Clone, Copy)]
pub struct OperationSpec {
    pub key: OperationKey,
    /// Lookup order: short alias first, then long
    pub aliases: &'static [&'static str],
    pub kind: OperationKind,
}

const fn value(key: OperationKey, aliases: &'static [&'static str]) -> OperationSpec {
    OperationSpec {
        key,
        aliases,
        kind: OperationKind::Value,
    }
}

const fn flag(key: OperationKey, aliases: &'static [&'static str]) -> OperationSpec {
    OperationSpec {
        key,
        aliases,
        kind: OperationKind::Flag,
    }
}

/// Every recognized operation and its accepted query names
pub static OPERATION_TABLE: &[OperationSpec] = &[
    value(OperationKey::Width, &["w", "width"]),
    value(OperationKey::Height, &["h", "height"]),
    value(OperationKey::Resize, &["s", "resize"]),
    value(OperationKey::Quality, &["q", "quality"]),
    value(OperationKey::Format, &["f", "format"]),
    value(OperationKey::Fit, &["fit"]),
    value(OperationKey::Position, &["pos", "position"]),
    value(OperationKey::Blur, &["blur"]),
    value(OperationKey::Sharpen, &["sharpen"]),
    value(OperationKey::Rotate, &["rotate"]),
    flag(OperationKey::Flip, &["flip"]),
    flag(OperationKey::Flop, &["flop"]),
    flag(OperationKey::Grayscale, &["grayscale"]),
    value(OperationKey::Trim, &["trim"]),
    value(OperationKey::Extend, &["extend"]),
    value(OperationKey::Extract, &["extract"]),
    value(OperationKey::Background, &["b", "background"]),
    value(OperationKey::Kernel, &["kernel"]),
    flag(OperationKey::Enlarge, &["enlarge"]),
    value(OperationKey::Median, &["median"]),
    value(OperationKey::Gamma, &["gamma"]),
    flag(OperationKey::Negate, &["negate"]),
    flag(OperationKey::Normalize, &["normalize"]),
    value(OperationKey::Threshold, &["threshold"]),
    value(OperationKey::Tint, &["tint"]),
    flag(OperationKey::Animated, &["animated"]),
];

/// Normalized operation set handed to the image engine.
///
/// Absent keys mean "not requested"; flag keys only ever hold `"true"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalOperation {
    entries: BTreeMap<OperationKey, String>,
}

impl CanonicalOperation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: OperationKey, value: impl Into<String>) {
        self.entries.insert(key, value.into());
    }

    pub fn with(mut self, key: OperationKey, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: OperationKey) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    pub fn contains(&self, key: OperationKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// True when a flag key is set
    pub fn flag(&self, key: OperationKey) -> bool {
        self.get(key) == Some("true")
    }

    pub fn format(&self) -> Option<&str> {
        self.get(OperationKey::Format)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (OperationKey, &str)> {
        self.entries.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl fmt::Display for CanonicalOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", key, value)?;
            first = false;
        }
        Ok(())
    }
}

impl<V: Into<String>> FromIterator<(OperationKey, V)> for CanonicalOperation {
    fn from_iter<I: IntoIterator<Item = (OperationKey, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k, v.into())).collect(),
        }
    }
}

/// Whether any recognized operation alias appears in the query
pub fn has_operation_params(query: &QueryParams) -> bool {
    OPERATION_TABLE
        .iter()
        .flat_map(|spec| spec.aliases.iter())
        .any(|alias| query.has(alias))
}

/// Resolve a single table entry against the query
pub fn resolve_operation(spec: &OperationSpec, query: &QueryParams) -> Option<String> {
    match spec.kind {
        OperationKind::Flag => spec
            .aliases
            .iter()
            .any(|alias| query.has(alias))
            .then(|| "true".to_string()),
        OperationKind::Value => spec
            .aliases
            .iter()
            .find_map(|alias| query.get(alias))
            .filter(|value| !value.is_empty())
            .map(str::to_string),
    }
}

/// Build the canonical operation set from the request query.
///
/// `format` is always present, defaulting to `webp`.
pub fn build_operations(query: &QueryParams) -> CanonicalOperation {
    let mut operations: CanonicalOperation = OPERATION_TABLE
        .iter()
        .filter_map(|spec| resolve_operation(spec, query).map(|value| (spec.key, value)))
        .collect();

    if !operations.contains(OperationKey::Format) {
        operations.insert(OperationKey::Format, DEFAULT_FORMAT);
    }

    operations
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn query(raw: &str) -> QueryParams {
        QueryParams::parse(raw)
    }

    #[test]
    fn test_table_covers_every_key_once() {
        let mut keys: Vec<_> = OPERATION_TABLE.iter().map(|s| s.key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), OPERATION_TABLE.len());
        assert_eq!(keys.len(), 26);
    }

    #[test]
    fn test_table_aliases_are_unique() {
        let mut aliases: Vec<_> = OPERATION_TABLE
            .iter()
            .flat_map(|s| s.aliases.iter())
            .collect();
        let total = aliases.len();
        aliases.sort();
        aliases.dedup();
        assert_eq!(aliases.len(), total);
    }

    #[rstest]
    #[case("w=800", OperationKey::Width, "800")]
    #[case("width=800", OperationKey::Width, "800")]
    #[case("h=600", OperationKey::Height, "600")]
    #[case("height=600", OperationKey::Height, "600")]
    #[case("s=200x100", OperationKey::Resize, "200x100")]
    #[case("resize=200x100", OperationKey::Resize, "200x100")]
    #[case("q=75", OperationKey::Quality, "75")]
    #[case("quality=75", OperationKey::Quality, "75")]
    #[case("f=png", OperationKey::Format, "png")]
    #[case("format=avif", OperationKey::Format, "avif")]
    #[case("fit=contain", OperationKey::Fit, "contain")]
    #[case("pos=top", OperationKey::Position, "top")]
    #[case("position=left", OperationKey::Position, "left")]
    #[case("blur=5", OperationKey::Blur, "5")]
    #[case("sharpen=2", OperationKey::Sharpen, "2")]
    #[case("rotate=90", OperationKey::Rotate, "90")]
    #[case("trim=10", OperationKey::Trim, "10")]
    #[case("extend=1_2_3_4", OperationKey::Extend, "1_2_3_4")]
    #[case("extract=0_0_10_10", OperationKey::Extract, "0_0_10_10")]
    #[case("b=ff0000", OperationKey::Background, "ff0000")]
    #[case("background=00ff00", OperationKey::Background, "00ff00")]
    #[case("kernel=nearest", OperationKey::Kernel, "nearest")]
    #[case("median=3", OperationKey::Median, "3")]
    #[case("gamma=2.2", OperationKey::Gamma, "2.2")]
    #[case("threshold=128", OperationKey::Threshold, "128")]
    #[case("tint=ff8800", OperationKey::Tint, "ff8800")]
    fn test_value_aliases(#[case] raw: &str, #[case] key: OperationKey, #[case] expected: &str) {
        let operations = build_operations(&query(raw));
        assert_eq!(operations.get(key), Some(expected));
    }

    #[rstest]
    #[case("flip", OperationKey::Flip)]
    #[case("flop", OperationKey::Flop)]
    #[case("grayscale", OperationKey::Grayscale)]
    #[case("enlarge", OperationKey::Enlarge)]
    #[case("negate", OperationKey::Negate)]
    #[case("normalize", OperationKey::Normalize)]
    #[case("animated", OperationKey::Animated)]
    fn test_flags_set_true_regardless_of_value(#[case] name: &str, #[case] key: OperationKey) {
        for raw in [name.to_string(), format!("{}=", name), format!("{}=false", name)] {
            let operations = build_operations(&query(&raw));
            assert_eq!(operations.get(key), Some("true"), "query: {}", raw);
        }
    }

    #[test]
    fn test_absent_flags_are_not_emitted() {
        let operations = build_operations(&query("w=10"));
        for key in [
            OperationKey::Flip,
            OperationKey::Flop,
            OperationKey::Grayscale,
            OperationKey::Enlarge,
            OperationKey::Negate,
            OperationKey::Normalize,
            OperationKey::Animated,
        ] {
            assert!(!operations.contains(key));
        }
    }

    #[test]
    fn test_format_defaults_to_webp() {
        let operations = build_operations(&query("w=100"));
        assert_eq!(operations.format(), Some("webp"));

        let operations = build_operations(&query(""));
        assert_eq!(operations.format(), Some("webp"));
        assert_eq!(operations.len(), 1);
    }

    #[test]
    fn test_empty_format_falls_back_to_default() {
        let operations = build_operations(&query("f="));
        assert_eq!(operations.format(), Some("webp"));
    }

    #[test]
    fn test_short_alias_wins_over_long() {
        let operations = build_operations(&query("w=100&width=200"));
        assert_eq!(operations.get(OperationKey::Width), Some("100"));

        let operations = build_operations(&query("width=200&w=100"));
        assert_eq!(operations.get(OperationKey::Width), Some("100"));

        let operations = build_operations(&query("format=png&f=avif"));
        assert_eq!(operations.format(), Some("avif"));
    }

    #[test]
    fn test_present_empty_short_alias_shadows_long() {
        let operations = build_operations(&query("w=&width=200"));
        assert!(!operations.contains(OperationKey::Width));
    }

    #[test]
    fn test_empty_values_are_dropped() {
        let operations = build_operations(&query("blur=&rotate="));
        assert!(!operations.contains(OperationKey::Blur));
        assert!(!operations.contains(OperationKey::Rotate));
    }

    #[test]
    fn test_unknown_params_are_ignored() {
        let operations = build_operations(&query("foo=bar&placeholder=blur"));
        assert_eq!(operations.len(), 1);
    }

    #[test]
    fn test_has_operation_params() {
        assert!(!has_operation_params(&query("")));
        assert!(!has_operation_params(&query(
            "placeholder=blur&placeholderWidth=10&placeholderQuality=20&placeholderBlur=1"
        )));
        assert!(!has_operation_params(&query("utm_source=mail")));
        assert!(has_operation_params(&query("grayscale")));
        assert!(has_operation_params(&query("w=10")));
        assert!(has_operation_params(&query("background=fff")));
        assert!(has_operation_params(&query("pos=")));
    }

    #[test]
    fn test_operation_key_round_trips_through_name() {
        for spec in OPERATION_TABLE {
            let parsed: OperationKey = spec.key.as_str().parse().unwrap();
            assert_eq!(parsed, spec.key);
        }
        assert!("dpr".parse::<OperationKey>().is_err());
    }

    #[test]
    fn test_display_lists_entries_in_key_order() {
        let operations = build_operations(&query("q=80&w=800"));
        assert_eq!(operations.to_string(), "width:800,quality:80,format:webp");
    }
}
