//! Typed transformation parameters
//!
//! The pipeline hands the engine untyped strings keyed by [`OperationKey`];
//! this module is where they are parsed and range-checked.

use std::str::FromStr;

use super::error::EngineError;
use crate::pipeline::{CanonicalOperation, OperationKey};

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Avif,
    Gif,
}

impl OutputFormat {
    /// Format tag reported back to the pipeline
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
            Self::Gif => "gif",
        }
    }

    pub fn supports_transparency(&self) -> bool {
        !matches!(self, Self::Jpeg)
    }

    /// Encodable format matching a decoder format, if any
    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::WebP => Some(Self::WebP),
            image::ImageFormat::Avif => Some(Self::Avif),
            image::ImageFormat::Gif => Some(Self::Gif),
            _ => None,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "avif" => Ok(OutputFormat::Avif),
            "gif" => Ok(OutputFormat::Gif),
            _ => Err(EngineError::invalid_param(
                "format",
                format!("unknown format: {}", s),
            )),
        }
    }
}

/// How to fit the image within target dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMode {
    /// Crop to fill target dimensions (default)
    #[default]
    Cover,
    /// Scale to fit within dimensions and letterbox the rest
    Contain,
    /// Stretch to fill exactly (may distort)
    Fill,
    /// Scale to fit within dimensions, no padding
    Inside,
    /// Scale to cover dimensions, no cropping
    Outside,
}

impl FromStr for FitMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cover" => Ok(FitMode::Cover),
            "contain" => Ok(FitMode::Contain),
            "fill" => Ok(FitMode::Fill),
            "inside" => Ok(FitMode::Inside),
            "outside" => Ok(FitMode::Outside),
            _ => Err(EngineError::invalid_param(
                "fit",
                format!("unknown fit mode: {}", s),
            )),
        }
    }
}

/// Anchor point used when cropping or letterboxing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    #[default]
    Center,
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Gravity {
    /// Offset of a `free_w` x `free_h` slack area for this anchor
    pub fn offset(&self, free_w: u32, free_h: u32) -> (u32, u32) {
        let x = match self {
            Gravity::West | Gravity::NorthWest | Gravity::SouthWest => 0,
            Gravity::East | Gravity::NorthEast | Gravity::SouthEast => free_w,
            _ => free_w / 2,
        };
        let y = match self {
            Gravity::North | Gravity::NorthEast | Gravity::NorthWest => 0,
            Gravity::South | Gravity::SouthEast | Gravity::SouthWest => free_h,
            _ => free_h / 2,
        };
        (x, y)
    }
}

impl FromStr for Gravity {
    type Err = EngineError;

    /// Accepts compass names (`northeast`, `ne`) and CSS-style pairs
    /// (`right top`, `top-right`, `left_bottom`) in either order.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        match lowered.as_str() {
            "center" | "centre" | "c" | "entropy" | "attention" => return Ok(Gravity::Center),
            "north" | "n" => return Ok(Gravity::North),
            "south" | "s" => return Ok(Gravity::South),
            "east" | "e" => return Ok(Gravity::East),
            "west" | "w" => return Ok(Gravity::West),
            "northeast" | "ne" => return Ok(Gravity::NorthEast),
            "northwest" | "nw" => return Ok(Gravity::NorthWest),
            "southeast" | "se" => return Ok(Gravity::SouthEast),
            "southwest" | "sw" => return Ok(Gravity::SouthWest),
            _ => {}
        }

        let mut vertical = None;
        let mut horizontal = None;
        for token in lowered.split([' ', '-', '_']).filter(|t| !t.is_empty()) {
            match token {
                "top" => vertical = Some(Gravity::North),
                "bottom" => vertical = Some(Gravity::South),
                "left" => horizontal = Some(Gravity::West),
                "right" => horizontal = Some(Gravity::East),
                "center" | "centre" => {}
                _ => {
                    return Err(EngineError::invalid_param(
                        "position",
                        format!("unknown position: {}", s),
                    ))
                }
            }
        }

        Ok(match (vertical, horizontal) {
            (Some(Gravity::North), Some(Gravity::East)) => Gravity::NorthEast,
            (Some(Gravity::North), Some(Gravity::West)) => Gravity::NorthWest,
            (Some(Gravity::South), Some(Gravity::East)) => Gravity::SouthEast,
            (Some(Gravity::South), Some(Gravity::West)) => Gravity::SouthWest,
            (Some(v), None) => v,
            (None, Some(h)) => h,
            _ => Gravity::Center,
        })
    }
}

/// Resampling kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Kernel {
    Nearest,
    Linear,
    Cubic,
    Mitchell,
    #[default]
    Lanczos3,
}

impl FromStr for Kernel {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nearest" => Ok(Kernel::Nearest),
            "linear" => Ok(Kernel::Linear),
            "cubic" => Ok(Kernel::Cubic),
            "mitchell" => Ok(Kernel::Mitchell),
            // No two-lobe Lanczos in fast_image_resize; the three-lobe one is closest
            "lanczos2" | "lanczos3" => Ok(Kernel::Lanczos3),
            _ => Err(EngineError::invalid_param(
                "kernel",
                format!("unknown kernel: {}", s),
            )),
        }
    }
}

/// RGBA color parsed from `fff`, `ff0000`, `#ff000080` and friends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const WHITE: Color = Color([255, 255, 255, 255]);
    pub const BLACK: Color = Color([0, 0, 0, 255]);

    pub fn parse(param: &str, value: &str) -> Result<Self, EngineError> {
        let hex = value.strip_prefix('#').unwrap_or(value);
        let invalid = || EngineError::invalid_param(param, format!("invalid hex color: {}", value));
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let expanded: String = match hex.len() {
            3 | 4 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 | 8 => hex.to_string(),
            _ => return Err(invalid()),
        };

        let channel = |i: usize| {
            expanded
                .get(i * 2..i * 2 + 2)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
        };
        let r = channel(0).ok_or_else(invalid)?;
        let g = channel(1).ok_or_else(invalid)?;
        let b = channel(2).ok_or_else(invalid)?;
        let a = channel(3).unwrap_or(255);
        Ok(Color([r, g, b, a]))
    }
}

/// Rectangle in source pixel space (`extract`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// Padding added around the image (`extend`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edges {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

/// Image transformation parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformParams {
    // === Resize ===
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: FitMode,
    pub position: Gravity,
    pub kernel: Kernel,
    /// Allow upscaling beyond original size
    pub enlarge: bool,

    // === Geometry ===
    pub extract: Option<Region>,
    /// Trim threshold (max channel distance from the corner pixel)
    pub trim: Option<u8>,
    pub extend: Option<Edges>,
    /// Rotation in degrees, normalized to 0, 90, 180 or 270
    pub rotate: Option<u16>,
    /// Mirror vertically
    pub flip: bool,
    /// Mirror horizontally
    pub flop: bool,

    // === Effects ===
    pub blur: Option<f32>,
    pub sharpen: Option<f32>,
    pub median: Option<u32>,
    pub gamma: Option<f32>,
    pub negate: bool,
    pub normalize: bool,
    pub grayscale: bool,
    pub threshold: Option<u8>,
    pub tint: Option<Color>,

    // === Output ===
    pub format: Option<OutputFormat>,
    pub quality: Option<u8>,
    /// Fill color for `extend`, `contain` letterboxing and JPEG flattening
    pub background: Option<Color>,
    /// Accepted; only the first frame is ever processed
    pub animated: bool,
}

impl TransformParams {
    /// Parse the canonical operation set.
    pub fn from_operations(operations: &CanonicalOperation) -> Result<Self, EngineError> {
        let mut result = Self::default();

        for (key, value) in operations.iter() {
            match key {
                OperationKey::Width => result.width = Some(parse_dimension("width", value)?),
                OperationKey::Height => result.height = Some(parse_dimension("height", value)?),
                OperationKey::Resize => {
                    let (w, h) = parse_resize(value)?;
                    result.width = result.width.or(Some(w));
                    result.height = result.height.or(h);
                }
                OperationKey::Quality => {
                    let quality: u8 = value
                        .parse()
                        .map_err(|_| EngineError::invalid_param("quality", "must be 1-100"))?;
                    if !(1..=100).contains(&quality) {
                        return Err(EngineError::invalid_param("quality", "must be 1-100"));
                    }
                    result.quality = Some(quality);
                }
                OperationKey::Format => result.format = Some(value.parse()?),
                OperationKey::Fit => result.fit = value.parse()?,
                OperationKey::Position => result.position = value.parse()?,
                OperationKey::Kernel => result.kernel = value.parse()?,
                OperationKey::Enlarge => result.enlarge = true,
                OperationKey::Extract => {
                    let [left, top, width, height] = parse_quad("extract", value)?;
                    if width == 0 || height == 0 {
                        return Err(EngineError::invalid_param(
                            "extract",
                            "width and height must be positive",
                        ));
                    }
                    result.extract = Some(Region {
                        left,
                        top,
                        width,
                        height,
                    });
                }
                OperationKey::Trim => {
                    let threshold = if value == "true" {
                        10
                    } else {
                        parse_byte("trim", value)?
                    };
                    result.trim = Some(threshold);
                }
                OperationKey::Extend => {
                    let [top, right, bottom, left] = parse_quad("extend", value)?;
                    result.extend = Some(Edges {
                        top,
                        right,
                        bottom,
                        left,
                    });
                }
                OperationKey::Rotate => {
                    let degrees: i32 = value
                        .parse()
                        .map_err(|_| EngineError::invalid_param("rotate", "must be an integer"))?;
                    if degrees % 90 != 0 {
                        return Err(EngineError::invalid_param(
                            "rotate",
                            "must be a multiple of 90",
                        ));
                    }
                    result.rotate = Some(degrees.rem_euclid(360) as u16);
                }
                OperationKey::Flip => result.flip = true,
                OperationKey::Flop => result.flop = true,
                OperationKey::Blur => {
                    result.blur = Some(parse_float("blur", value, 0.0..=100.0)?);
                }
                OperationKey::Sharpen => {
                    result.sharpen = Some(parse_float("sharpen", value, 0.0..=10.0)?);
                }
                OperationKey::Median => {
                    let size: u32 = value
                        .parse()
                        .map_err(|_| EngineError::invalid_param("median", "must be 1-15"))?;
                    if !(1..=15).contains(&size) {
                        return Err(EngineError::invalid_param("median", "must be 1-15"));
                    }
                    result.median = Some(size);
                }
                OperationKey::Gamma => {
                    result.gamma = Some(parse_float("gamma", value, 1.0..=3.0)?);
                }
                OperationKey::Negate => result.negate = true,
                OperationKey::Normalize => result.normalize = true,
                OperationKey::Grayscale => result.grayscale = true,
                OperationKey::Threshold => result.threshold = Some(parse_byte("threshold", value)?),
                OperationKey::Tint => result.tint = Some(Color::parse("tint", value)?),
                OperationKey::Background => {
                    result.background = Some(Color::parse("background", value)?)
                }
                OperationKey::Animated => result.animated = true,
            }
        }

        Ok(result)
    }
}

fn parse_dimension(param: &str, value: &str) -> Result<u32, EngineError> {
    let px: u32 = value
        .parse()
        .map_err(|_| EngineError::invalid_param(param, "invalid pixel value"))?;
    if px == 0 {
        return Err(EngineError::invalid_param(param, "must be greater than 0"));
    }
    Ok(px)
}

/// `WxH` or `W`
fn parse_resize(value: &str) -> Result<(u32, Option<u32>), EngineError> {
    match value.split_once(['x', 'X']) {
        Some((w, h)) => Ok((
            parse_dimension("resize", w)?,
            Some(parse_dimension("resize", h)?),
        )),
        None => Ok((parse_dimension("resize", value)?, None)),
    }
}

/// Four `_`-separated integers
fn parse_quad(param: &str, value: &str) -> Result<[u32; 4], EngineError> {
    let parts: Vec<u32> = value
        .split('_')
        .map(|part| part.parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|_| EngineError::invalid_param(param, "expected four integers separated by '_'"))?;
    <[u32; 4]>::try_from(parts)
        .map_err(|_| EngineError::invalid_param(param, "expected four integers separated by '_'"))
}

fn parse_byte(param: &str, value: &str) -> Result<u8, EngineError> {
    value
        .parse()
        .map_err(|_| EngineError::invalid_param(param, "must be 0-255"))
}

fn parse_float(
    param: &str,
    value: &str,
    range: std::ops::RangeInclusive<f32>,
) -> Result<f32, EngineError> {
    let parsed: f32 = value
        .parse()
        .map_err(|_| EngineError::invalid_param(param, "must be a number"))?;
    if !range.contains(&parsed) {
        return Err(EngineError::invalid_param(
            param,
            format!("must be {}-{}", range.start(), range.end()),
        ));
    }
    Ok(parsed)
}
