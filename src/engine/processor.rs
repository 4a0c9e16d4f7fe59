//! Image processing implementation
//!
//! decode → orient → geometry → effects → encode, all on one RGBA8 buffer.
//! Runs synchronously; callers move it onto the blocking pool.

use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::io::Reader as ImageReader;
use image::{DynamicImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::num::NonZeroU32;

use super::effects;
use super::encoder::{EncodedImage, EncoderFactory, EncoderQuality};
use super::error::EngineError;
use super::params::{Color, FitMode, Gravity, Kernel, OutputFormat, TransformParams};
use crate::config::EngineConfig;

/// Dimension and quality limits applied to every transform
#[derive(Debug, Clone)]
pub struct ProcessingLimits {
    /// Maximum output width
    pub max_width: u32,
    /// Maximum output height
    pub max_height: u32,
    /// Maximum decoded source pixel count
    pub max_pixels: u64,
    /// Quality used when the request does not set one
    pub default_quality: u8,
}

impl From<&EngineConfig> for ProcessingLimits {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_width: config.max_width,
            max_height: config.max_height,
            max_pixels: config.max_pixels,
            default_quality: config.default_quality,
        }
    }
}

impl Default for ProcessingLimits {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

/// Geometry of a single resize step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePlan {
    /// Source region `(x, y, w, h)` to keep before scaling
    pub crop: Option<(u32, u32, u32, u32)>,
    /// Scaled size
    pub size: (u32, u32),
    /// Letterbox canvas `(w, h)` the scaled image is placed on
    pub canvas: Option<(u32, u32)>,
}

/// Transform `data` according to `params` and encode the result.
pub fn process_image(
    data: &[u8],
    params: &TransformParams,
    limits: &ProcessingLimits,
) -> Result<EncodedImage, EngineError> {
    // 1. Decode, refusing image bombs before allocating pixels
    let (img, source_format) = decode_image(data, limits)?;
    let mut img = apply_orientation(img, read_exif_orientation(data)).to_rgba8();

    // 2. Geometry
    if let Some(region) = params.extract {
        if region.left.saturating_add(region.width) > img.width()
            || region.top.saturating_add(region.height) > img.height()
        {
            return Err(EngineError::invalid_param(
                "extract",
                format!(
                    "region {}x{}+{}+{} exceeds image {}x{}",
                    region.width,
                    region.height,
                    region.left,
                    region.top,
                    img.width(),
                    img.height()
                ),
            ));
        }
        img = image::imageops::crop_imm(&img, region.left, region.top, region.width, region.height)
            .to_image();
    }

    if let Some(threshold) = params.trim {
        if let Some((x, y, w, h)) = effects::trim_bounds(&img, threshold) {
            img = image::imageops::crop_imm(&img, x, y, w, h).to_image();
        }
    }

    if let Some(plan) = plan_resize(
        img.width(),
        img.height(),
        params.width,
        params.height,
        params.fit,
        params.position,
        params.enlarge,
    ) {
        check_output_size(plan.canvas.unwrap_or(plan.size), limits)?;
        img = apply_resize(img, &plan, params)?;
    }

    if let Some(edges) = params.extend {
        let size = effects::extended_size(img.dimensions(), edges).ok_or_else(|| {
            EngineError::InvalidDimensions {
                width: img.width(),
                height: img.height(),
                reason: "extended canvas overflows".to_string(),
            }
        })?;
        check_output_size(size, limits)?;
        img = effects::extend(&img, edges, params.background.unwrap_or(Color::BLACK));
    }

    img = match params.rotate {
        Some(90) => image::imageops::rotate90(&img),
        Some(180) => image::imageops::rotate180(&img),
        Some(270) => image::imageops::rotate270(&img),
        _ => img,
    };
    if params.flip {
        image::imageops::flip_vertical_in_place(&mut img);
    }
    if params.flop {
        image::imageops::flip_horizontal_in_place(&mut img);
    }

    // 3. Effects
    if let Some(sigma) = params.blur.filter(|s| *s > 0.0) {
        img = image::imageops::blur(&img, sigma);
    }
    if let Some(sigma) = params.sharpen.filter(|s| *s > 0.0) {
        img = image::imageops::unsharpen(&img, sigma, 1);
    }
    if let Some(size) = params.median {
        img = effects::median(&img, size);
    }
    if let Some(gamma) = params.gamma {
        effects::gamma(&mut img, gamma);
    }
    if params.negate {
        image::imageops::invert(&mut img);
    }
    if params.normalize {
        effects::normalize(&mut img);
    }
    if params.grayscale {
        img = DynamicImage::ImageRgba8(img).grayscale().to_rgba8();
    }
    if let Some(level) = params.threshold {
        effects::threshold(&mut img, level);
    }
    if let Some(color) = params.tint {
        effects::tint(&mut img, color);
    }

    // 4. Encode
    let output_format = params
        .format
        .or(source_format)
        .unwrap_or(OutputFormat::Png);
    if !output_format.supports_transparency() {
        effects::flatten(&mut img, params.background.unwrap_or(Color::WHITE));
    }

    let quality = EncoderQuality::with_quality(params.quality.unwrap_or(limits.default_quality));
    let (width, height) = img.dimensions();
    EncoderFactory::create(output_format).encode(img.as_raw(), width, height, quality)
}

/// Decode image data, checking dimensions from the header first
fn decode_image(
    data: &[u8],
    limits: &ProcessingLimits,
) -> Result<(DynamicImage, Option<OutputFormat>), EngineError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| EngineError::decode_failed(e.to_string()))?;
    let format = reader
        .format()
        .ok_or_else(|| EngineError::unsupported_format(sniff_label(data)))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| EngineError::decode_failed(e.to_string()))?;
    if width as u64 * height as u64 > limits.max_pixels {
        return Err(EngineError::image_bomb(width, height, limits.max_pixels));
    }

    let img = image::load_from_memory_with_format(data, format)
        .map_err(|e| EngineError::decode_failed(e.to_string()))?;
    Ok((img, OutputFormat::from_image_format(format)))
}

/// Best-effort name for an undecodable payload, used in error messages
fn sniff_label(data: &[u8]) -> &'static str {
    let head = &data[..data.len().min(256)];
    let text = String::from_utf8_lossy(head);
    if text.contains("<svg") {
        "svg"
    } else {
        "unknown"
    }
}

/// Read EXIF orientation tag from raw image bytes.
/// Returns 1 (normal) if no EXIF data or tag not present.
pub fn read_exif_orientation(data: &[u8]) -> u32 {
    let mut cursor = Cursor::new(data);
    let exif = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif,
        Err(_) => return 1,
    };

    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply an EXIF orientation value
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

fn check_output_size((width, height): (u32, u32), limits: &ProcessingLimits) -> Result<(), EngineError> {
    if width > limits.max_width || height > limits.max_height {
        return Err(EngineError::InvalidDimensions {
            width,
            height,
            reason: format!(
                "output exceeds maximum {}x{}",
                limits.max_width, limits.max_height
            ),
        });
    }
    Ok(())
}

fn scaled(value: u32, scale: f64) -> u32 {
    ((value as f64 * scale).round() as u32).max(1)
}

/// Work out crop, scale and letterbox for the requested box.
///
/// Without `enlarge` the scale factor never exceeds 1.
pub fn plan_resize(
    src_w: u32,
    src_h: u32,
    width: Option<u32>,
    height: Option<u32>,
    fit: FitMode,
    position: Gravity,
    enlarge: bool,
) -> Option<ResizePlan> {
    let cap = |scale: f64| if enlarge { scale } else { scale.min(1.0) };
    let sx = |w: u32| w as f64 / src_w as f64;
    let sy = |h: u32| h as f64 / src_h as f64;

    let plan = match (width, height) {
        (None, None) => return None,
        (Some(w), None) => {
            let scale = cap(sx(w));
            ResizePlan {
                crop: None,
                size: (scaled(src_w, scale), scaled(src_h, scale)),
                canvas: None,
            }
        }
        (None, Some(h)) => {
            let scale = cap(sy(h));
            ResizePlan {
                crop: None,
                size: (scaled(src_w, scale), scaled(src_h, scale)),
                canvas: None,
            }
        }
        (Some(w), Some(h)) => match fit {
            FitMode::Fill => {
                let size = if enlarge {
                    (w, h)
                } else {
                    (w.min(src_w), h.min(src_h))
                };
                ResizePlan {
                    crop: None,
                    size,
                    canvas: None,
                }
            }
            FitMode::Inside | FitMode::Contain => {
                let scale = cap(sx(w).min(sy(h)));
                ResizePlan {
                    crop: None,
                    size: (scaled(src_w, scale), scaled(src_h, scale)),
                    canvas: (fit == FitMode::Contain).then_some((w, h)),
                }
            }
            FitMode::Outside => {
                let scale = cap(sx(w).max(sy(h)));
                ResizePlan {
                    crop: None,
                    size: (scaled(src_w, scale), scaled(src_h, scale)),
                    canvas: None,
                }
            }
            FitMode::Cover => {
                let scale = cap(sx(w).max(sy(h)));
                let out_w = w.min(scaled(src_w, scale));
                let out_h = h.min(scaled(src_h, scale));
                let crop_w = ((out_w as f64 / scale).round() as u32).clamp(1, src_w);
                let crop_h = ((out_h as f64 / scale).round() as u32).clamp(1, src_h);
                let (x, y) = position.offset(src_w - crop_w, src_h - crop_h);
                ResizePlan {
                    crop: (crop_w != src_w || crop_h != src_h).then_some((x, y, crop_w, crop_h)),
                    size: (out_w, out_h),
                    canvas: None,
                }
            }
        },
    };

    Some(plan)
}

fn apply_resize(
    img: RgbaImage,
    plan: &ResizePlan,
    params: &TransformParams,
) -> Result<RgbaImage, EngineError> {
    let img = match plan.crop {
        Some((x, y, w, h)) => image::imageops::crop_imm(&img, x, y, w, h).to_image(),
        None => img,
    };

    let (target_w, target_h) = plan.size;
    let resized = if img.dimensions() == plan.size {
        img
    } else {
        resize_image(&img, target_w, target_h, params.kernel)?
    };

    match plan.canvas {
        Some((canvas_w, canvas_h)) if (canvas_w, canvas_h) != resized.dimensions() => {
            let fill = params.background.unwrap_or(Color::BLACK);
            let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, Rgba(fill.0));
            let (x, y) = params.position.offset(
                canvas_w.saturating_sub(target_w),
                canvas_h.saturating_sub(target_h),
            );
            image::imageops::replace(&mut canvas, &resized, x as i64, y as i64);
            Ok(canvas)
        }
        _ => Ok(resized),
    }
}

/// Resize with fast_image_resize using the requested kernel
fn resize_image(
    img: &RgbaImage,
    target_w: u32,
    target_h: u32,
    kernel: Kernel,
) -> Result<RgbaImage, EngineError> {
    let src_width = NonZeroU32::new(img.width())
        .ok_or_else(|| EngineError::resize_failed("Source width is 0"))?;
    let src_height = NonZeroU32::new(img.height())
        .ok_or_else(|| EngineError::resize_failed("Source height is 0"))?;
    let dst_width =
        NonZeroU32::new(target_w).ok_or_else(|| EngineError::resize_failed("Target width is 0"))?;
    let dst_height =
        NonZeroU32::new(target_h).ok_or_else(|| EngineError::resize_failed("Target height is 0"))?;

    let src_image = Image::from_vec_u8(src_width, src_height, img.as_raw().clone(), PixelType::U8x4)
        .map_err(|e| EngineError::resize_failed(format!("Failed to create source image: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    let algorithm = match kernel {
        Kernel::Nearest => ResizeAlg::Nearest,
        Kernel::Linear => ResizeAlg::Convolution(FilterType::Bilinear),
        Kernel::Cubic => ResizeAlg::Convolution(FilterType::CatmullRom),
        Kernel::Mitchell => ResizeAlg::Convolution(FilterType::Mitchell),
        Kernel::Lanczos3 => ResizeAlg::Convolution(FilterType::Lanczos3),
    };
    let mut resizer = Resizer::new(algorithm);

    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| EngineError::resize_failed(format!("Resize operation failed: {:?}", e)))?;

    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| EngineError::resize_failed("Failed to create output image buffer"))
}

/// Format tag for raw source bytes, used for passthrough responses
pub fn detect_format(data: &[u8]) -> Option<&'static str> {
    match image::guess_format(data).ok()? {
        image::ImageFormat::Bmp => Some("bmp"),
        image::ImageFormat::Tiff => Some("tiff"),
        image::ImageFormat::Ico => Some("x-icon"),
        other => OutputFormat::from_image_format(other).map(|f| f.as_str()),
    }
}

/// Whether the payload looks like SVG markup
pub fn is_svg(data: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&data[..data.len().min(1024)]);
    let trimmed = head.trim_start_matches('\u{feff}').trim_start();
    (trimmed.starts_with("<svg") || trimmed.starts_with("<?xml")) && head.contains("<svg")
}
