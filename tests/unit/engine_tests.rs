// Reference engine tests against real images in a temporary storage root

use image::{GenericImageView, ImageOutputFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

use imgway::config::EngineConfig;
use imgway::engine::{EngineError, ImageData, ImageEngine, PixelEngine, ProcessedImage};
use imgway::pipeline::{build_operations, CanonicalOperation, ImageLocator, QueryParams};

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 128])
        }
    });
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .unwrap();
    std::fs::write(dir.join(name), &bytes).unwrap();
    bytes
}

fn engine(dir: &TempDir) -> PixelEngine {
    let config = EngineConfig {
        storage_root: dir.path().to_path_buf(),
        ..Default::default()
    };
    PixelEngine::new(&config).unwrap()
}

async fn process(
    engine: &PixelEngine,
    locator: &str,
    operations: &CanonicalOperation,
) -> Result<ProcessedImage, EngineError> {
    let locator = ImageLocator::try_from(locator).unwrap();
    engine.process(&locator, operations).await
}

fn bytes_of(result: ProcessedImage) -> Vec<u8> {
    match result.data {
        ImageData::Bytes(bytes) => bytes.to_vec(),
        ImageData::Text(_) => panic!("expected binary output"),
    }
}

fn ops(query: &str) -> CanonicalOperation {
    build_operations(&QueryParams::parse(query))
}

#[tokio::test]
async fn test_passthrough_returns_source_unchanged() {
    let dir = TempDir::new().unwrap();
    let source = write_png(dir.path(), "a.png", 8, 8);

    let result = process(&engine(&dir), "a.png", &CanonicalOperation::new())
        .await
        .unwrap();
    assert_eq!(result.format.as_deref(), Some("png"));
    assert_eq!(bytes_of(result), source);
}

#[tokio::test]
async fn test_width_only_keeps_aspect_ratio() {
    let dir = TempDir::new().unwrap();
    write_png(dir.path(), "wide.png", 40, 20);

    let result = process(&engine(&dir), "wide.png", &ops("w=10&f=png"))
        .await
        .unwrap();
    assert_eq!(result.format.as_deref(), Some("png"));
    let decoded = image::load_from_memory(&bytes_of(result)).unwrap();
    assert_eq!(decoded.dimensions(), (10, 5));
}

#[tokio::test]
async fn test_cover_crops_to_exact_box() {
    let dir = TempDir::new().unwrap();
    write_png(dir.path(), "wide.png", 40, 20);

    let result = process(&engine(&dir), "wide.png", &ops("w=10&h=10&f=png"))
        .await
        .unwrap();
    let decoded = image::load_from_memory(&bytes_of(result)).unwrap();
    assert_eq!(decoded.dimensions(), (10, 10));
}

#[tokio::test]
async fn test_no_enlargement_by_default() {
    let dir = TempDir::new().unwrap();
    write_png(dir.path(), "small.png", 8, 4);

    let result = process(&engine(&dir), "small.png", &ops("w=80&f=png"))
        .await
        .unwrap();
    let decoded = image::load_from_memory(&bytes_of(result)).unwrap();
    assert_eq!(decoded.dimensions(), (8, 4));
}

#[tokio::test]
async fn test_default_format_is_webp() {
    let dir = TempDir::new().unwrap();
    write_png(dir.path(), "a.png", 16, 16);

    let result = process(&engine(&dir), "a.png", &ops("w=8")).await.unwrap();
    assert_eq!(result.format.as_deref(), Some("webp"));
    let data = bytes_of(result);
    assert_eq!(&data[0..4], b"RIFF");
    assert_eq!(&data[8..12], b"WEBP");
}

#[tokio::test]
async fn test_jpeg_output_from_transparent_source() {
    let dir = TempDir::new().unwrap();
    write_png(dir.path(), "alpha.png", 16, 16);

    let result = process(&engine(&dir), "alpha.png", &ops("f=jpg&grayscale&q=60"))
        .await
        .unwrap();
    assert_eq!(result.format.as_deref(), Some("jpeg"));
    assert_eq!(&bytes_of(result)[0..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn test_rotate_swaps_dimensions() {
    let dir = TempDir::new().unwrap();
    write_png(dir.path(), "wide.png", 12, 6);

    let result = process(&engine(&dir), "wide.png", &ops("rotate=90&f=png"))
        .await
        .unwrap();
    let decoded = image::load_from_memory(&bytes_of(result)).unwrap();
    assert_eq!(decoded.dimensions(), (6, 12));
}

#[tokio::test]
async fn test_extend_and_extract() {
    let dir = TempDir::new().unwrap();
    write_png(dir.path(), "a.png", 20, 20);

    let result = process(
        &engine(&dir),
        "a.png",
        &ops("extract=2_2_10_8&extend=1_2_3_4&f=png"),
    )
    .await
    .unwrap();
    let decoded = image::load_from_memory(&bytes_of(result)).unwrap();
    assert_eq!(decoded.dimensions(), (10 + 2 + 4, 8 + 1 + 3));
}

#[tokio::test]
async fn test_missing_source_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = process(&engine(&dir), "missing.png", &ops("w=10"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SourceNotFound { .. }));
}

#[tokio::test]
async fn test_traversal_is_rejected() {
    let dir = TempDir::new().unwrap();
    let err = process(&engine(&dir), "../secret.png", &CanonicalOperation::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SourceNotAllowed { .. }));
}

#[tokio::test]
async fn test_invalid_parameter_is_reported() {
    let dir = TempDir::new().unwrap();
    write_png(dir.path(), "a.png", 8, 8);

    let err = process(&engine(&dir), "a.png", &ops("rotate=45"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidParameter { .. }));
    assert!(err.to_string().contains("rotate"));
}

#[tokio::test]
async fn test_undecodable_source_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("junk.png"), b"definitely not an image").unwrap();

    let result = process(&engine(&dir), "junk.png", &ops("w=10")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_pixel_limit_is_enforced() {
    let dir = TempDir::new().unwrap();
    write_png(dir.path(), "big.png", 100, 100);
    let config = EngineConfig {
        storage_root: dir.path().to_path_buf(),
        max_pixels: 1_000,
        ..Default::default()
    };
    let engine = PixelEngine::new(&config).unwrap();

    let err = process(&engine, "big.png", &ops("w=10")).await.unwrap_err();
    assert!(matches!(err, EngineError::ImageBombDetected { .. }));
}
