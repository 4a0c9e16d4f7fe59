// Pipeline scenario tests
// Drive RequestHandler end to end against a recording engine

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, Mutex};

use imgway::engine::{EngineError, ImageData, ImageEngine, ProcessedImage};
use imgway::pipeline::{
    CanonicalOperation, HttpResponse, ImageLocator, OperationKey, OptimizeRequest,
    RequestContext, RequestHandler, ResponseMode,
};

const CACHE_CONTROL: &str = "public, max-age=60, stale-while-revalidate=60";

/// Engine double that records every call and answers with a fixed result
struct RecordingEngine {
    calls: Mutex<Vec<(String, CanonicalOperation)>>,
    format: Option<&'static str>,
    fail_with: Option<&'static str>,
}

impl RecordingEngine {
    fn returning(format: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            format,
            fail_with: None,
        })
    }

    fn failing(message: &'static str) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            format: None,
            fail_with: Some(message),
        })
    }

    fn calls(&self) -> Vec<(String, CanonicalOperation)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageEngine for RecordingEngine {
    async fn process(
        &self,
        locator: &ImageLocator,
        operations: &CanonicalOperation,
    ) -> Result<ProcessedImage, EngineError> {
        self.calls
            .lock()
            .unwrap()
            .push((locator.to_string(), operations.clone()));

        if let Some(message) = self.fail_with {
            return Err(EngineError::decode_failed(message));
        }
        Ok(ProcessedImage {
            data: ImageData::Bytes(Bytes::from_static(b"\x01\x02\x03")),
            format: self.format.map(str::to_string),
        })
    }
}

async fn run(engine: Arc<RecordingEngine>, path_and_query: &str) -> (HttpResponse, RequestContext) {
    let handler = RequestHandler::new(engine);
    let request = OptimizeRequest::new("http://localhost:8080", path_and_query, "/optimize")
        .expect("path is under the optimize route");
    let mut ctx = RequestContext::new("GET".to_string(), path_and_query.to_string());
    let response = handler.respond(&request, &mut ctx).await.into_http();
    (response, ctx)
}

fn json_body(response: &HttpResponse) -> serde_json::Value {
    serde_json::from_slice(&response.body).expect("body is JSON")
}

// Scenario A: remote locator with short aliases
#[tokio::test]
async fn test_remote_image_with_aliases() {
    let engine = RecordingEngine::returning(None);
    let (response, ctx) = run(
        engine.clone(),
        "/optimize/https:/img.example.com/a.jpg?w=800&q=80",
    )
    .await;

    let expected: CanonicalOperation = [
        (OperationKey::Width, "800"),
        (OperationKey::Quality, "80"),
        (OperationKey::Format, "webp"),
    ]
    .into_iter()
    .collect();
    assert_eq!(
        engine.calls(),
        vec![("https://img.example.com/a.jpg".to_string(), expected)]
    );

    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some("image/webp"));
    assert_eq!(response.header("Cache-Control"), Some(CACHE_CONTROL));
    assert_eq!(&response.body[..], b"\x01\x02\x03");
    assert_eq!(ctx.mode(), Some(ResponseMode::Image));
}

// Scenario B: blur placeholder, binary
#[tokio::test]
async fn test_blur_placeholder_binary() {
    let engine = RecordingEngine::returning(Some("webp"));
    let (response, ctx) = run(engine.clone(), "/optimize/a.png?placeholder=blur").await;

    let expected: CanonicalOperation = [
        (OperationKey::Width, "32"),
        (OperationKey::Quality, "50"),
        (OperationKey::Blur, "3"),
        (OperationKey::Format, "webp"),
    ]
    .into_iter()
    .collect();
    assert_eq!(engine.calls(), vec![("a.png".to_string(), expected)]);

    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some("image/webp"));
    assert_eq!(response.header("Cache-Control"), Some(CACHE_CONTROL));
    assert_eq!(ctx.mode(), Some(ResponseMode::Placeholder));
}

// Scenario C: blur placeholder, JSON descriptor
#[tokio::test]
async fn test_blur_placeholder_json_descriptor() {
    let engine = RecordingEngine::returning(None);
    let (response, ctx) = run(
        engine,
        "/optimize/a.png?w=640&placeholder=blur&placeholderWidth=16&format=json",
    )
    .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some("application/json"));
    assert_eq!(response.header("Cache-Control"), None);
    assert_eq!(ctx.mode(), Some(ResponseMode::PlaceholderJson));

    let body = json_body(&response);
    assert_eq!(body["type"], "blur");
    assert_eq!(body["placeholderDataUrl"], "data:image/webp;base64,AQID");
    assert_eq!(
        body["optimizedImageUrl"],
        "http://localhost:8080/optimize/a.png?w=640&format=json"
    );
    assert_eq!(body["placeholderWidth"], 16);
    assert_eq!(body["placeholderQuality"], 50);
    assert_eq!(body["blurSigma"], 3);
}

#[tokio::test]
async fn test_placeholder_json_with_unparseable_width() {
    let engine = RecordingEngine::returning(Some("webp"));
    let (response, _) = run(
        engine.clone(),
        "/optimize/a.png?placeholder=blur&placeholderWidth=abc&format=json",
    )
    .await;

    // The raw value still reaches the engine
    let (_, operations) = &engine.calls()[0];
    assert_eq!(operations.get(OperationKey::Width), Some("abc"));

    let body = json_body(&response);
    assert!(body["placeholderWidth"].is_null());
    assert_eq!(body["optimizedImageUrl"], "http://localhost:8080/optimize/a.png?format=json");
}

// Scenario D: no path segments
#[tokio::test]
async fn test_missing_path_is_400() {
    let engine = RecordingEngine::returning(None);
    let (response, _) = run(engine.clone(), "/optimize?w=10").await;

    assert_eq!(response.status, 400);
    assert_eq!(json_body(&response), serde_json::json!({ "error": "Missing image path" }));
    assert!(engine.calls().is_empty());
}

// Scenario E: engine failure
#[tokio::test]
async fn test_engine_failure_is_500_with_details() {
    let engine = RecordingEngine::failing("corrupt data");
    let (response, ctx) = run(engine, "/optimize/a.jpg?w=100").await;

    assert_eq!(response.status, 500);
    assert_eq!(response.header("Cache-Control"), None);
    assert_eq!(
        json_body(&response),
        serde_json::json!({
            "error": "Image processing failed",
            "details": "Failed to decode image: corrupt data"
        })
    );
    assert_eq!(ctx.locator(), Some("a.jpg"));
    assert!(ctx.engine_failed());
}

#[tokio::test]
async fn test_malformed_escape_is_500() {
    let engine = RecordingEngine::returning(None);
    let (response, _) = run(engine.clone(), "/optimize/bad%E0%A4%A.jpg").await;

    assert_eq!(response.status, 500);
    let body = json_body(&response);
    assert_eq!(body["error"], "Image processing failed");
    assert!(body["details"].as_str().unwrap().starts_with("URI malformed"));
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_passthrough_calls_engine_with_no_operations() {
    let engine = RecordingEngine::returning(Some("jpeg"));
    let (response, ctx) = run(engine.clone(), "/optimize/_/photos/cat%20face.jpg?utm=1").await;

    assert_eq!(
        engine.calls(),
        vec![("photos/cat face.jpg".to_string(), CanonicalOperation::new())]
    );
    assert_eq!(response.header("Content-Type"), Some("image/jpeg"));
    assert_eq!(ctx.mode(), Some(ResponseMode::Passthrough));
}

#[tokio::test]
async fn test_bare_flag_triggers_operations() {
    let engine = RecordingEngine::returning(None);
    run(engine.clone(), "/optimize/a.jpg?grayscale").await;

    let (_, operations) = &engine.calls()[0];
    assert!(operations.flag(OperationKey::Grayscale));
    assert_eq!(operations.format(), Some("webp"));
}

#[tokio::test]
async fn test_short_alias_wins_over_long() {
    let engine = RecordingEngine::returning(None);
    run(engine.clone(), "/optimize/a.jpg?width=200&w=100&f=png").await;

    let (_, operations) = &engine.calls()[0];
    assert_eq!(operations.get(OperationKey::Width), Some("100"));
    assert_eq!(operations.format(), Some("png"));
}

#[tokio::test]
async fn test_requested_format_sets_content_type_when_engine_is_silent() {
    let engine = RecordingEngine::returning(None);
    let (response, _) = run(engine, "/optimize/a.jpg?format=avif&w=10").await;
    assert_eq!(response.header("Content-Type"), Some("image/avif"));
}

#[tokio::test]
async fn test_non_blur_placeholder_is_ignored() {
    let engine = RecordingEngine::returning(None);
    let (_, ctx) = run(engine.clone(), "/optimize/a.jpg?placeholder=dominant&w=50").await;

    let (_, operations) = &engine.calls()[0];
    assert_eq!(operations.get(OperationKey::Width), Some("50"));
    assert!(!operations.contains(OperationKey::Blur));
    assert_eq!(ctx.mode(), Some(ResponseMode::Image));
    assert_eq!(ctx.placeholder(), Some("dominant"));
}
