// Request context - per-request state carried through the gateway

use std::time::{Duration, Instant};
use uuid::Uuid;

/// How the optimize route answered a request, for metrics and access logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Image,
    Passthrough,
    Placeholder,
    PlaceholderJson,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Image => "image",
            ResponseMode::Passthrough => "passthrough",
            ResponseMode::Placeholder => "placeholder",
            ResponseMode::PlaceholderJson => "placeholder_json",
        }
    }
}

/// Request context that holds all information about an HTTP request
/// as it flows through the gateway
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    method: String,
    path: String,
    start: Instant,
    locator: Option<String>,
    placeholder: Option<String>,
    mode: Option<ResponseMode>,
    status: Option<u16>,
    engine_time: Option<Duration>,
    engine_failed: bool,
}

impl RequestContext {
    /// Create a new RequestContext from HTTP request information
    /// Automatically generates a unique request ID (UUID v4) and starts the clock
    pub fn new(method: String, path: String) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            method,
            path,
            start: Instant::now(),
            locator: None,
            placeholder: None,
            mode: None,
            status: None,
            engine_time: None,
            engine_failed: false,
        }
    }

    /// Get the unique request ID
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Time since the request was received
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn set_locator(&mut self, locator: impl Into<String>) {
        self.locator = Some(locator.into());
    }

    pub fn locator(&self) -> Option<&str> {
        self.locator.as_deref()
    }

    /// Raw `placeholder` query value, whatever it was
    pub fn set_placeholder(&mut self, placeholder: Option<String>) {
        self.placeholder = placeholder;
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    pub fn set_mode(&mut self, mode: ResponseMode) {
        self.mode = Some(mode);
    }

    pub fn mode(&self) -> Option<ResponseMode> {
        self.mode
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = Some(status);
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Record how long the engine call took and whether it failed
    pub fn record_engine_call(&mut self, elapsed: Duration, failed: bool) {
        self.engine_time = Some(elapsed);
        self.engine_failed = failed;
    }

    /// Engine call duration, if the engine was called
    pub fn engine_time(&self) -> Option<Duration> {
        self.engine_time
    }

    pub fn engine_failed(&self) -> bool {
        self.engine_failed
    }
}
