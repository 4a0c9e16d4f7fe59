// Constants module - centralized default values for configuration
//
// This module defines all default values used throughout the codebase.
// Using constants instead of magic numbers improves maintainability
// and makes it easier to understand and modify defaults.

// =============================================================================
// Server defaults
// =============================================================================

/// Default bind address
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Default number of worker threads
pub const DEFAULT_THREADS: usize = 4;

/// Default route prefix for the optimize endpoint
pub const DEFAULT_ROUTE_PREFIX: &str = "/optimize";

// =============================================================================
// Response defaults
// =============================================================================

/// Cache-Control value sent with every image response
pub const IMAGE_CACHE_CONTROL: &str = "public, max-age=60, stale-while-revalidate=60";

/// Output format used when the client does not ask for one
pub const DEFAULT_FORMAT: &str = "webp";

// =============================================================================
// Placeholder defaults
// =============================================================================

/// Default placeholder width in pixels
pub const DEFAULT_PLACEHOLDER_WIDTH: &str = "32";

/// Default placeholder quality
pub const DEFAULT_PLACEHOLDER_QUALITY: &str = "50";

/// Default placeholder blur sigma
pub const DEFAULT_PLACEHOLDER_BLUR: &str = "3";

// =============================================================================
// Engine defaults
// =============================================================================

/// Default directory that relative locators are resolved against
pub const DEFAULT_STORAGE_ROOT: &str = "./public";

/// Default timeout for fetching remote sources, in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default maximum source size (50 MB)
pub const DEFAULT_MAX_SOURCE_BYTES: usize = 50 * 1024 * 1024;

/// Default maximum output width
pub const DEFAULT_MAX_WIDTH: u32 = 8192;

/// Default maximum output height
pub const DEFAULT_MAX_HEIGHT: u32 = 8192;

/// Default maximum decoded pixel count (image bomb protection)
pub const DEFAULT_MAX_PIXELS: u64 = 100_000_000;

/// Default encoder quality for lossy formats
pub const DEFAULT_QUALITY: u8 = 80;

// =============================================================================
// Logging defaults
// =============================================================================

/// Default log level filter
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Metrics defaults
// =============================================================================

/// Number of engine latency samples kept for percentile computation
pub const LATENCY_SAMPLE_WINDOW: usize = 10_000;
