//! Reference image engine configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_HEIGHT, DEFAULT_MAX_PIXELS, DEFAULT_MAX_SOURCE_BYTES,
    DEFAULT_MAX_WIDTH, DEFAULT_QUALITY, DEFAULT_STORAGE_ROOT,
};

fn default_storage_root() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_ROOT)
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_max_source_bytes() -> usize {
    DEFAULT_MAX_SOURCE_BYTES
}

fn default_max_width() -> u32 {
    DEFAULT_MAX_WIDTH
}

fn default_max_height() -> u32 {
    DEFAULT_MAX_HEIGHT
}

fn default_max_pixels() -> u64 {
    DEFAULT_MAX_PIXELS
}

fn default_quality() -> u8 {
    DEFAULT_QUALITY
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory that relative locators are resolved against
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,

    /// Hosts remote sources may be fetched from (empty = any host)
    #[serde(default)]
    pub allowed_hosts: Vec<String>,

    /// Timeout for fetching remote sources
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Maximum accepted source size in bytes
    #[serde(default = "default_max_source_bytes")]
    pub max_source_bytes: usize,

    /// Maximum allowed width for output images (to prevent abuse)
    #[serde(default = "default_max_width")]
    pub max_width: u32,

    /// Maximum allowed height for output images
    #[serde(default = "default_max_height")]
    pub max_height: u32,

    /// Maximum decoded pixel count of a source image
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,

    /// Default quality for lossy formats (JPEG, WebP, AVIF)
    #[serde(default = "default_quality")]
    pub default_quality: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            allowed_hosts: Vec::new(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_source_bytes: default_max_source_bytes(),
            max_width: default_max_width(),
            max_height: default_max_height(),
            max_pixels: default_max_pixels(),
            default_quality: default_quality(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.storage_root.as_os_str().is_empty() {
            return Err("engine.storage_root cannot be empty".to_string());
        }
        if self.fetch_timeout_secs == 0 {
            return Err("engine.fetch_timeout_secs must be greater than 0".to_string());
        }
        if self.max_source_bytes == 0 {
            return Err("engine.max_source_bytes must be greater than 0".to_string());
        }
        if self.max_width == 0 || self.max_height == 0 {
            return Err("engine.max_width and engine.max_height must be greater than 0".to_string());
        }
        if self.max_pixels == 0 {
            return Err("engine.max_pixels must be greater than 0".to_string());
        }
        if !(1..=100).contains(&self.default_quality) {
            return Err(format!(
                "engine.default_quality {} must be between 1 and 100",
                self.default_quality
            ));
        }
        if self.allowed_hosts.iter().any(|h| h.trim().is_empty()) {
            return Err("engine.allowed_hosts cannot contain empty entries".to_string());
        }
        Ok(())
    }
}
