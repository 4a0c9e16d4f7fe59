//! Source image loading.
//!
//! Locators come in two shapes:
//!
//! - `http://...` / `https://...` - fetched with `reqwest`
//! - anything else - a path relative to the configured storage root
//!
//! Both paths enforce the configured size limit. Local paths may not escape
//! the storage root.

use bytes::Bytes;
use reqwest::Url;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use super::error::EngineError;
use crate::config::EngineConfig;

/// Parsed source location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Remote(Url),
    Local(PathBuf),
}

/// Loader for source images with the engine's access rules applied
#[derive(Clone)]
pub struct SourceFetcher {
    http_client: reqwest::Client,
    storage_root: PathBuf,
    allowed_hosts: Vec<String>,
    max_source_bytes: usize,
}

impl SourceFetcher {
    /// Create a fetcher from engine configuration.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::HttpClient` if the HTTP client cannot be created.
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(|e| EngineError::HttpClient(e.to_string()))?;

        Ok(Self {
            http_client,
            storage_root: config.storage_root.clone(),
            allowed_hosts: config.allowed_hosts.clone(),
            max_source_bytes: config.max_source_bytes,
        })
    }

    /// Classify a locator and apply the access rules.
    pub fn resolve(&self, locator: &str) -> Result<SourceLocation, EngineError> {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            let url = Url::parse(locator)
                .map_err(|e| EngineError::fetch_failed(locator, format!("invalid URL: {e}")))?;
            let host = url.host_str().unwrap_or_default();
            if !host_allowed(&self.allowed_hosts, host) {
                return Err(EngineError::SourceNotAllowed {
                    locator: locator.to_string(),
                });
            }
            return Ok(SourceLocation::Remote(url));
        }

        let relative = Path::new(locator.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || relative.as_os_str().is_empty() {
            return Err(EngineError::SourceNotAllowed {
                locator: locator.to_string(),
            });
        }
        Ok(SourceLocation::Local(self.storage_root.join(relative)))
    }

    /// Load the source bytes for a locator.
    pub async fn fetch(&self, locator: &str) -> Result<Bytes, EngineError> {
        match self.resolve(locator)? {
            SourceLocation::Remote(url) => self.fetch_remote(locator, url).await,
            SourceLocation::Local(path) => self.fetch_local(locator, &path).await,
        }
    }

    async fn fetch_remote(&self, locator: &str, url: Url) -> Result<Bytes, EngineError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| EngineError::fetch_failed(locator, format!("HTTP fetch failed: {e}")))?;

        if !response.status().is_success() {
            return Err(EngineError::fetch_failed(
                locator,
                format!("HTTP request failed with status: {}", response.status()),
            ));
        }

        if let Some(length) = response.content_length() {
            self.check_size(length as usize)?;
        }

        let bytes = response.bytes().await.map_err(|e| {
            EngineError::fetch_failed(locator, format!("Failed to read HTTP body: {e}"))
        })?;
        self.check_size(bytes.len())?;

        tracing::debug!(locator = %locator, size = bytes.len(), "Fetched remote source");
        Ok(bytes)
    }

    async fn fetch_local(&self, locator: &str, path: &Path) -> Result<Bytes, EngineError> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => {
                return Err(EngineError::SourceNotFound {
                    locator: locator.to_string(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EngineError::SourceNotFound {
                    locator: locator.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        self.check_size(metadata.len() as usize)?;

        let data = tokio::fs::read(path).await?;
        Ok(Bytes::from(data))
    }

    fn check_size(&self, size: usize) -> Result<(), EngineError> {
        if size > self.max_source_bytes {
            return Err(EngineError::SourceTooLarge {
                size,
                max_size: self.max_source_bytes,
            });
        }
        Ok(())
    }
}

/// Host allow-list matching.
///
/// An empty list allows every host. Entries match exactly, or as a suffix when
/// written `*.example.com` (which does not match `example.com` itself).
pub fn host_allowed(allowed_hosts: &[String], host: &str) -> bool {
    if allowed_hosts.is_empty() {
        return true;
    }
    let host = host.to_lowercase();
    allowed_hosts.iter().any(|pattern| {
        let pattern = pattern.to_lowercase();
        match pattern.strip_prefix("*.") {
            Some(suffix) => host.ends_with(&format!(".{}", suffix)),
            None => host == pattern,
        }
    })
}
