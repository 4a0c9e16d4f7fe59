//! Server configuration types.
//!
//! This module defines the server-level configuration including:
//! - Address and port bindings
//! - Worker thread count
//! - The route prefix the optimize endpoint is mounted under
//! - The public origin used when rebuilding request URLs
//!
//! Default values are sourced from `crate::constants`.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ADDRESS, DEFAULT_PORT, DEFAULT_ROUTE_PREFIX, DEFAULT_THREADS};

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

// Default worker thread count
fn default_threads() -> usize {
    DEFAULT_THREADS
}

fn default_route_prefix() -> String {
    DEFAULT_ROUTE_PREFIX.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of worker threads (default: 4)
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Path prefix of the optimize endpoint (default: /optimize)
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
    /// Origin (scheme://host[:port]) used to rebuild request URLs.
    /// When unset, the request's Host header is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            threads: default_threads(),
            route_prefix: default_route_prefix(),
            public_base_url: None,
        }
    }
}

impl ServerConfig {
    /// Socket address to listen on ("address:port")
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Route prefix without a trailing slash
    pub fn normalized_route_prefix(&self) -> &str {
        self.route_prefix.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.address.trim().is_empty() {
            return Err("server.address cannot be empty".to_string());
        }
        if self.port == 0 {
            return Err("server.port must be greater than 0".to_string());
        }
        if self.threads == 0 {
            return Err("server.threads must be greater than 0".to_string());
        }
        if !self.route_prefix.starts_with('/') {
            return Err(format!(
                "server.route_prefix '{}' must start with /",
                self.route_prefix
            ));
        }
        if self.normalized_route_prefix().is_empty() {
            return Err("server.route_prefix cannot be the root path".to_string());
        }
        if let Some(base) = &self.public_base_url {
            let parsed = reqwest::Url::parse(base)
                .map_err(|e| format!("server.public_base_url '{}' is invalid: {}", base, e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(format!(
                    "server.public_base_url '{}' must use http or https",
                    base
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.address, DEFAULT_ADDRESS);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.threads, DEFAULT_THREADS);
        assert_eq!(config.route_prefix, DEFAULT_ROUTE_PREFIX);
        assert!(config.public_base_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_config_deserialize_defaults() {
        let config: ServerConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_normalized_route_prefix_strips_trailing_slash() {
        let config = ServerConfig {
            route_prefix: "/api/optimize/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.normalized_route_prefix(), "/api/optimize");
    }

    #[test]
    fn test_validate_rejects_bad_route_prefix() {
        let relative = ServerConfig {
            route_prefix: "optimize".to_string(),
            ..Default::default()
        };
        assert!(relative.validate().is_err());

        let root = ServerConfig {
            route_prefix: "/".to_string(),
            ..Default::default()
        };
        assert!(root.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_threads() {
        let config = ServerConfig {
            threads: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("threads"));
    }

    #[test]
    fn test_validate_public_base_url() {
        let good = ServerConfig {
            public_base_url: Some("https://img.example.com".to_string()),
            ..Default::default()
        };
        assert!(good.validate().is_ok());

        let bad_scheme = ServerConfig {
            public_base_url: Some("ftp://img.example.com".to_string()),
            ..Default::default()
        };
        assert!(bad_scheme.validate().is_err());

        let garbage = ServerConfig {
            public_base_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(garbage.validate().is_err());
    }
}
