// Configuration loading tests

use imgway::config::*;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_full_yaml_config() {
    let yaml = r#"
server:
  address: "127.0.0.1"
  port: 9000
  threads: 2
  route_prefix: "/img"
  public_base_url: "https://img.example.com"
engine:
  storage_root: "/srv/images"
  allowed_hosts:
    - "*.example.com"
  fetch_timeout_secs: 5
  max_source_bytes: 1048576
  max_width: 4000
  max_height: 3000
  max_pixels: 12000000
  default_quality: 70
logging:
  format: pretty
  level: warn
"#;
    let config = Config::from_yaml_with_env(yaml).expect("Failed to parse config");
    assert!(config.validate().is_ok());

    assert_eq!(config.server.listen_addr(), "127.0.0.1:9000");
    assert_eq!(config.server.threads, 2);
    assert_eq!(config.server.normalized_route_prefix(), "/img");
    assert_eq!(
        config.server.public_base_url.as_deref(),
        Some("https://img.example.com")
    );

    assert_eq!(config.engine.storage_root.to_string_lossy(), "/srv/images");
    assert_eq!(config.engine.allowed_hosts, vec!["*.example.com".to_string()]);
    assert_eq!(config.engine.fetch_timeout_secs, 5);
    assert_eq!(config.engine.max_source_bytes, 1_048_576);
    assert_eq!(config.engine.max_width, 4000);
    assert_eq!(config.engine.max_height, 3000);
    assert_eq!(config.engine.max_pixels, 12_000_000);
    assert_eq!(config.engine.default_quality, 70);

    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_route_prefix_trailing_slash_is_normalized() {
    let config = Config::from_yaml_with_env("server:\n  route_prefix: \"/optimize/\"\n").unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.server.normalized_route_prefix(), "/optimize");
}

#[test]
fn test_root_route_prefix_is_rejected() {
    let config = Config::from_yaml_with_env("server:\n  route_prefix: \"/\"\n").unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.contains("route_prefix"));
}

#[test]
fn test_route_prefix_without_leading_slash_is_rejected() {
    let config = Config::from_yaml_with_env("server:\n  route_prefix: \"optimize\"\n").unwrap();
    assert!(config.validate().unwrap_err().contains("must start with /"));
}

#[test]
fn test_public_base_url_must_be_http() {
    let config =
        Config::from_yaml_with_env("server:\n  public_base_url: \"ftp://files.example.com\"\n")
            .unwrap();
    assert!(config.validate().unwrap_err().contains("http or https"));

    let config =
        Config::from_yaml_with_env("server:\n  public_base_url: \"not a url\"\n").unwrap();
    assert!(config.validate().unwrap_err().contains("is invalid"));
}

#[test]
fn test_zero_threads_is_rejected() {
    let config = Config::from_yaml_with_env("server:\n  threads: 0\n").unwrap();
    assert!(config.validate().unwrap_err().contains("threads"));
}

#[test]
fn test_unknown_log_level_is_rejected() {
    let config = Config::from_yaml_with_env("logging:\n  level: chatty\n").unwrap();
    assert!(config.validate().unwrap_err().contains("chatty"));
}

#[test]
fn test_env_substitution_in_file() {
    std::env::set_var("IMGWAY_CONFIG_TEST_PORT", "8181");
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"server:\n  port: ${IMGWAY_CONFIG_TEST_PORT}\n")
        .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.server.port, 8181);
}

#[test]
fn test_sample_config_file_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.yaml");
    let config = Config::from_file(path).expect("sample config loads");
    assert!(config.validate().is_ok());
    assert_eq!(config.server.route_prefix, "/optimize");
}
