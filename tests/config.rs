use std::time::Duration;

use assert_matches::assert_matches;

use patho_dash::config::{Config, ConfigLoader, DEFAULT_IMAGE_BASE_URL};
use patho_dash::error::DashError;

#[test]
fn defaults_apply_to_empty_config() {
    let config = Config {
        output_dir: Some("/tmp/patho-dash".to_string()),
        ..Config::default()
    };
    let resolved = ConfigLoader::resolve_config(config, None).unwrap();
    assert_eq!(resolved.api_url, None);
    assert_eq!(resolved.page_size, 100);
    assert_eq!(resolved.timeout, Duration::from_secs(30));
    assert_eq!(resolved.atlas_version, "latest");
    assert_eq!(resolved.image_base_url, DEFAULT_IMAGE_BASE_URL);
    assert_eq!(resolved.output_dir.as_str(), "/tmp/patho-dash");
    assert_matches!(resolved.require_api_url(), Err(DashError::MissingApiUrl));
}

#[test]
fn environment_overrides_file_api_url() {
    let config = Config {
        api_url: Some("http://file:8000".to_string()),
        output_dir: Some("/tmp".to_string()),
        ..Config::default()
    };
    let resolved =
        ConfigLoader::resolve_config(config, Some("http://env:9000".to_string())).unwrap();
    assert_eq!(resolved.require_api_url().unwrap(), "http://env:9000/");

    let config = Config {
        api_url: Some("http://file:8000/".to_string()),
        output_dir: Some("/tmp".to_string()),
        ..Config::default()
    };
    let resolved = ConfigLoader::resolve_config(config, Some("  ".to_string())).unwrap();
    assert_eq!(resolved.api_url.as_deref(), Some("http://file:8000/"));
}

#[test]
fn zero_page_size_is_rejected() {
    let config = Config {
        page_size: Some(0),
        output_dir: Some("/tmp".to_string()),
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config, None),
        Err(DashError::ConfigParse(_))
    );
}

#[test]
fn explicit_config_file_is_read() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("dash.json");
    std::fs::write(
        &path,
        r#"{"api_url": "http://localhost:8000", "page_size": 25, "output_dir": "/tmp/out"}"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.page_size, 25);
    assert_eq!(resolved.output_dir.as_str(), "/tmp/out");
}

#[test]
fn missing_explicit_config_is_an_error() {
    assert_matches!(
        ConfigLoader::resolve(Some("/nonexistent/patho-dash.json")),
        Err(DashError::ConfigRead(_))
    );
}

#[test]
fn malformed_config_is_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("dash.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(DashError::ConfigParse(_))
    );
}
