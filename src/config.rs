use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::UserDirs;
use serde::{Deserialize, Serialize};

use crate::error::DashError;
use crate::paging::DEFAULT_PAGE_SIZE;

pub const CONFIG_FILE: &str = "patho-dash.json";
pub const API_URL_ENV: &str = "API_URL";
pub const DEFAULT_IMAGE_BASE_URL: &str = "http://images.proteinatlas.org/";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub atlas_version: Option<String>,
    #[serde(default)]
    pub image_base_url: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_url: Option<String>,
    pub page_size: u32,
    pub timeout: Duration,
    pub atlas_version: String,
    pub image_base_url: String,
    pub output_dir: Utf8PathBuf,
}

impl ResolvedConfig {
    /// Base URL of the sample API; its absence is fatal for the API data path.
    pub fn require_api_url(&self) -> Result<&str, DashError> {
        self.api_url.as_deref().ok_or(DashError::MissingApiUrl)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, DashError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| DashError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content).map_err(|err| DashError::ConfigParse(err.to_string()))?
        };

        Self::resolve_config(config, std::env::var(API_URL_ENV).ok())
    }

    pub fn resolve_config(
        config: Config,
        api_url_env: Option<String>,
    ) -> Result<ResolvedConfig, DashError> {
        let api_url = api_url_env
            .filter(|value| !value.trim().is_empty())
            .or(config.api_url)
            .map(|value| normalize_base_url(value.trim()));

        let page_size = config.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(DashError::ConfigParse("page_size must be positive".to_string()));
        }

        let output_dir = match config.output_dir {
            Some(dir) => Utf8PathBuf::from(dir),
            None => default_output_dir()?,
        };

        Ok(ResolvedConfig {
            api_url,
            page_size,
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(30)),
            atlas_version: config.atlas_version.unwrap_or_else(|| "latest".to_string()),
            image_base_url: config
                .image_base_url
                .map(|value| normalize_base_url(&value))
                .unwrap_or_else(|| DEFAULT_IMAGE_BASE_URL.to_string()),
            output_dir,
        })
    }
}

fn normalize_base_url(value: &str) -> String {
    if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    }
}

fn default_output_dir() -> Result<Utf8PathBuf, DashError> {
    if let Some(dir) = UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(|dir| dir.to_path_buf()))
        .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
    {
        return Ok(dir);
    }
    let cwd = std::env::current_dir().map_err(|err| DashError::Filesystem(err.to_string()))?;
    Utf8PathBuf::from_path_buf(cwd)
        .map_err(|_| DashError::Filesystem("invalid working directory path".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let resolved = ConfigLoader::resolve_config(Config::default(), None).unwrap();
        assert_eq!(resolved.api_url, None);
        assert_eq!(resolved.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(resolved.atlas_version, "latest");
        assert_eq!(resolved.image_base_url, DEFAULT_IMAGE_BASE_URL);
    }

    #[test]
    fn env_overrides_file_and_gets_trailing_slash() {
        let config = Config {
            api_url: Some("http://file.example/".to_string()),
            ..Config::default()
        };
        let resolved =
            ConfigLoader::resolve_config(config, Some("http://env.example".to_string())).unwrap();
        assert_eq!(resolved.api_url.as_deref(), Some("http://env.example/"));
    }
}
