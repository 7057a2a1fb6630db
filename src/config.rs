use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::Theme;
use crate::error::GlossaryError;
use crate::pipeline::LOAD_MORE_STEP;
use crate::version::BUILD_DATA_VERSION;

pub const DEFAULT_CONFIG_FILE: &str = "glossary.json";
pub const DEFAULT_BASE_URL: &str = "https://glossary.example.org";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub data_version: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<String>,
    #[serde(default)]
    pub export_dir: Option<String>,
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub theme: Option<Theme>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub data_version: String,
    pub cache_dir: Option<Utf8PathBuf>,
    pub export_dir: Utf8PathBuf,
    pub page_size: usize,
    pub request_timeout: Option<Duration>,
    pub theme: Option<Theme>,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub cache_dir: Option<String>,
    pub export_dir: Option<String>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, or `glossary.json` when present. An explicit path
    /// that cannot be read is an error; a missing default file is not.
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, GlossaryError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| GlossaryError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content)
                .map_err(|err| GlossaryError::ConfigParse(err.to_string()))?
        };

        Self::resolve_config(config, overrides)
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, GlossaryError> {
        let base_url = overrides
            .base_url
            .or(config.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if base_url.trim().is_empty() {
            return Err(GlossaryError::ConfigParse("base_url is empty".to_string()));
        }

        let export_dir = match overrides.export_dir.or(config.export_dir) {
            Some(dir) => Utf8PathBuf::from(dir),
            None => current_dir()?,
        };

        let page_size = config.page_size.unwrap_or(LOAD_MORE_STEP);
        if page_size == 0 {
            return Err(GlossaryError::ConfigParse(
                "page_size must be at least 1".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            base_url,
            data_version: config
                .data_version
                .unwrap_or_else(|| BUILD_DATA_VERSION.to_string()),
            cache_dir: overrides.cache_dir.or(config.cache_dir).map(Utf8PathBuf::from),
            export_dir,
            page_size,
            request_timeout: config.request_timeout_secs.map(Duration::from_secs),
            theme: config.theme,
        })
    }
}

fn current_dir() -> Result<Utf8PathBuf, GlossaryError> {
    let cwd = std::env::current_dir().map_err(|err| GlossaryError::Filesystem(err.to_string()))?;
    Utf8PathBuf::from_path_buf(cwd)
        .map_err(|_| GlossaryError::Filesystem("invalid working directory path".to_string()))
}
