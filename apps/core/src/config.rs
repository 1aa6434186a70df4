use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const ENDPOINT_ENV: &str = "QUICKFIND_INDEX_ENDPOINT";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_results: usize,
    pub debounce_ms: u64,
    /// `host:port` of a live index service. Unset means mock mode.
    pub index_endpoint: Option<String>,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: Option<u64>,
    pub ready_poll_interval_ms: u64,
    pub log_level: String,
    #[serde(skip)]
    pub config_path: PathBuf,
    pub logs_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let base = stable_app_data_dir();
        Self {
            max_results: 100,
            debounce_ms: 300,
            index_endpoint: None,
            connect_timeout_ms: 500,
            request_timeout_ms: Some(5_000),
            ready_poll_interval_ms: 500,
            log_level: "info".to_string(),
            config_path: base.join(CONFIG_FILE_NAME),
            logs_dir: base.join("logs"),
        }
    }
}

impl Config {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }
}

pub fn stable_app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("quickfind")
}

/// Reads the config at `path` (or the default location). A missing file
/// yields defaults; the environment endpoint override is applied last.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| Config::default().config_path);

    let mut config = if path.exists() {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        parse(&path, &raw)?
    } else {
        Config::default()
    };
    config.config_path = path;

    apply_endpoint_override(&mut config, std::env::var(ENDPOINT_ENV).ok());
    validate(&config)?;
    Ok(config)
}

pub fn parse(path: &Path, raw: &str) -> Result<Config, ConfigError> {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);

    let parsed = match extension.as_deref() {
        Some("toml") => toml::from_str::<Config>(raw).map_err(|error| error.to_string()),
        _ => json5::from_str::<Config>(raw).map_err(|error| error.to_string()),
    };
    parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

pub fn save(config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = config.config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let mut encoded = serde_json::to_string_pretty(config)?;
    encoded.push('\n');
    std::fs::write(&config.config_path, encoded).map_err(|source| ConfigError::Write {
        path: config.config_path.clone(),
        source,
    })
}

/// Blank values clear the endpoint, switching to mock mode.
pub fn apply_endpoint_override(config: &mut Config, value: Option<String>) {
    let Some(value) = value else {
        return;
    };
    let trimmed = value.trim();
    config.index_endpoint = (!trimmed.is_empty()).then(|| trimmed.to_string());
}

pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if !(5..=1_000).contains(&cfg.max_results) {
        return Err(ConfigError::Invalid("max_results out of range".into()));
    }

    if cfg.debounce_ms > 5_000 {
        return Err(ConfigError::Invalid("debounce_ms out of range".into()));
    }

    if cfg.connect_timeout_ms == 0 {
        return Err(ConfigError::Invalid("connect_timeout_ms must be positive".into()));
    }

    if cfg.ready_poll_interval_ms == 0 {
        return Err(ConfigError::Invalid(
            "ready_poll_interval_ms must be positive".into(),
        ));
    }

    if let Some(endpoint) = &cfg.index_endpoint {
        validate_endpoint(endpoint)?;
    }

    if cfg.config_path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("config_path is required".into()));
    }

    if cfg.logs_dir.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("logs_dir is required".into()));
    }

    Ok(())
}

fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::Invalid(format!("index_endpoint '{endpoint}' is not host:port"));
    let (host, port) = endpoint.trim().rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() {
        return Err(invalid());
    }
    match port.parse::<u16>() {
        Ok(port) if port > 0 => Ok(()),
        _ => Err(invalid()),
    }
}
