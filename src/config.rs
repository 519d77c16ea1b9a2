//! Store configuration.
//!
//! The backend variant is decided here, once, before the store exists:
//! Remote when an API URL is configured, Local otherwise.

use crate::error::{NotesError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the remote API base URL.
pub const ENV_API_URL: &str = "NOTES_API_URL";
/// Environment variable overriding the local data directory.
pub const ENV_DATA_DIR: &str = "NOTES_DATA_DIR";
/// Environment variable overriding the local latency, in milliseconds.
pub const ENV_LATENCY_MS: &str = "NOTES_LATENCY_MS";

const DEFAULT_STORAGE_KEY: &str = "notes";
const DEFAULT_LATENCY: Duration = Duration::from_millis(300);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DATA_DIR_NAME: &str = "notes-store";

/// Store configuration.
#[derive(Clone, Debug, Default)]
pub struct StoreConfig {
    pub backend: BackendConfig,
}

/// Which backend to use, with its parameters.
#[derive(Clone, Debug)]
pub enum BackendConfig {
    Remote(RemoteConfig),
    Local(LocalConfig),
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Local(LocalConfig::default())
    }
}

#[derive(Clone, Debug)]
pub struct RemoteConfig {
    /// API root; `/notes` is appended.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LocalConfig {
    /// Directory holding the blob.
    pub dir: PathBuf,
    /// Fixed key naming the blob.
    pub storage_key: String,
    /// Delay injected before every operation.
    pub latency: Duration,
    /// Write example notes when no blob exists yet.
    pub seed_examples: bool,
}

impl LocalConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            latency: DEFAULT_LATENCY,
            seed_examples: true,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

/// On-disk TOML shape. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    api_url: Option<String>,
    timeout_ms: Option<u64>,
    data_dir: Option<PathBuf>,
    storage_key: Option<String>,
    latency_ms: Option<u64>,
    seed_examples: Option<bool>,
}

impl ConfigFile {
    fn into_config(self) -> StoreConfig {
        let backend = match self.api_url.filter(|url| !url.trim().is_empty()) {
            Some(base_url) => BackendConfig::Remote(RemoteConfig {
                base_url,
                timeout: self
                    .timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_TIMEOUT),
            }),
            None => {
                let defaults = LocalConfig::default();
                BackendConfig::Local(LocalConfig {
                    dir: self.data_dir.unwrap_or(defaults.dir),
                    storage_key: self.storage_key.unwrap_or(defaults.storage_key),
                    latency: self
                        .latency_ms
                        .map(Duration::from_millis)
                        .unwrap_or(defaults.latency),
                    seed_examples: self.seed_examples.unwrap_or(defaults.seed_examples),
                })
            }
        };
        StoreConfig { backend }
    }
}

impl StoreConfig {
    pub fn remote(base_url: impl Into<String>) -> Self {
        Self {
            backend: BackendConfig::Remote(RemoteConfig::new(base_url)),
        }
    }

    pub fn local(dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendConfig::Local(LocalConfig::new(dir)),
        }
    }

    /// Parse a TOML configuration document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)
            .map_err(|e| NotesError::Validation(format!("invalid config: {e}")))?;
        Ok(file.into_config())
    }

    /// Load a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let latency_ms = match var(ENV_LATENCY_MS) {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                NotesError::Validation(format!("{ENV_LATENCY_MS} must be an integer, got {raw:?}"))
            })?),
            None => None,
        };
        let file = ConfigFile {
            api_url: var(ENV_API_URL),
            data_dir: var(ENV_DATA_DIR).map(PathBuf::from),
            latency_ms,
            ..Default::default()
        };
        Ok(file.into_config())
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.backend, BackendConfig::Remote(_))
    }
}
