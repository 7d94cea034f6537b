use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8083";
pub const DEFAULT_STORAGE_KEY: &str = "app_state";
pub const DEFAULT_REFRESH_KEY: &str = "refresh_token";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Remote authentication API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.into(), timeout_secs: default_timeout() }
    }
}

/// Where the session snapshot is persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    #[serde(default = "default_storage_key")]
    pub key: String,
    /// Entry in the same file holding the refresh token between runs.
    #[serde(default = "default_refresh_key")]
    pub refresh_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: default_storage_path(), key: default_storage_key(), refresh_key: default_refresh_key() }
    }
}

fn default_timeout() -> u64 { 15 }
fn default_storage_path() -> PathBuf { PathBuf::from("data/session.json") }
fn default_storage_key() -> String { DEFAULT_STORAGE_KEY.to_string() }
fn default_refresh_key() -> String { DEFAULT_REFRESH_KEY.to_string() }

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load from `path` when it exists, otherwise start from defaults; then normalize.
    pub fn load_or_default(path: &str) -> Result<Self> {
        let mut cfg = if std::path::Path::new(path).exists() {
            load_from_file(path)?
        } else {
            AppConfig::default()
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.api.normalize_from_env();
        self.api.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}

impl ApiConfig {
    /// Fill an empty `base_url` from `AUTH_API_BASE_URL`, then from the default.
    pub fn normalize_from_env(&mut self) {
        if self.base_url.trim().is_empty() {
            self.base_url = std::env::var("AUTH_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        }
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();
    }

    pub fn validate(&self) -> Result<()> {
        let lower = self.base_url.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(anyhow!("api.base_url must start with http:// or https://, got {:?}", self.base_url));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("api.timeout_secs must be a positive number of seconds"));
        }
        Ok(())
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.key.trim().is_empty() {
            return Err(anyhow!("storage.key must not be empty"));
        }
        if self.refresh_key.trim().is_empty() || self.refresh_key == self.key {
            return Err(anyhow!("storage.refresh_key must be non-empty and differ from storage.key"));
        }
        if self.path.as_os_str().is_empty() {
            return Err(anyhow!("storage.path must not be empty"));
        }
        Ok(())
    }
}
