use directories::BaseDirs;
use serde::Deserialize;
use std::{env, fs, path::PathBuf, time::Duration};

pub const DEFAULT_ENDPOINT: &str = "https://ai-proxy.lab.epam.com";
pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";
pub const DEFAULT_DEPLOYMENT: &str = "gpt-4o";

/// Optional settings read from `<config_dir>/dial-chat/config.toml`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DialFileConfig {
    pub endpoint: Option<String>,
    pub api_version: Option<String>,
    pub deployment: Option<String>,
    pub system_prompt: Option<String>,
    pub timeout_ms: Option<u64>,
    pub stream: Option<bool>,
}

impl DialFileConfig {
    pub fn load() -> anyhow::Result<Option<Self>> {
        let Some(path) = Self::config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("read config {}: {}", path.display(), e))?;
        let cfg = toml::from_str::<DialFileConfig>(&text)
            .map_err(|e| anyhow::anyhow!("parse config {}: {}", path.display(), e))?;
        Ok(Some(cfg))
    }

    pub fn config_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        let p = if cfg!(target_os = "windows") {
            base.home_dir().join(".dial-chat").join("config.toml")
        } else {
            base.config_dir().join("dial-chat").join("config.toml")
        };
        Some(p)
    }
}

/// Connection settings shared by both client variants.
#[derive(Clone, Debug)]
pub struct DialConfig {
    pub api_key: String,
    pub endpoint: String,
    pub api_version: String,
    /// Whole-request timeout; `None` leaves the transport default in place.
    pub timeout: Option<Duration>,
    pub proxy: Option<String>,
}

impl DialConfig {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: None,
            proxy: None,
        }
    }

    pub fn with_api_version(mut self, v: impl Into<String>) -> Self {
        self.api_version = v.into();
        self
    }

    pub fn with_timeout(mut self, t: Duration) -> Self {
        self.timeout = Some(t);
        self
    }

    /// Resolves against the process environment, falling back to `file`.
    pub fn from_env(file: &DialFileConfig) -> anyhow::Result<Self> {
        let proxy = env::var("HTTPS_PROXY")
            .ok()
            .or_else(|| env::var("HTTP_PROXY").ok());
        Self::resolve(
            file,
            env::var("DIAL_API_KEY").ok(),
            env::var("DIAL_ENDPOINT").ok(),
            proxy,
        )
    }

    /// Merges file settings with environment values; the environment wins.
    pub fn resolve(
        file: &DialFileConfig,
        api_key: Option<String>,
        endpoint: Option<String>,
        proxy: Option<String>,
    ) -> anyhow::Result<Self> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("DIAL_API_KEY not set"))?;
        let endpoint = endpoint
            .or_else(|| file.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let parsed = url::Url::parse(&endpoint)
            .map_err(|e| anyhow::anyhow!("invalid DIAL endpoint '{}': {}", endpoint, e))?;
        if parsed.cannot_be_a_base() {
            anyhow::bail!("invalid DIAL endpoint '{}': not a base URL", endpoint);
        }
        let api_version = file
            .api_version
            .clone()
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        Ok(DialConfig {
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_version,
            timeout: file.timeout_ms.map(Duration::from_millis),
            proxy,
        })
    }

    pub fn chat_completions_url(&self, deployment: &str) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.endpoint.trim_end_matches('/'),
            deployment
        )
    }
}
