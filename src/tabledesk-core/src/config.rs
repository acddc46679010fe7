use serde::{Deserialize, Serialize};

use crate::error::UsageError;

/// How the API token reaches the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Token embedded as a path segment after the application id
    #[default]
    Path,
    /// `Authorization: Bearer` header; the token never appears in the URL
    Bearer,
}

impl std::str::FromStr for AuthMode {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "path" => Ok(Self::Path),
            "bearer" => Ok(Self::Bearer),
            other => Err(UsageError::InvalidConfig(format!(
                "unknown auth mode '{}' (expected 'path' or 'bearer')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub auth_mode: AuthMode,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // Disk snapshot fallback
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cache_dir")]
    pub dir: String,
}

fn default_base_url() -> String {
    "https://www.teamdesk.net/secure/api/v2".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_cache_dir() -> String {
    "./.tabledesk-cache".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_cache_dir(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            app_id: String::new(),
            token: String::new(),
            auth_mode: AuthMode::default(),
            timeout_secs: default_timeout_secs(),
            cache: CacheConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(app_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            token: token.into(),
            ..Self::default()
        }
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Build a config from `TABLEDESK_*` environment variables
    pub fn from_env() -> Result<Self, UsageError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, UsageError> {
        let mut config = Self::default();
        if let Some(base_url) = lookup("TABLEDESK_BASE_URL") {
            config.base_url = base_url;
        }
        config.app_id = lookup("TABLEDESK_APP_ID").unwrap_or_default();
        config.token = lookup("TABLEDESK_TOKEN").unwrap_or_default();
        if let Some(mode) = lookup("TABLEDESK_AUTH_MODE") {
            config.auth_mode = mode.parse()?;
        }
        if let Some(dir) = lookup("TABLEDESK_CACHE_DIR") {
            config.cache.enabled = true;
            config.cache.dir = dir;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<String>) -> Self {
        self.cache.enabled = true;
        self.cache.dir = dir.into();
        self
    }

    /// Check required settings before a client is built
    pub fn validate(&self) -> Result<(), UsageError> {
        if self.base_url.trim().is_empty() {
            return Err(UsageError::MissingConfig("base_url"));
        }
        if self.app_id.trim().is_empty() {
            return Err(UsageError::MissingConfig("app_id"));
        }
        if self.token.trim().is_empty() {
            return Err(UsageError::MissingConfig("token"));
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(UsageError::InvalidConfig(format!(
                "base_url '{}' is not an absolute URL",
                self.base_url
            )));
        }
        Ok(())
    }
}
