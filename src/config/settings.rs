use serde::Deserialize;

use crate::session::keys::{ACCESS_TOKEN_KEY_DEFAULT, REFRESH_COOKIE_KEY_DEFAULT, USER_KEY_DEFAULT};
use crate::token::DEFAULT_BUFFER_MINUTES;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub settings: SettingsConfig,
}

/// ================================
/// Global settings
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct SettingsConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub token: TokenConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    /// invariant: > 0, applies to every request incl. refresh
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ApiConfig {
    pub fn refresh_url(&self) -> String {
        join_url(&self.base_url, &self.refresh_path)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    /// tokens are refreshed this many minutes before `exp`
    #[serde(default = "default_buffer_minutes")]
    pub buffer_minutes: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self { buffer_minutes: default_buffer_minutes() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,
    #[serde(default = "default_access_token_key")]
    pub access_token_key: String,
    #[serde(default = "default_user_key")]
    pub user_key: String,
    #[serde(default = "default_refresh_cookie_key")]
    pub refresh_cookie_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            access_token_key: default_access_token_key(),
            user_key: default_user_key(),
            refresh_cookie_key: default_refresh_cookie_key(),
        }
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new (level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new("info".to_owned(), LogFormat::Compact)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

pub fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn default_refresh_path() -> String {
    "/auth/refresh-token".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_buffer_minutes() -> u64 {
    DEFAULT_BUFFER_MINUTES
}

fn default_storage_path() -> String {
    "session.json".to_string()
}

fn default_access_token_key() -> String {
    ACCESS_TOKEN_KEY_DEFAULT.to_string()
}

fn default_user_key() -> String {
    USER_KEY_DEFAULT.to_string()
}

fn default_refresh_cookie_key() -> String {
    REFRESH_COOKIE_KEY_DEFAULT.to_string()
}
