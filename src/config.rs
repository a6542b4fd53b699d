use crate::prediction::urls::DEFAULT_API_URL;
use std::time::Duration;

pub const ENV_API_URL: &str = "FLOODSHIELD_API_URL";
pub const ENV_PROXY: &str = "FLOODSHIELD_PROXY";
pub const ENV_TIMEOUT_SECS: &str = "FLOODSHIELD_TIMEOUT_SECS";

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("FLOODSHIELD_API_URL is not a valid http(s) url: {0}")]
    InvalidUrl(String),
    #[error("FLOODSHIELD_TIMEOUT_SECS must be a positive number of seconds: {0}")]
    InvalidTimeout(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_url: String,
    pub proxy: Option<String>,
    /// None 表示沿用 HTTP 客户端默认行为
    pub timeout: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            proxy: None,
            timeout: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_url = non_empty(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        match reqwest::Url::parse(&api_url) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            _ => return Err(ConfigError::InvalidUrl(api_url)),
        }

        let timeout = match non_empty(ENV_TIMEOUT_SECS) {
            Some(raw) => match raw.parse::<f64>() {
                Ok(secs) if secs > 0.0 => match Duration::try_from_secs_f64(secs) {
                    Ok(d) => Some(d),
                    Err(_) => return Err(ConfigError::InvalidTimeout(raw)),
                },
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
            None => None,
        };

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            proxy: non_empty(ENV_PROXY),
            timeout,
        })
    }
}
