use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://gtmetrix.com/api/2.0/";
pub const DEFAULT_RETRIES: u32 = 10;

pub const API_KEY_ENV: &str = "GTMETRIX_API_KEY";
pub const BASE_URL_ENV: &str = "GTMETRIX_BASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub retries: u32,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
            retries: DEFAULT_RETRIES,
            user_agent: format!("gtmetrix-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Reads the API key from `GTMETRIX_API_KEY` and, when set, the base URL
    /// from `GTMETRIX_BASE_URL`.
    pub fn from_env() -> Result<Self, String> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| format!("{} environment variable is not set", API_KEY_ENV))?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            config = config.with_base_url(base_url);
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.is_empty() {
            return Err("API key cannot be empty".to_string());
        }

        if self.base_url.is_empty() {
            return Err("Base URL cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("Base URL must start with http:// or https://".to_string());
        }

        if self.timeout.is_zero() {
            return Err("Timeout must be greater than 0".to_string());
        }

        if self.user_agent.is_empty() {
            return Err("User agent cannot be empty".to_string());
        }

        Ok(())
    }

    /// Base URL with exactly one trailing slash, so relative paths can be
    /// appended directly.
    pub fn normalized_base_url(&self) -> String {
        if self.base_url.ends_with('/') {
            self.base_url.clone()
        } else {
            format!("{}/", self.base_url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::new("e8ddc55d93eb0e8281b255ea236dcc4f");
        assert_eq!(config.base_url, "https://gtmetrix.com/api/2.0/");
        assert_eq!(config.retries, 10);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.user_agent.starts_with("gtmetrix-rs/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new("key")
            .with_base_url("http://localhost:8080/api")
            .with_timeout(Duration::from_secs(5))
            .with_retries(2)
            .with_user_agent("status-board/1.0");

        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retries, 2);
        assert_eq!(config.user_agent, "status-board/1.0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClientConfig::default();
        assert!(config.validate().is_err());

        config.api_key = "key".to_string();
        assert!(config.validate().is_ok());

        config.base_url = "".to_string();
        assert!(config.validate().is_err());

        config.base_url = "gtmetrix.com/api/2.0/".to_string();
        assert!(config.validate().is_err());

        config.base_url = DEFAULT_BASE_URL.to_string();
        config.timeout = Duration::from_secs(0);
        assert!(config.validate().is_err());

        config.timeout = Duration::from_secs(1);
        config.user_agent = "".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_normalized_base_url() {
        let config = ClientConfig::new("key").with_base_url("http://127.0.0.1:1234");
        assert_eq!(config.normalized_base_url(), "http://127.0.0.1:1234/");

        let config = ClientConfig::new("key");
        assert_eq!(config.normalized_base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_serialization() {
        let config = ClientConfig::new("key").with_retries(3);
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: ClientConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.api_key, deserialized.api_key);
        assert_eq!(config.base_url, deserialized.base_url);
        assert_eq!(deserialized.retries, 3);
    }
}
