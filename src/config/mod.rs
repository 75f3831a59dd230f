use dashmap::DashMap;
use std::env;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}

/// Configuration service
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Load every environment variable.
    pub fn new() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }
}

/// Settings of the HTTP service provider.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Address [`ConfiguredListener`](crate::server::ConfiguredListener) binds.
    pub listen: String,
    /// Largest request body buffered for an injected handler, in bytes.
    pub body_limit: usize,
}

impl HttpConfig {
    pub const LISTEN_KEY: &'static str = "HTTP_LISTEN";
    pub const BODY_LIMIT_KEY: &'static str = "HTTP_BODY_LIMIT";
    pub const DEFAULT_LISTEN: &'static str = "127.0.0.1:8080";
    pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_config(&ConfigService::new())
    }

    pub fn from_config(config: &ConfigService) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let listen = config.get(Self::LISTEN_KEY).unwrap_or(defaults.listen);
        let body_limit = match config.get(Self::BODY_LIMIT_KEY) {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                key: Self::BODY_LIMIT_KEY.to_string(),
                value,
            })?,
            None => defaults.body_limit,
        };
        Ok(Self { listen, body_limit })
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: Self::DEFAULT_LISTEN.to_string(),
            body_limit: Self::DEFAULT_BODY_LIMIT,
        }
    }
}
