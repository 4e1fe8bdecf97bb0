//! Configuration management
//!
//! Layers, lowest precedence first: built-in defaults, the TOML file named by
//! `LOOPYNC_CONFIG` (default `loopync.toml`, optional), then environment
//! variables such as `LOOPYNC__SERVER__PORT=9000`.

use config::{ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "loopync.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub media: MediaConfig,
    pub auth: AuthConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Empty selects the in-memory backend
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaConfig {
    pub app_id: String,
    pub app_certificate: String,
    pub token_ttl_secs: u64,
    pub signer_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter directive; `RUST_LOG` wins when set
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 10,
            },
            media: MediaConfig {
                app_id: String::new(),
                app_certificate: String::new(),
                token_ttl_secs: 3600,
                signer_timeout_ms: 5000,
            },
            auth: AuthConfig {
                bcrypt_cost: bcrypt::DEFAULT_COST,
            },
            log: LogConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Config {
    /// Load from the default file location and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("LOOPYNC_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("LOOPYNC").separator("__"))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.media.token_ttl_secs == 0 {
            return Err(ConfigError::Message(
                "media.token_ttl_secs must be positive".to_string(),
            ));
        }
        if self.media.app_id.contains('.') {
            return Err(ConfigError::Message(
                "media.app_id must not contain '.'".to_string(),
            ));
        }
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::Message(
                "auth.bcrypt_cost must be between 4 and 31".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn uses_database(&self) -> bool {
        !self.database.url.trim().is_empty()
    }
}

impl MediaConfig {
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_ttl_secs as i64)
    }

    pub fn signer_timeout(&self) -> Duration {
        Duration::from_millis(self.signer_timeout_ms)
    }
}
