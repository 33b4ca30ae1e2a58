/// Configuration management for the Trolley server
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    /// Root of the per-user blob directories
    pub uploads_directory: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub session_ttl_hours: i64,
}

impl ServerConfig {
    /// Load configuration from environment variables, with defaults
    pub fn from_env() -> ApiResult<Self> {
        let data_directory = PathBuf::from(env_or("TROLLEY_DATA_DIR", "./data"));

        Ok(Self {
            service: ServiceConfig {
                hostname: env_or("TROLLEY_HOSTNAME", "127.0.0.1"),
                port: parse_env("TROLLEY_PORT", 3000)?,
            },
            storage: StorageConfig {
                database: data_directory.join("trolley.db"),
                uploads_directory: PathBuf::from(env_or("TROLLEY_UPLOAD_DIR", "./uploads")),
                data_directory,
            },
            auth: AuthConfig {
                session_ttl_hours: parse_env("TROLLEY_SESSION_TTL_HOURS", 24 * 30)?,
            },
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.auth.session_ttl_hours <= 0 {
            return Err(ApiError::Internal(
                "TROLLEY_SESSION_TTL_HOURS must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> ApiResult<T> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| ApiError::Internal(format!("{} has an invalid value", key))),
        Err(_) => Ok(default),
    }
}
