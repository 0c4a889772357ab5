use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

pub const KEY_SERVER: &str = "SMTP_SERVER";
pub const KEY_PORT: &str = "SMTP_PORT";
pub const KEY_USERNAME: &str = "SMTP_USERNAME";
pub const KEY_PASSWORD: &str = "SMTP_PASSWORD";
pub const KEY_RECIPIENT: &str = "RECIPIENT";
pub const KEY_SENDER: &str = "SENDER";

/// Mail relay parameters for critical alerts.
#[derive(Clone, PartialEq, Eq)]
pub struct DeliveryConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
    pub recipient: String,
}

impl std::fmt::Debug for DeliveryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("sender", &self.sender)
            .field("recipient", &self.recipient)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load env file {path}: {source}")]
    Load {
        path: String,
        source: dotenvy::Error,
    },
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("SMTP_PORT '{value}' is not a valid port: {source}")]
    InvalidPort {
        value: String,
        source: std::num::ParseIntError,
    },
}

impl DeliveryConfig {
    /// Reads the env file, letting variables already in the process environment win.
    pub fn load(env_file: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = env_file.as_ref();
        let load_err = |source| ConfigError::Load {
            path: path.display().to_string(),
            source,
        };

        let mut file_vars = HashMap::new();
        for item in dotenvy::from_path_iter(path).map_err(load_err)? {
            let (key, value) = item.map_err(load_err)?;
            file_vars.insert(key, value);
        }

        Self::from_lookup(|key| {
            std::env::var(key)
                .ok()
                .or_else(|| file_vars.get(key).cloned())
        })
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let server = required(KEY_SERVER)?;
        let port_raw = required(KEY_PORT)?;
        let port = port_raw
            .parse::<u16>()
            .map_err(|source| ConfigError::InvalidPort {
                value: port_raw.clone(),
                source,
            })?;

        Ok(Self {
            server,
            port,
            username: required(KEY_USERNAME)?,
            password: required(KEY_PASSWORD)?,
            sender: required(KEY_SENDER)?,
            recipient: required(KEY_RECIPIENT)?,
        })
    }
}
