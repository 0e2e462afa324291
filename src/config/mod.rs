use crate::factory::{DialConfig, DialMode};
use crate::utils::error::{Result, SessionPoolError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub pool: PoolSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default)]
    pub mode: DialMode,
    #[serde(default = "default_addresses")]
    pub addresses: Vec<String>,
    /// Dial timeout in milliseconds, 0 = blocking dial
    #[serde(default)]
    pub timeout_ms: u64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Maximum idle sessions kept for reuse
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String, // "json" or "pretty"
}

// Default values
fn default_addresses() -> Vec<String> {
    vec!["127.0.0.1:27017".to_string()]
}

fn default_capacity() -> usize {
    16
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            mode: DialMode::default(),
            addresses: default_addresses(),
            timeout_ms: 0,
            username: String::new(),
            password: String::new(),
        }
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl EndpointConfig {
    pub fn dial_config(&self) -> DialConfig {
        DialConfig {
            mode: self.mode,
            addresses: self.addresses.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SessionPoolError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| SessionPoolError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.addresses.is_empty() {
            return Err(SessionPoolError::Config(
                "endpoint.addresses must list at least one address".to_string(),
            ));
        }

        if self
            .endpoint
            .addresses
            .iter()
            .any(|addr| addr.trim().is_empty())
        {
            return Err(SessionPoolError::Config(
                "endpoint.addresses cannot contain empty entries".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(SessionPoolError::Config(format!(
                "Invalid log format: {}. Must be 'pretty' or 'json'",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// Create example configuration file
    pub fn create_example<P: AsRef<Path>>(path: P) -> Result<()> {
        let example = r#"[endpoint]
mode = "single"  # Options: "single", "cluster"
addresses = ["127.0.0.1:27017"]
timeout_ms = 0  # 0 = blocking dial with the OS default timeout

# Credentials are only forwarded in cluster mode
# username = "admin"
# password = "secret"

[pool]
capacity = 16  # Maximum idle sessions kept for reuse

[logging]
level = "info"  # Options: "trace", "debug", "info", "warn", "error"
format = "pretty"  # Options: "pretty", "json"
"#;

        std::fs::write(path.as_ref(), example).map_err(|e| {
            SessionPoolError::Config(format!("Failed to write example config: {}", e))
        })?;

        Ok(())
    }
}
