//! Configuration settings for the bind broker client.

use std::os::fd::RawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::BinderError;
use crate::protocol::BindAddress;
use crate::socket::ReceiveLimits;

/// Smallest payload buffer that can hold a response envelope.
const MIN_RESPONSE_SIZE: usize = 16;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub serve: ServeConfig,
}

/// Broker connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Path to the broker's Unix socket.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Receive buffer size for the response payload in bytes.
    #[serde(default = "default_max_response_size")]
    pub max_response_size: usize,
    /// Receive buffer size for ancillary control data in bytes.
    #[serde(default = "default_max_control_size")]
    pub max_control_size: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Listeners the binary requests and serves.
#[derive(Debug, Clone, Deserialize)]
pub struct ServeConfig {
    /// Text returned on every listener.
    #[serde(default = "default_message")]
    pub message: String,
    /// Addresses to request from the broker, one exchange each.
    #[serde(default = "default_listeners")]
    pub listeners: Vec<BindAddress>,
}

// Default value functions
fn default_socket_path() -> PathBuf {
    PathBuf::from("/run/lumo/binder.sock")
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_response_size() -> usize {
    256
}

fn default_max_control_size() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_message() -> String {
    "Hello world".to_string()
}

fn default_listeners() -> Vec<BindAddress> {
    vec![
        BindAddress::new("0.0.0.0", 8083),
        BindAddress::new("0.0.0.0", 8084),
    ]
}

/// Smallest control buffer that can carry one `SCM_RIGHTS` descriptor.
fn min_control_size() -> usize {
    nix::cmsg_space!(RawFd).capacity()
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            connect_timeout_seconds: default_connect_timeout(),
            max_response_size: default_max_response_size(),
            max_control_size: default_max_control_size(),
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

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            message: default_message(),
            listeners: default_listeners(),
        }
    }
}

impl BrokerConfig {
    /// Connect timeout as a duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Buffer sizes for the combined receive.
    pub fn receive_limits(&self) -> ReceiveLimits {
        ReceiveLimits {
            max_payload: self.max_response_size,
            max_control: self.max_control_size,
        }
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, BinderError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| BinderError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        let settings: Settings = toml::from_str(&content).map_err(|e| BinderError::Config {
            message: format!("Failed to parse config file '{}': {}", path.display(), e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), BinderError> {
        if self.broker.socket_path.as_os_str().is_empty() {
            return Err(BinderError::Config {
                message: "Broker socket path must not be empty".to_string(),
            });
        }

        if self.broker.connect_timeout_seconds == 0 {
            return Err(BinderError::Config {
                message: "Connect timeout must be at least 1 second".to_string(),
            });
        }

        if self.broker.max_response_size < MIN_RESPONSE_SIZE {
            return Err(BinderError::Config {
                message: format!(
                    "max_response_size {} is below the minimum of {} bytes",
                    self.broker.max_response_size, MIN_RESPONSE_SIZE
                ),
            });
        }

        let min_control = min_control_size();
        if self.broker.max_control_size < min_control {
            return Err(BinderError::Config {
                message: format!(
                    "max_control_size {} cannot hold a descriptor (minimum {} bytes)",
                    self.broker.max_control_size, min_control
                ),
            });
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(BinderError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        // Validate log format
        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(BinderError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("binder.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.broker.connect_timeout(), Duration::from_secs(10));
        assert_eq!(settings.broker.receive_limits(), ReceiveLimits::default());
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.serve.listeners.len(), 2);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_full_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
[broker]
socket_path = "/tmp/broker.sock"
connect_timeout_seconds = 2
max_response_size = 1024

[logging]
level = "debug"
format = "json"

[serve]
message = "hi"

[[serve.listeners]]
address = "127.0.0.1"
port = 9000
"#,
        );

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.broker.socket_path, PathBuf::from("/tmp/broker.sock"));
        assert_eq!(settings.broker.connect_timeout_seconds, 2);
        assert_eq!(settings.broker.max_response_size, 1024);
        assert_eq!(settings.broker.max_control_size, 256);
        assert_eq!(settings.logging.format, "json");
        assert_eq!(settings.serve.message, "hi");
        assert_eq!(
            settings.serve.listeners,
            vec![BindAddress::new("127.0.0.1", 9000)]
        );
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "");

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.broker.socket_path, default_socket_path());
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::load("/nonexistent/binder.toml").unwrap_err();
        assert!(matches!(err, BinderError::Config { .. }));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[broker\nsocket_path = 1");
        assert!(matches!(
            Settings::load(&path),
            Err(BinderError::Config { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.broker.socket_path = PathBuf::new();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.broker.connect_timeout_seconds = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.broker.max_control_size = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.broker.max_response_size = 4;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.logging.level = "loud".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.logging.format = "xml".to_string();
        assert!(settings.validate().is_err());
    }
}
