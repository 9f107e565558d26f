//! Configuration parsing and validation for livewatch
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Poll interval, Twitch credentials and notification sink settings
//! - Validation with clear error messages

mod schema;
mod settings;
mod validation;

pub use schema::*;
pub use settings::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<ServiceConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<ServiceConfig> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(ServiceConfig::from_raw(raw))
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    const MINIMAL: &str = r#"
        config_version = 1

        [twitch]
        client_id = "abc"

        [notifications]
        kind = "webhook"
        webhooks = ["https://discord.com/api/webhooks/1/x"]
    "#;

    #[test]
    fn parse_minimal_config() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.twitch.client_id, "abc");
        assert_eq!(
            config.poll.interval,
            Duration::from_secs(DEFAULT_POLL_INTERVAL_MINUTES * 60)
        );
        assert!(matches!(
            config.notifications.sink,
            SinkSettings::Webhook { ref urls } if urls.len() == 1
        ));
    }

    #[test]
    fn reject_wrong_version() {
        let config = MINIMAL.replace("config_version = 1", "config_version = 99");
        let result = parse_config(&config);
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_zero_interval() {
        let config = format!("{}\n[poll]\ninterval_minutes = 0\n", MINIMAL);
        let result = parse_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationFailed { .. })));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.twitch.client_id, "abc");
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }
}
