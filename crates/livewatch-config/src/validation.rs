//! Configuration validation

use crate::schema::{RawConfig, RawSinkKind};
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("poll.interval_minutes must be at least 1")]
    ZeroPollInterval,

    #[error("twitch.{field} cannot be empty")]
    EmptyTwitchField { field: &'static str },

    #[error("notifications.webhooks must list at least one URL for kind = \"webhook\"")]
    NoWebhooks,

    #[error("Invalid URL '{value}': {message}")]
    InvalidUrl { value: String, message: String },

    #[error("notifications.{field} must be greater than 0")]
    ZeroThumbnailDimension { field: &'static str },

    #[error("twitch.request_timeout_seconds must be at least 1")]
    ZeroRequestTimeout,

    #[error("service.max_requests_per_second must be at least 1")]
    ZeroRequestRate,
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.poll.interval_minutes == Some(0) {
        errors.push(ValidationError::ZeroPollInterval);
    }

    if config.service.max_requests_per_second == Some(0) {
        errors.push(ValidationError::ZeroRequestRate);
    }

    let twitch = &config.twitch;
    if twitch.client_id.trim().is_empty() {
        errors.push(ValidationError::EmptyTwitchField { field: "client_id" });
    }
    if twitch.client_secret.as_deref().is_some_and(|s| s.trim().is_empty()) {
        errors.push(ValidationError::EmptyTwitchField {
            field: "client_secret",
        });
    }
    if twitch.request_timeout_seconds == Some(0) {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    for url in [&twitch.api_base_url, &twitch.auth_url].into_iter().flatten() {
        if let Err(message) = check_http_url(url) {
            errors.push(ValidationError::InvalidUrl {
                value: url.clone(),
                message,
            });
        }
    }

    let notifications = &config.notifications;
    if notifications.kind == RawSinkKind::Webhook && notifications.webhooks.is_empty() {
        errors.push(ValidationError::NoWebhooks);
    }
    for url in notifications
        .webhooks
        .iter()
        .chain(notifications.api_base_url.iter())
    {
        if let Err(message) = check_http_url(url) {
            errors.push(ValidationError::InvalidUrl {
                value: url.clone(),
                message,
            });
        }
    }
    if notifications.thumbnail_width == Some(0) {
        errors.push(ValidationError::ZeroThumbnailDimension {
            field: "thumbnail_width",
        });
    }
    if notifications.thumbnail_height == Some(0) {
        errors.push(ValidationError::ZeroThumbnailDimension {
            field: "thumbnail_height",
        });
    }

    errors
}

/// Accept only absolute http(s) URLs with a host part
pub fn check_http_url(s: &str) -> Result<(), String> {
    let rest = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .ok_or_else(|| "URL must start with http:// or https://".to_string())?;

    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() {
        return Err("URL has no host".into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> RawConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_check_http_url() {
        assert!(check_http_url("https://discord.com/api/webhooks/1/abc").is_ok());
        assert!(check_http_url("http://localhost:8080").is_ok());

        assert!(check_http_url("ftp://example.com").is_err());
        assert!(check_http_url("https://").is_err());
        assert!(check_http_url("discord.com/api").is_err());
    }

    #[test]
    fn valid_config_has_no_errors() {
        let config = parse(
            r#"
            config_version = 1

            [twitch]
            client_id = "abc"

            [notifications]
            kind = "discord_bot"
            "#,
        );

        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn collects_every_error() {
        let config = parse(
            r#"
            config_version = 1

            [service]
            max_requests_per_second = 0

            [poll]
            interval_minutes = 0

            [twitch]
            client_id = " "

            [notifications]
            kind = "webhook"
            thumbnail_width = 0
            "#,
        );

        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ZeroPollInterval)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ZeroRequestRate)));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::EmptyTwitchField { field: "client_id" })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::NoWebhooks)));
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::ZeroThumbnailDimension { field: "thumbnail_width" }
        )));
    }

    #[test]
    fn rejects_non_http_webhook() {
        let config = parse(
            r#"
            config_version = 1

            [twitch]
            client_id = "abc"

            [notifications]
            kind = "webhook"
            webhooks = ["discord://nope"]
            "#,
        );

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::InvalidUrl { .. }));
    }
}
