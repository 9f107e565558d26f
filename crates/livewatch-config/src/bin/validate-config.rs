//! Config validation CLI tool
//!
//! Validates a livewatch configuration file and reports any errors.

use livewatch_config::SinkSettings;
use livewatch_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a livewatch configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match livewatch_config::load_config(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", livewatch_config::CURRENT_CONFIG_VERSION);
            println!("  Poll interval: {}m", config.poll.interval.as_secs() / 60);
            println!(
                "  IPC rate limit: {} requests per {}s",
                config.service.rate_limit.burst,
                config.service.rate_limit.per.as_secs()
            );
            println!("  Twitch API: {}", config.twitch.api_base_url);
            println!(
                "  Twitch secret: {}",
                if config.twitch.client_secret.is_some() {
                    "in config"
                } else {
                    "expected from environment"
                }
            );

            match &config.notifications.sink {
                SinkSettings::DiscordBot { bot_token, .. } => {
                    println!(
                        "  Sink: discord_bot (token {})",
                        if bot_token.is_some() {
                            "in config"
                        } else {
                            "expected from environment"
                        }
                    );
                }
                SinkSettings::Webhook { urls } => {
                    println!("  Sink: webhook ({} destinations)", urls.len());
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                livewatch_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                livewatch_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                livewatch_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                livewatch_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        livewatch_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
