//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (KEEPOUT_*)
//! 2. Configuration file (TOML)
//! 3. Default values

use crate::config::types::{AppConfig, ContentSource};
use crate::error::ConfigError;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "keepout.toml",
    ".keepout.toml",
    "~/.config/keepout/config.toml",
    "/etc/keepout/config.toml",
];

/// Upper bound for `content.api.max_retries`
const MAX_RETRIES: u32 = 10;

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. Start with defaults (handled by serde defaults on AppConfig)

    // 2. Add configuration file
    if let Some(path) = config_path {
        // Explicit path provided - must exist
        let expanded = shellexpand::tilde(path);
        if !Path::new(expanded.as_ref()).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
    } else {
        // Try default paths (first existing one wins)
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // 3. Add environment variables with KEEPOUT_ prefix
    // e.g., KEEPOUT_SERVER__PORT, KEEPOUT_CONTENT__API__URL
    // Double underscore (__) maps to nested keys (content.api.url)
    builder = builder.add_source(
        Environment::with_prefix("KEEPOUT")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    // 4. Conventional token variable for the content API
    if let Ok(token) = std::env::var("KEEPOUT_CONTENT_TOKEN") {
        builder = builder
            .set_override("content.api.token", token)
            .map_err(|e| ConfigError::Load(e.to_string()))?;
    }

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate configuration values
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::Invalid {
            message: "server.port must be greater than 0".to_string(),
        });
    }

    match config.content.source {
        ContentSource::File => {
            if config.content.file.as_deref().is_none_or(str::is_empty) {
                return Err(ConfigError::Missing {
                    field: "content.file".to_string(),
                });
            }
        }
        ContentSource::Api => {
            let url = &config.content.api.url;
            if url.is_empty() {
                return Err(ConfigError::Missing {
                    field: "content.api.url".to_string(),
                });
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Invalid {
                    message: format!(
                        "content.api.url must start with http:// or https://, got: {}",
                        url
                    ),
                });
            }
            if config.content.api.max_retries > MAX_RETRIES {
                return Err(ConfigError::Invalid {
                    message: format!(
                        "content.api.max_retries must be at most {}, got: {}",
                        MAX_RETRIES, config.content.api.max_retries
                    ),
                });
            }
            if config.content.api.timeout_secs == 0 {
                return Err(ConfigError::Invalid {
                    message: "content.api.timeout_secs must be greater than 0".to_string(),
                });
            }
        }
    }

    if config.reload.queue_capacity == 0 {
        return Err(ConfigError::Invalid {
            message: "reload.queue_capacity must be greater than 0".to_string(),
        });
    }

    let aliases = &config.rules;
    for (field, value) in [
        ("rules.folder_type", &aliases.folder_type),
        ("rules.show_coverage", &aliases.show_coverage),
        ("rules.rule_type", &aliases.rule_type),
        ("rules.denied_groups", &aliases.denied_groups),
        ("rules.page_to_secure", &aliases.page_to_secure),
        ("rules.no_access_page", &aliases.no_access_page),
        ("rules.coverage_colour", &aliases.coverage_colour),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: field.to_string(),
            });
        }
    }

    Ok(())
}
