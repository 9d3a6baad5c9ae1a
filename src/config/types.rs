//! Configuration types for keepout
//!
//! This module defines the configuration structure that can be loaded from
//! TOML files and/or environment variables.

use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP API settings
    pub server: ServerConfig,

    /// Where the content tree comes from
    pub content: ContentConfig,

    /// Content type and property aliases of rule definitions
    pub rules: RuleAliases,

    /// Background reload settings
    pub reload: ReloadConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 20310,
        }
    }
}

/// Content source selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    /// JSON or TOML export file, re-read on every reload
    #[default]
    File,
    /// Headless content delivery API
    Api,
}

/// Content source configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub source: ContentSource,

    /// Export file path (for `source = "file"`)
    pub file: Option<String>,

    /// API settings (for `source = "api"`)
    pub api: ContentApiConfig,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            source: ContentSource::File,
            file: Some("content.json".to_string()),
            api: ContentApiConfig::default(),
        }
    }
}

/// Content delivery API connection settings
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ContentApiConfig {
    /// Base URL (e.g., `https://cms.example.com/api`)
    pub url: String,

    /// Bearer token (prefer env var KEEPOUT_CONTENT_TOKEN)
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries for failed requests
    pub max_retries: u32,
}

impl Default for ContentApiConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080/api".to_string(),
            token: None,
            timeout_secs: 10,
            max_retries: 2,
        }
    }
}

// Keeps the token out of logs
impl std::fmt::Debug for ContentApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentApiConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Aliases used to find and read rule definitions in the content tree
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuleAliases {
    /// Content type of the root-level rule folder
    pub folder_type: String,

    /// Folder property toggling coverage visualisation
    pub show_coverage: String,

    /// Content type of rule items under the folder
    pub rule_type: String,

    /// Comma-separated member group ids to deny
    pub denied_groups: String,

    /// Root of the secured subtree
    pub page_to_secure: String,

    /// Page to redirect denied members to
    pub no_access_page: String,

    /// Colour used to tag covered nodes
    pub coverage_colour: String,
}

impl Default for RuleAliases {
    fn default() -> Self {
        Self {
            folder_type: "keepOutSecurityRules".to_string(),
            show_coverage: "showRuleCoverage".to_string(),
            rule_type: "keepOutSecurityRule".to_string(),
            denied_groups: "deniedMemberGroups".to_string(),
            page_to_secure: "pageToSecure".to_string(),
            no_access_page: "noAccessPage".to_string(),
            coverage_colour: "coverageColour".to_string(),
        }
    }
}

/// Background reload configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Queued reload triggers before new ones are dropped
    pub queue_capacity: usize,

    /// Compile once at startup
    pub on_startup: bool,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 16,
            on_startup: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}
