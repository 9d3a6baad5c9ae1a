//! Error types for keepout
//!
//! This module defines the error hierarchy used throughout the crate.
//! Each concern gets its own `thiserror` enum; they roll up into [`AppError`]
//! at the binary boundary.

use crate::content::{GroupId, NodeId};
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Content source error: {0}")]
    Content(#[from] ContentError),

    #[error("Rule compilation failed: {0}")]
    Compile(#[from] CompileError),

    #[error("Access check failed: {0}")]
    Guard(#[from] GuardError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },
}

/// Errors raised by content tree and group directory collaborators
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Content API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response from content API: {0}")]
    InvalidResponse(String),

    #[error("Failed to read content export '{path}': {source}")]
    Export {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed content export: {0}")]
    MalformedExport(String),

    #[error("Invalid ancestor path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

impl ContentError {
    /// Create an appropriate error from an HTTP status code and response body
    pub fn from_response(status: u16, body: &str) -> Self {
        ContentError::Api {
            status,
            message: if body.is_empty() {
                format!("HTTP {}", status)
            } else {
                body.to_string()
            },
        }
    }
}

/// A compile pass that could not produce a snapshot
#[derive(Error, Debug)]
pub enum CompileError {
    /// No rule folder exists at the root of the content tree
    #[error("No rule folder of type '{folder_type}' found at the content root")]
    ConfigurationMissing { folder_type: String },

    #[error("Content lookup failed during compile: {0}")]
    Content(#[from] ContentError),
}

impl CompileError {
    pub fn is_configuration_missing(&self) -> bool {
        matches!(self, CompileError::ConfigurationMissing { .. })
    }
}

/// A single rule item that was skipped during compilation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Rule item {rule_node} skipped: {reason}")]
pub struct RuleParseError {
    pub rule_node: NodeId,
    pub reason: RuleParseReason,
}

impl RuleParseError {
    pub fn new(rule_node: NodeId, reason: RuleParseReason) -> Self {
        Self { rule_node, reason }
    }
}

/// Why a rule item could not be turned into a rule
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleParseReason {
    #[error("missing property '{0}'")]
    MissingProperty(String),

    #[error("property '{alias}' has an unsupported value: {value}")]
    InvalidValue { alias: String, value: String },

    #[error("member group {0} does not exist")]
    UnknownGroup(GroupId),
}

/// Failures surfaced to the caller of an access check
///
/// None of these are folded into allow or deny; the host decides the fallback.
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Requested node {0} does not exist")]
    NodeNotFound(NodeId),

    #[error("No-access page {target} for the rule securing {rule_root} does not exist")]
    DanglingReference { rule_root: NodeId, target: NodeId },

    #[error("Content lookup failed: {0}")]
    Content(#[from] ContentError),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for content collaborator calls
pub type ContentResult<T> = std::result::Result<T, ContentError>;

/// Result type alias for access checks
pub type GuardResult<T> = std::result::Result<T, GuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_error_from_response() {
        let err = ContentError::from_response(500, "Internal server error");
        assert!(matches!(err, ContentError::Api { status: 500, .. }));
        assert!(err.to_string().contains("Internal server error"));

        let err = ContentError::from_response(503, "");
        assert!(err.to_string().contains("HTTP 503"));
    }

    #[test]
    fn test_rule_parse_error_display() {
        let err = RuleParseError::new(
            NodeId(42),
            RuleParseReason::MissingProperty("noAccessPage".into()),
        );
        assert_eq!(
            err.to_string(),
            "Rule item 42 skipped: missing property 'noAccessPage'"
        );

        let err = RuleParseError::new(NodeId(7), RuleParseReason::UnknownGroup(GroupId(3)));
        assert!(err.to_string().contains("member group 3"));
    }

    #[test]
    fn test_dangling_reference_display() {
        let err = GuardError::DanglingReference {
            rule_root: NodeId(10),
            target: NodeId(99),
        };
        assert!(err.to_string().contains("99"));
        assert!(err.to_string().contains("10"));
    }

    #[test]
    fn test_configuration_missing_flag() {
        let err = CompileError::ConfigurationMissing {
            folder_type: "keepOutSecurityRules".into(),
        };
        assert!(err.is_configuration_missing());
        assert!(
            !CompileError::Content(ContentError::InvalidResponse("x".into()))
                .is_configuration_missing()
        );
    }
}
