//! KeepOut
//!
//! Path-based, group-aware access rules for hierarchical content trees.
//!
//! ## Features
//!
//! - **Subtree rules** read live from a rule folder in the content tree
//! - **Deepest rule wins** when secured subtrees are nested
//! - **Hot reload** on content publish/trash notifications, no restart needed
//! - **Fail-open** while no rule folder exists; a broken reload keeps the last good rules
//!
//! ## Rule Definitions
//!
//! ```text
//! <root>
//! ├── Home ─ Members (10) ─ Reports (30) ─ Q1 (55)
//! └── Security Rules          (keepOutSecurityRules, showRuleCoverage = true)
//!     └── Members only        (keepOutSecurityRule)
//!           deniedMemberGroups = "3"      → group "Editors"
//!           pageToSecure       = 10
//!           noAccessPage       = 99
//!           coverageColour     = { label = "red" }
//! ```
//!
//! With the rule above, a member of `Editors` requesting Q1 (path `1,10,30,55`)
//! is redirected to node 99; a member of any other group is allowed.
//!
//! ## Example
//!
//! ```rust
//! use keepout::content::{NodeId, PathAncestry};
//! use keepout::rules::{AccessDecision, AccessEvaluator, Rule, RuleSnapshot, RuleStore};
//! use std::collections::HashSet;
//! use std::sync::Arc;
//!
//! let rule = Rule {
//!     secured_root: NodeId(10),
//!     denied_groups: ["Editors".to_string()].into(),
//!     no_access_target: NodeId(99),
//!     coverage_label: "keepout-red".to_string(),
//!     creation_order: 0,
//!     definition_node: NodeId(3),
//! };
//! let store = Arc::new(RuleStore::with_snapshot(RuleSnapshot::new(
//!     NodeId(2),
//!     false,
//!     vec![rule],
//!     vec![],
//! )));
//! let evaluator = AccessEvaluator::new(store);
//!
//! let path: PathAncestry = "1,10,30,55".parse().unwrap();
//! let editors: HashSet<String> = ["Editors".to_string()].into();
//! assert_eq!(
//!     evaluator.check(&path, &editors).redirect_target(),
//!     Some(NodeId(99))
//! );
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod rules;
pub mod server;
pub mod service;
pub mod stats;

// Re-export main types
pub use config::{AppConfig, load_config};
pub use error::{AppError, Result};
pub use rules::{AccessDecision, AccessEvaluator, RuleCompiler, RuleSnapshot, RuleStore};
pub use service::{AccessGuard, GuardOutcome, ReloadHandle, RuleService};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
