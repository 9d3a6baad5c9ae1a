//! Rule coverage lookup
//!
//! Tells a tree view whether a node is covered by a rule and which label to
//! tag it with. Not consulted by access checks.

use crate::content::{ContentNode, NodeId};
use crate::rules::compiler::RuleCompiler;
use crate::rules::types::RuleSnapshot;
use serde::Serialize;

/// Coverage of one content node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "coverage", rename_all = "snake_case")]
pub enum Coverage {
    /// Visualisation is switched off or the rules are not loaded
    Disabled,
    /// No rule covers the node
    Uncovered,
    /// The node is a rule definition item
    RuleDefinition { label: String },
    /// The node lies in a secured subtree
    Covered { secured_root: NodeId, label: String },
}

/// Coverage of `node` under `snapshot`
///
/// Rule definition items are tagged with their own colour even when they are
/// not inside a secured subtree.
pub fn coverage_for(snapshot: &RuleSnapshot, compiler: &RuleCompiler, node: &ContentNode) -> Coverage {
    if !snapshot.visualize_coverage() {
        return Coverage::Disabled;
    }

    if node.is_type(&compiler.aliases().rule_type) {
        return Coverage::RuleDefinition {
            label: compiler.coverage_label(node),
        };
    }

    match snapshot.governing_rule(&node.path) {
        Some(rule) => Coverage::Covered {
            secured_root: rule.secured_root,
            label: rule.coverage_label.clone(),
        },
        None => Coverage::Uncovered,
    }
}
