//! Access evaluator
//!
//! Decides whether a principal may see a node, given the node's ancestry and
//! the principal's group names:
//!
//! 1. No groups → allow (anonymous and role-less principals are never subject to rules)
//! 2. Store uninitialized → allow
//! 3. Secured roots on the path, in root-to-leaf order; none → allow
//! 4. The deepest secured root governs
//! 5. Any of the principal's groups denied by that rule → deny with its no-access page
//!
//! Evaluation is synchronous and purely in memory.

use crate::content::{NodeId, PathAncestry};
use crate::rules::store::RuleStore;
use crate::rules::types::RuleSnapshot;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

/// Result of an access check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum AccessDecision {
    /// Access is allowed
    Allow,
    /// Access is denied; the caller redirects to `redirect_target`
    Deny {
        redirect_target: NodeId,
        /// Secured root of the rule that denied access
        secured_root: NodeId,
    },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, AccessDecision::Deny { .. })
    }

    pub fn redirect_target(&self) -> Option<NodeId> {
        match self {
            AccessDecision::Allow => None,
            AccessDecision::Deny {
                redirect_target, ..
            } => Some(*redirect_target),
        }
    }
}

/// Evaluates requests against the store's active snapshot
#[derive(Clone)]
pub struct AccessEvaluator {
    store: Arc<RuleStore>,
}

impl AccessEvaluator {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    /// Check a request against the currently active rules
    pub fn check(&self, path: &PathAncestry, groups: &HashSet<String>) -> AccessDecision {
        if groups.is_empty() {
            trace!(path = %path, "No member groups, rules do not apply");
            return AccessDecision::Allow;
        }

        let Some(snapshot) = self.store.current() else {
            trace!("Rules not loaded, allowing");
            return AccessDecision::Allow;
        };

        evaluate(&snapshot, path, groups)
    }
}

/// Evaluate a request against one snapshot
pub fn evaluate(
    snapshot: &RuleSnapshot,
    path: &PathAncestry,
    groups: &HashSet<String>,
) -> AccessDecision {
    if groups.is_empty() {
        return AccessDecision::Allow;
    }

    let secured = snapshot.secured_ancestors(path);
    // Nested rules: the innermost secured root governs
    let Some(rule) = secured
        .last()
        .and_then(|root| snapshot.rule_for_root(*root))
    else {
        trace!(path = %path, "Path not covered by any rule");
        return AccessDecision::Allow;
    };

    if rule.denies(groups) {
        debug!(
            path = %path,
            secured_root = %rule.secured_root,
            redirect = %rule.no_access_target,
            "Access denied by rule"
        );
        AccessDecision::Deny {
            redirect_target: rule.no_access_target,
            secured_root: rule.secured_root,
        }
    } else {
        trace!(
            path = %path,
            secured_root = %rule.secured_root,
            covering = secured.len(),
            "Governing rule does not deny these groups"
        );
        AccessDecision::Allow
    }
}
