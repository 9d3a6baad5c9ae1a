//! Request-path access guard
//!
//! Resolves a requested node's ancestry, runs the evaluator, and turns a deny
//! into a concrete redirect. A no-access page that no longer resolves is
//! reported as [`GuardError::DanglingReference`], never as allow or deny.

use crate::content::{NodeId, SharedContentTree};
use crate::error::{GuardError, GuardResult};
use crate::rules::{AccessDecision, AccessEvaluator};
use crate::stats::{CheckOutcome, GuardStats};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// What the host should do with a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum GuardOutcome {
    Allow,
    Redirect {
        target: NodeId,
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
}

impl GuardOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardOutcome::Allow)
    }
}

/// Access guard for inbound requests
pub struct AccessGuard {
    tree: SharedContentTree,
    evaluator: AccessEvaluator,
    stats: Arc<GuardStats>,
}

impl AccessGuard {
    pub fn new(tree: SharedContentTree, evaluator: AccessEvaluator, stats: Arc<GuardStats>) -> Self {
        Self {
            tree,
            evaluator,
            stats,
        }
    }

    pub fn evaluator(&self) -> &AccessEvaluator {
        &self.evaluator
    }

    /// Check a request for `node_id` by a principal in `groups`
    pub async fn check_node(
        &self,
        node_id: NodeId,
        groups: &HashSet<String>,
    ) -> GuardResult<GuardOutcome> {
        let result = self.resolve(node_id, groups).await;

        let outcome = match &result {
            Ok(GuardOutcome::Allow) => CheckOutcome::Allowed,
            Ok(GuardOutcome::Redirect { .. }) => CheckOutcome::Redirected,
            Err(GuardError::DanglingReference { .. }) => CheckOutcome::DanglingReference,
            Err(_) => CheckOutcome::Failed,
        };
        self.stats.record_check(outcome);

        result
    }

    async fn resolve(&self, node_id: NodeId, groups: &HashSet<String>) -> GuardResult<GuardOutcome> {
        // Skip content lookups when no rule can apply
        if groups.is_empty() || !self.evaluator.store().is_initialized() {
            return Ok(GuardOutcome::Allow);
        }

        let path = self
            .tree
            .ancestor_path(node_id)
            .await?
            .ok_or(GuardError::NodeNotFound(node_id))?;

        debug!(node = %node_id, path = %path, groups = groups.len(), "Checking access");

        match self.evaluator.check(&path, groups) {
            AccessDecision::Allow => Ok(GuardOutcome::Allow),
            AccessDecision::Deny {
                redirect_target,
                secured_root,
            } => self.redirect(redirect_target, secured_root).await,
        }
    }

    /// Resolve the no-access page of a denying rule to a live node
    async fn redirect(&self, target: NodeId, secured_root: NodeId) -> GuardResult<GuardOutcome> {
        match self.tree.get_by_id(target).await? {
            Some(page) if page.published => Ok(GuardOutcome::Redirect {
                target,
                url: page.url,
            }),
            _ => {
                warn!(
                    rule_root = %secured_root,
                    target = %target,
                    "No-access page does not resolve"
                );
                Err(GuardError::DanglingReference {
                    rule_root: secured_root,
                    target,
                })
            }
        }
    }
}
