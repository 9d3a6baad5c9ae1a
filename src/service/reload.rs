//! Rule reload orchestration
//!
//! [`RuleService`] recompiles the rules and swaps them into the store.
//! A failed reload leaves the previous snapshot active. [`spawn_reload_worker`]
//! runs reloads in the background so change notifications can fire and forget.

use crate::content::{ContentEvent, ContentNode, NodeId, SharedContentTree, SharedGroupDirectory};
use crate::error::{CompileError, ContentError};
use crate::rules::{Coverage, RuleCompiler, RuleStore, coverage_for};
use crate::stats::GuardStats;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Message for editors when coverage visualisation is on
pub const COVERAGE_REFRESH_MESSAGE: &str =
    "KeepOut Security updated. Refresh the node tree to show changes";

/// Summary of a successful reload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadOutcome {
    pub generation: u64,
    pub rules: usize,
    pub skipped: usize,
    pub visualize_coverage: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Compiles rules and installs them into the store
pub struct RuleService {
    tree: SharedContentTree,
    groups: SharedGroupDirectory,
    compiler: RuleCompiler,
    store: Arc<RuleStore>,
    stats: Arc<GuardStats>,
    /// Serializes reloads so an older compile never replaces a newer one
    reload_lock: Mutex<()>,
}

impl RuleService {
    pub fn new(
        tree: SharedContentTree,
        groups: SharedGroupDirectory,
        compiler: RuleCompiler,
        store: Arc<RuleStore>,
        stats: Arc<GuardStats>,
    ) -> Self {
        Self {
            tree,
            groups,
            compiler,
            store,
            stats,
            reload_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    pub fn compiler(&self) -> &RuleCompiler {
        &self.compiler
    }

    pub fn tree(&self) -> &SharedContentTree {
        &self.tree
    }

    /// Recompile and install the rules
    ///
    /// Safe to call at any time and repeatedly. On error the active snapshot
    /// is left untouched.
    pub async fn reload(&self) -> Result<ReloadOutcome, CompileError> {
        let _guard = self.reload_lock.lock().await;

        let result = match self.tree.refresh().await {
            Ok(()) => {
                self.compiler
                    .compile(self.tree.as_ref(), self.groups.as_ref())
                    .await
            }
            Err(e) => Err(CompileError::Content(e)),
        };

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.stats.record_reload(false);
                warn!(
                    error = %e,
                    generation = self.store.generation(),
                    "Rule reload failed, keeping previous rules"
                );
                return Err(e);
            }
        };

        let rules = snapshot.len();
        let skipped = snapshot.skipped().len();
        let visualize_coverage = snapshot.visualize_coverage();
        let generation = self.store.replace(snapshot);
        self.stats.record_reload(true);

        info!(
            generation,
            rules,
            skipped,
            source = self.tree.source_type(),
            "Rules reloaded"
        );

        Ok(ReloadOutcome {
            generation,
            rules,
            skipped,
            visualize_coverage,
            message: visualize_coverage.then(|| COVERAGE_REFRESH_MESSAGE.to_string()),
        })
    }

    /// Whether a change notification can affect the rules
    ///
    /// Published items reload when any of them is a rule item or the rule
    /// folder (both share the rule type prefix), or while no rules are
    /// loaded yet. Trashed items reload only for rule items.
    pub fn should_reload(&self, event: &ContentEvent) -> bool {
        let rule_type = &self.compiler.aliases().rule_type;
        let touches_rules = event
            .items()
            .iter()
            .any(|item| item.content_type.starts_with(rule_type.as_str()));

        match event {
            ContentEvent::Published(_) => touches_rules || !self.store.is_initialized(),
            ContentEvent::Trashed(_) => touches_rules,
        }
    }

    /// Coverage of a node for tree visualisation
    pub async fn coverage(&self, id: NodeId) -> Result<Option<Coverage>, ContentError> {
        let Some(snapshot) = self.store.current() else {
            return Ok(Some(Coverage::Disabled));
        };
        if !snapshot.visualize_coverage() {
            return Ok(Some(Coverage::Disabled));
        }

        let node: Option<ContentNode> = self.tree.get_by_id(id).await?;
        Ok(node.map(|node| coverage_for(&snapshot, &self.compiler, &node)))
    }
}

/// Fire-and-forget handle to the reload worker
#[derive(Clone)]
pub struct ReloadHandle {
    tx: mpsc::Sender<()>,
    service: Arc<RuleService>,
}

impl ReloadHandle {
    /// Ask for a reload
    ///
    /// Returns `false` only when the worker has stopped. A full queue already
    /// holds a pending reload, which will see the same content.
    pub fn trigger(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(())) => {
                debug!("Reload already queued");
                true
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                warn!("Reload worker stopped, trigger ignored");
                false
            }
        }
    }

    /// Trigger a reload if the notification can affect the rules
    pub fn notify(&self, event: &ContentEvent) -> bool {
        if !self.service.should_reload(event) {
            debug!(items = event.items().len(), "Content change does not affect rules");
            return false;
        }
        self.trigger()
    }

    pub fn service(&self) -> &Arc<RuleService> {
        &self.service
    }
}

/// Start the background reload worker
///
/// Queued triggers are coalesced into one reload. The worker exits when `ct`
/// is cancelled or every handle is dropped.
pub fn spawn_reload_worker(
    service: Arc<RuleService>,
    capacity: usize,
    ct: CancellationToken,
) -> (ReloadHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<()>(capacity.max(1));
    let handle = ReloadHandle {
        tx,
        service: service.clone(),
    };

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = ct.cancelled() => {
                    debug!("Reload worker cancelled");
                    break;
                }
                msg = rx.recv() => {
                    if msg.is_none() {
                        break;
                    }
                    let mut coalesced = 0usize;
                    while rx.try_recv().is_ok() {
                        coalesced += 1;
                    }
                    if coalesced > 0 {
                        debug!(coalesced, "Coalesced queued reload triggers");
                    }
                    // Failures are logged by the service and keep the last good rules
                    let _ = service.reload().await;
                }
            }
        }
    });

    (handle, task)
}
