//! Rule model types
//!
//! A [`RuleSnapshot`] is one immutable compiled version of the full rule set.
//! It is built whole by the compiler and never mutated afterwards.

use crate::content::{NodeId, PathAncestry};
use crate::error::RuleParseError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Denies a set of member groups access to a secured subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    /// Root of the secured subtree
    pub secured_root: NodeId,

    /// Group names whose members are sent to `no_access_target`
    pub denied_groups: BTreeSet<String>,

    /// Node to redirect denied members to
    pub no_access_target: NodeId,

    /// Display tag for coverage visualisation
    pub coverage_label: String,

    /// Position in creation order within the snapshot
    pub creation_order: usize,

    /// The rule item this rule was read from
    pub definition_node: NodeId,
}

impl Rule {
    /// Whether any of the given groups is denied by this rule
    ///
    /// A rule without denied groups never denies.
    pub fn denies(&self, groups: &HashSet<String>) -> bool {
        self.denied_groups.iter().any(|denied| groups.contains(denied))
    }
}

/// Immutable compiled rule set
#[derive(Debug, Clone)]
pub struct RuleSnapshot {
    rules: Vec<Rule>,
    /// Secured root → index into `rules`; later rules win duplicate roots
    by_root: HashMap<NodeId, usize>,
    folder_id: NodeId,
    visualize_coverage: bool,
    skipped: Vec<RuleParseError>,
    compiled_at: DateTime<Utc>,
    /// Set by the store on install; 0 while not installed
    generation: u64,
}

impl RuleSnapshot {
    /// Build a snapshot from rules already in creation order
    ///
    /// `creation_order` is reassigned from each rule's position.
    pub fn new(
        folder_id: NodeId,
        visualize_coverage: bool,
        mut rules: Vec<Rule>,
        skipped: Vec<RuleParseError>,
    ) -> Self {
        let mut by_root = HashMap::with_capacity(rules.len());
        for (index, rule) in rules.iter_mut().enumerate() {
            rule.creation_order = index;
            by_root.insert(rule.secured_root, index);
        }

        Self {
            rules,
            by_root,
            folder_id,
            visualize_coverage,
            skipped,
            compiled_at: Utc::now(),
            generation: 0,
        }
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// All rules in creation order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Ids of all secured roots
    pub fn secured_root_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.by_root.keys().copied()
    }

    pub fn is_secured_root(&self, id: NodeId) -> bool {
        self.by_root.contains_key(&id)
    }

    /// The rule governing a secured root
    pub fn rule_for_root(&self, id: NodeId) -> Option<&Rule> {
        self.by_root.get(&id).map(|&index| &self.rules[index])
    }

    /// Secured roots on a path, in root-to-leaf order
    pub fn secured_ancestors(&self, path: &PathAncestry) -> Vec<NodeId> {
        path.ids()
            .iter()
            .copied()
            .filter(|id| self.is_secured_root(*id))
            .collect()
    }

    /// The innermost rule covering a path, if any
    pub fn governing_rule(&self, path: &PathAncestry) -> Option<&Rule> {
        self.secured_ancestors(path)
            .last()
            .and_then(|root| self.rule_for_root(*root))
    }

    /// Content id of the rule folder this snapshot was compiled from
    pub fn folder_id(&self) -> NodeId {
        self.folder_id
    }

    pub fn visualize_coverage(&self) -> bool {
        self.visualize_coverage
    }

    /// Rule items that were skipped while compiling
    pub fn skipped(&self) -> &[RuleParseError] {
        &self.skipped
    }

    pub fn compiled_at(&self) -> DateTime<Utc> {
        self.compiled_at
    }

    /// Store generation this snapshot was installed as
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Same folder, flag and rules, ignoring identity and compile time
    pub fn same_rules(&self, other: &RuleSnapshot) -> bool {
        self.folder_id == other.folder_id
            && self.visualize_coverage == other.visualize_coverage
            && self.rules == other.rules
    }
}
