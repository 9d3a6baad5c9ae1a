//! Rule compiler
//!
//! Reads rule definitions from the content tree and builds a [`RuleSnapshot`].
//!
//! The rule folder is a published root-level item of the folder content type.
//! Its published children of the rule content type are the rule definitions,
//! compiled in ascending creation order. A malformed rule item is skipped and
//! recorded; it never aborts the compile. Typed access to property values
//! happens only here.

use crate::config::RuleAliases;
use crate::content::{ContentNode, ContentTree, GroupDirectory, GroupId, NodeId};
use crate::error::{CompileError, ContentError, RuleParseError, RuleParseReason};
use crate::rules::types::{Rule, RuleSnapshot};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, trace, warn};

/// Prefix of every coverage label
pub const COVERAGE_LABEL_PREFIX: &str = "keepout";

/// A rule item after typed parsing, before group names are resolved
#[derive(Debug, Clone, PartialEq, Eq)]
struct RuleDefinition {
    node: NodeId,
    denied_group_ids: Vec<GroupId>,
    secured_root: NodeId,
    no_access_target: NodeId,
    coverage_label: String,
}

/// Compiles rule definitions from the content tree
#[derive(Debug, Clone, Default)]
pub struct RuleCompiler {
    aliases: RuleAliases,
}

impl RuleCompiler {
    pub fn new(aliases: RuleAliases) -> Self {
        Self { aliases }
    }

    pub fn aliases(&self) -> &RuleAliases {
        &self.aliases
    }

    /// Find the published rule folder among the root-level items
    pub async fn locate_folder(&self, tree: &dyn ContentTree) -> Result<ContentNode, CompileError> {
        tree.root_items()
            .await?
            .into_iter()
            .find(|node| node.published && node.is_type(&self.aliases.folder_type))
            .ok_or_else(|| CompileError::ConfigurationMissing {
                folder_type: self.aliases.folder_type.clone(),
            })
    }

    /// Compile a fresh snapshot from the current state of the tree
    pub async fn compile(
        &self,
        tree: &dyn ContentTree,
        groups: &dyn GroupDirectory,
    ) -> Result<RuleSnapshot, CompileError> {
        let folder = self.locate_folder(tree).await?;
        let visualize_coverage = folder
            .property(&self.aliases.show_coverage)
            .and_then(parse_flag)
            .unwrap_or(false);

        let mut items: Vec<ContentNode> = tree
            .published_children(folder.id)
            .await?
            .into_iter()
            .filter(|node| node.published && node.is_type(&self.aliases.rule_type))
            .collect();
        // Stable sort keeps tree order for equal timestamps
        items.sort_by_key(|node| node.created_at);

        debug!(
            folder = %folder.id,
            items = items.len(),
            visualize_coverage,
            "Compiling rules"
        );

        let mut rules = Vec::with_capacity(items.len());
        let mut skipped = Vec::new();

        for item in &items {
            let parsed = match self.parse_definition(item) {
                Ok(definition) => resolve_groups(definition, groups).await?,
                Err(reason) => Err(reason),
            };

            match parsed {
                Ok(rule) => {
                    trace!(
                        rule_item = %item.id,
                        secured_root = %rule.secured_root,
                        denied = ?rule.denied_groups,
                        "Compiled rule"
                    );
                    rules.push(rule);
                }
                Err(reason) => {
                    let error = RuleParseError::new(item.id, reason);
                    warn!(rule_item = %item.id, error = %error, "Skipping rule item");
                    skipped.push(error);
                }
            }
        }

        Ok(RuleSnapshot::new(
            folder.id,
            visualize_coverage,
            rules,
            skipped,
        ))
    }

    /// Read the typed fields of a rule item
    fn parse_definition(&self, node: &ContentNode) -> Result<RuleDefinition, RuleParseReason> {
        let aliases = &self.aliases;

        let denied_group_ids = parse_group_ids(required(node, &aliases.denied_groups)?)
            .ok_or_else(|| invalid(node, &aliases.denied_groups))?;
        let secured_root = parse_node_ref(required(node, &aliases.page_to_secure)?)
            .ok_or_else(|| invalid(node, &aliases.page_to_secure))?;
        let no_access_target = parse_node_ref(required(node, &aliases.no_access_page)?)
            .ok_or_else(|| invalid(node, &aliases.no_access_page))?;

        Ok(RuleDefinition {
            node: node.id,
            denied_group_ids,
            secured_root,
            no_access_target,
            coverage_label: self.coverage_label(node),
        })
    }

    /// Coverage label of a rule item, `keepout-<colour label>`
    pub fn coverage_label(&self, node: &ContentNode) -> String {
        match node
            .property(&self.aliases.coverage_colour)
            .and_then(parse_colour_label)
        {
            Some(label) => format!("{}-{}", COVERAGE_LABEL_PREFIX, label),
            None => COVERAGE_LABEL_PREFIX.to_string(),
        }
    }
}

/// Resolve group ids to names
///
/// The outer error aborts the compile (directory unreachable); the inner one
/// only skips this rule (group does not exist).
async fn resolve_groups(
    definition: RuleDefinition,
    directory: &dyn GroupDirectory,
) -> Result<Result<Rule, RuleParseReason>, ContentError> {
    let mut denied_groups = BTreeSet::new();
    for id in &definition.denied_group_ids {
        match directory.group_name(*id).await? {
            Some(name) => {
                denied_groups.insert(name);
            }
            None => return Ok(Err(RuleParseReason::UnknownGroup(*id))),
        }
    }

    Ok(Ok(Rule {
        secured_root: definition.secured_root,
        denied_groups,
        no_access_target: definition.no_access_target,
        coverage_label: definition.coverage_label,
        creation_order: 0,
        definition_node: definition.node,
    }))
}

fn required<'a>(node: &'a ContentNode, alias: &str) -> Result<&'a Value, RuleParseReason> {
    match node.property(alias) {
        Some(Value::Null) | None => Err(RuleParseReason::MissingProperty(alias.to_string())),
        Some(value) => Ok(value),
    }
}

fn invalid(node: &ContentNode, alias: &str) -> RuleParseReason {
    RuleParseReason::InvalidValue {
        alias: alias.to_string(),
        value: node
            .property(alias)
            .map(|v| v.to_string())
            .unwrap_or_default(),
    }
}

fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Comma-separated ids or an array of ids; empty means no groups
fn parse_group_ids(value: &Value) -> Option<Vec<GroupId>> {
    match value {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.parse().ok().map(GroupId))
            .collect(),
        Value::Array(items) => items.iter().map(|v| parse_id(v).map(GroupId)).collect(),
        Value::Number(_) => parse_id(value).map(|id| vec![GroupId(id)]),
        _ => None,
    }
}

/// A node id, numeric string, or picked-content object with an `id`
fn parse_node_ref(value: &Value) -> Option<NodeId> {
    match value {
        Value::Object(map) => map.get("id").and_then(parse_id).map(NodeId),
        other => parse_id(other).map(NodeId),
    }
}

/// A colour label string or a picked-colour object with a `label`
fn parse_colour_label(value: &Value) -> Option<String> {
    let label = match value {
        Value::String(s) => s.trim(),
        Value::Object(map) => map.get("label").and_then(Value::as_str)?.trim(),
        _ => return None,
    };
    (!label.is_empty()).then(|| label.to_string())
}

fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Some(true),
            "0" | "false" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
