//! In-memory content tree
//!
//! Holds content nodes and member groups in memory. Used by tests and by the
//! binary when the content tree is provided as an export file (JSON or TOML).
//! A file-backed tree re-reads its export on [`ContentTree::refresh`], so edits
//! to the file are picked up by the next rule reload.
//!
//! ## Export format
//!
//! ```toml
//! [[groups]]
//! id = 1
//! name = "Editors"
//!
//! [[nodes]]
//! id = 1
//! name = "Home"
//! content_type = "homePage"
//! created_at = "2024-01-01T00:00:00Z"
//!
//! [[nodes]]
//! id = 10
//! parent = 1
//! content_type = "section"
//! created_at = "2024-01-02T00:00:00Z"
//! url = "/members"
//! ```

use crate::content::model::{ContentNode, GroupId, MemberGroup, NodeId, PathAncestry};
use crate::content::source::{ContentTree, GroupDirectory};
use crate::error::{ContentError, ContentResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// Serialized content tree export
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContentExport {
    pub nodes: Vec<ContentNode>,
    pub groups: Vec<MemberGroup>,
}

impl ContentExport {
    /// Parse an export, choosing the format from the file extension
    pub fn parse(text: &str, path: &Path) -> ContentResult<Self> {
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            toml::from_str(text).map_err(|e| ContentError::MalformedExport(e.to_string()))
        } else {
            serde_json::from_str(text).map_err(|e| ContentError::MalformedExport(e.to_string()))
        }
    }

    /// Read and parse an export file
    pub fn from_file(path: &Path) -> ContentResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ContentError::Export {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text, path)
    }
}

#[derive(Default)]
struct TreeData {
    nodes: HashMap<NodeId, ContentNode>,
    /// Insertion order, which is the sibling order reported to callers
    order: Vec<NodeId>,
    groups: HashMap<GroupId, String>,
}

/// Content tree and group directory backed by memory
#[derive(Default)]
pub struct InMemoryContentTree {
    data: RwLock<TreeData>,
    export_path: Option<PathBuf>,
}

impl InMemoryContentTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from an already parsed export
    pub fn from_export(export: ContentExport) -> ContentResult<Self> {
        let tree = Self::new();
        tree.load_export(export)?;
        Ok(tree)
    }

    /// Build a tree from an export file; `refresh` re-reads the same file
    pub fn from_file(path: impl Into<PathBuf>) -> ContentResult<Self> {
        let path = path.into();
        let export = ContentExport::from_file(&path)?;
        let mut tree = Self::from_export(export)?;
        tree.export_path = Some(path);
        Ok(tree)
    }

    fn write_data(&self) -> RwLockWriteGuard<'_, TreeData> {
        self.data.write().unwrap_or_else(|poisoned| {
            warn!("content tree lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn read_data(&self) -> RwLockReadGuard<'_, TreeData> {
        self.data.read().unwrap_or_else(|poisoned| {
            warn!("content tree lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Replace the whole tree with the contents of an export
    ///
    /// The current contents are kept if the export has broken parent links.
    pub fn load_export(&self, export: ContentExport) -> ContentResult<()> {
        let mut fresh = TreeData::default();
        for group in export.groups {
            fresh.groups.insert(group.id, group.name);
        }
        for node in export.nodes {
            if fresh.nodes.insert(node.id, node.clone()).is_none() {
                fresh.order.push(node.id);
            }
        }
        rebuild_paths(&mut fresh)?;

        *self.write_data() = fresh;
        Ok(())
    }

    /// Insert or replace a node
    pub fn insert(&self, node: ContentNode) -> ContentResult<()> {
        let mut data = self.write_data();
        let id = node.id;
        let previous = data.nodes.insert(id, node);
        if previous.is_none() {
            data.order.push(id);
        }
        if let Err(e) = rebuild_paths(&mut data) {
            // Roll back so the tree stays consistent
            match previous {
                Some(old) => {
                    data.nodes.insert(id, old);
                }
                None => {
                    data.nodes.remove(&id);
                    data.order.retain(|existing| *existing != id);
                }
            }
            rebuild_paths(&mut data)?;
            return Err(e);
        }
        Ok(())
    }

    /// Remove a node and its descendants, returning how many were removed
    pub fn remove(&self, id: NodeId) -> usize {
        let mut data = self.write_data();
        let doomed: HashSet<NodeId> = data
            .nodes
            .values()
            .filter(|node| node.path.contains(id))
            .map(|node| node.id)
            .collect();
        data.nodes.retain(|node_id, _| !doomed.contains(node_id));
        data.order.retain(|node_id| !doomed.contains(node_id));
        doomed.len()
    }

    /// Set the published flag of a node
    pub fn set_published(&self, id: NodeId, published: bool) -> bool {
        let mut data = self.write_data();
        match data.nodes.get_mut(&id) {
            Some(node) => {
                node.published = published;
                true
            }
            None => false,
        }
    }

    /// Add or rename a member group
    pub fn insert_group(&self, id: GroupId, name: impl Into<String>) {
        self.write_data().groups.insert(id, name.into());
    }

    pub fn node_count(&self) -> usize {
        self.read_data().nodes.len()
    }
}

/// Recompute every node's ancestry from its parent links
fn rebuild_paths(data: &mut TreeData) -> ContentResult<()> {
    let mut resolved: HashMap<NodeId, PathAncestry> = HashMap::with_capacity(data.nodes.len());

    for &start in &data.order {
        if resolved.contains_key(&start) {
            continue;
        }

        // Walk up until we hit a resolved node or a root
        let mut chain = vec![start];
        let mut seen = HashSet::from([start]);
        let base = loop {
            let current = chain[chain.len() - 1];
            let node = &data.nodes[&current];
            match node.parent {
                None => {
                    // Roots keep an exported path (e.g. one starting at -1)
                    let path = if node.path.leaf() == Some(current) {
                        let mut ids = node.path.ids().to_vec();
                        ids.pop();
                        PathAncestry::new(ids)
                    } else {
                        PathAncestry::default()
                    };
                    break path;
                }
                Some(parent) => {
                    if let Some(path) = resolved.get(&parent) {
                        break path.clone();
                    }
                    if !data.nodes.contains_key(&parent) {
                        return Err(ContentError::MalformedExport(format!(
                            "node {} refers to missing parent {}",
                            current, parent
                        )));
                    }
                    if !seen.insert(parent) {
                        return Err(ContentError::MalformedExport(format!(
                            "parent cycle through node {}",
                            parent
                        )));
                    }
                    chain.push(parent);
                }
            }
        };

        let mut path = base;
        for id in chain.into_iter().rev() {
            path = path.child(id);
            resolved.insert(id, path.clone());
        }
    }

    for (id, path) in resolved {
        if let Some(node) = data.nodes.get_mut(&id) {
            node.path = path;
        }
    }
    Ok(())
}

#[async_trait]
impl ContentTree for InMemoryContentTree {
    async fn get_by_id(&self, id: NodeId) -> ContentResult<Option<ContentNode>> {
        Ok(self.read_data().nodes.get(&id).cloned())
    }

    async fn published_children(&self, id: NodeId) -> ContentResult<Vec<ContentNode>> {
        let data = self.read_data();
        Ok(data
            .order
            .iter()
            .filter_map(|node_id| data.nodes.get(node_id))
            .filter(|node| node.parent == Some(id) && node.published)
            .cloned()
            .collect())
    }

    async fn root_items(&self) -> ContentResult<Vec<ContentNode>> {
        let data = self.read_data();
        Ok(data
            .order
            .iter()
            .filter_map(|node_id| data.nodes.get(node_id))
            .filter(|node| node.parent.is_none())
            .cloned()
            .collect())
    }

    async fn refresh(&self) -> ContentResult<()> {
        if let Some(path) = &self.export_path {
            let export = ContentExport::from_file(path)?;
            self.load_export(export)?;
            debug!(path = %path.display(), nodes = self.node_count(), "Re-read content export");
        }
        Ok(())
    }

    fn source_type(&self) -> &'static str {
        if self.export_path.is_some() {
            "file"
        } else {
            "memory"
        }
    }
}

#[async_trait]
impl GroupDirectory for InMemoryContentTree {
    async fn group_name(&self, id: GroupId) -> ContentResult<Option<String>> {
        Ok(self.read_data().groups.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::io::Write;

    fn node(id: i64, parent: Option<i64>) -> ContentNode {
        ContentNode {
            id: NodeId(id),
            name: format!("node {}", id),
            content_type: "page".into(),
            published: true,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            parent: parent.map(NodeId),
            path: PathAncestry::default(),
            url: None,
            properties: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_paths_follow_parents() {
        let tree = InMemoryContentTree::from_export(ContentExport {
            // Deliberately out of order
            nodes: vec![node(55, Some(30)), node(1, None), node(30, Some(10)), node(10, Some(1))],
            groups: vec![],
        })
        .unwrap();

        let path = tree.ancestor_path(NodeId(55)).await.unwrap().unwrap();
        assert_eq!(path, PathAncestry::from(vec![1, 10, 30, 55]));
        assert!(tree.ancestor_path(NodeId(404)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exported_root_path_is_kept() {
        let mut root = node(1, None);
        root.path = PathAncestry::from(vec![-1, 1]);
        let tree = InMemoryContentTree::from_export(ContentExport {
            nodes: vec![root, node(10, Some(1))],
            groups: vec![],
        })
        .unwrap();

        let path = tree.ancestor_path(NodeId(10)).await.unwrap().unwrap();
        assert_eq!(path, PathAncestry::from(vec![-1, 1, 10]));
    }

    #[test]
    fn test_missing_parent_is_rejected() {
        let result = InMemoryContentTree::from_export(ContentExport {
            nodes: vec![node(2, Some(1))],
            groups: vec![],
        });
        assert!(matches!(result, Err(ContentError::MalformedExport(_))));
    }

    #[test]
    fn test_parent_cycle_is_rejected() {
        let result = InMemoryContentTree::from_export(ContentExport {
            nodes: vec![node(1, Some(2)), node(2, Some(1))],
            groups: vec![],
        });
        assert!(matches!(result, Err(ContentError::MalformedExport(_))));
    }

    #[tokio::test]
    async fn test_published_children_filters_and_keeps_order() {
        let tree = InMemoryContentTree::from_export(ContentExport {
            nodes: vec![node(1, None), node(3, Some(1)), node(2, Some(1)), node(4, Some(1))],
            groups: vec![],
        })
        .unwrap();
        tree.set_published(NodeId(2), false);

        let children = tree.published_children(NodeId(1)).await.unwrap();
        let ids: Vec<_> = children.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![NodeId(3), NodeId(4)]);
    }

    #[tokio::test]
    async fn test_insert_with_bad_parent_rolls_back() {
        let tree = InMemoryContentTree::from_export(ContentExport {
            nodes: vec![node(1, None)],
            groups: vec![],
        })
        .unwrap();

        assert!(tree.insert(node(5, Some(77))).is_err());
        assert_eq!(tree.node_count(), 1);
        assert!(tree.get_by_id(NodeId(5)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_drops_descendants() {
        let tree = InMemoryContentTree::from_export(ContentExport {
            nodes: vec![node(1, None), node(10, Some(1)), node(11, Some(10)), node(20, Some(1))],
            groups: vec![],
        })
        .unwrap();

        assert_eq!(tree.remove(NodeId(10)), 2);
        assert_eq!(tree.node_count(), 2);
        assert_eq!(tree.root_items().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_group_names() {
        let tree = InMemoryContentTree::new();
        tree.insert_group(GroupId(1), "Editors");
        assert_eq!(
            tree.group_name(GroupId(1)).await.unwrap(),
            Some("Editors".to_string())
        );
        assert_eq!(tree.group_name(GroupId(2)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_backed_refresh() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"nodes": [{{"id": 1, "content_type": "home", "created_at": "2024-01-01T00:00:00Z"}}]}}"#
        )
        .unwrap();

        let tree = InMemoryContentTree::from_file(file.path()).unwrap();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.source_type(), "file");

        std::fs::write(
            file.path(),
            r#"{"nodes": [
                {"id": 1, "content_type": "home", "created_at": "2024-01-01T00:00:00Z"},
                {"id": 2, "parent": 1, "content_type": "page", "created_at": "2024-01-01T00:00:00Z"}
            ], "groups": [{"id": 9, "name": "Writers"}]}"#,
        )
        .unwrap();

        tree.refresh().await.unwrap();
        assert_eq!(tree.node_count(), 2);
        assert_eq!(
            tree.group_name(GroupId(9)).await.unwrap().as_deref(),
            Some("Writers")
        );
    }

    #[test]
    fn test_parse_toml_export() {
        let text = r#"
[[groups]]
id = 1
name = "Editors"

[[nodes]]
id = 1
content_type = "home"
created_at = "2024-01-01T00:00:00Z"

[[nodes]]
id = 10
parent = 1
content_type = "section"
created_at = "2024-01-02T00:00:00Z"
properties = { showRuleCoverage = true }
"#;
        let export = ContentExport::parse(text, Path::new("content.toml")).unwrap();
        assert_eq!(export.nodes.len(), 2);
        assert_eq!(export.groups[0].name, "Editors");
        assert_eq!(
            export.nodes[1].property("showRuleCoverage"),
            Some(&serde_json::Value::Bool(true))
        );
    }
}
