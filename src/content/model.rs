//! Content model types
//!
//! The generic content representation handed over by content tree collaborators.

use crate::error::ContentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Content node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NodeId {
    fn from(id: i64) -> Self {
        NodeId(id)
    }
}

/// Member group identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered ancestor ids from the tree root down to and including a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathAncestry(Vec<NodeId>);

impl PathAncestry {
    pub fn new(ids: Vec<NodeId>) -> Self {
        Self(ids)
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.0
    }

    /// The node this path leads to
    pub fn leaf(&self) -> Option<NodeId> {
        self.0.last().copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.0.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Extend this path by one child
    pub fn child(&self, id: NodeId) -> Self {
        let mut ids = self.0.clone();
        ids.push(id);
        Self(ids)
    }
}

impl From<Vec<i64>> for PathAncestry {
    fn from(ids: Vec<i64>) -> Self {
        Self(ids.into_iter().map(NodeId).collect())
    }
}

impl FromStr for PathAncestry {
    type Err = ContentError;

    /// Parse the comma-separated form, e.g. `-1,1,10,30,55`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                segment
                    .parse::<i64>()
                    .map(NodeId)
                    .map_err(|e| ContentError::InvalidPath {
                        path: s.to_string(),
                        reason: format!("segment '{}': {}", segment, e),
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl fmt::Display for PathAncestry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|id| id.to_string()).collect();
        f.write_str(&parts.join(","))
    }
}

/// A content item as exposed by the content tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    pub id: NodeId,

    #[serde(default)]
    pub name: String,

    /// Content type alias
    pub content_type: String,

    #[serde(default = "default_published")]
    pub published: bool,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub parent: Option<NodeId>,

    /// Ancestry including this node; derived from `parent` links for exports
    #[serde(default)]
    pub path: PathAncestry,

    /// Public URL, used as the redirect location
    #[serde(default)]
    pub url: Option<String>,

    /// Property values keyed by alias
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

fn default_published() -> bool {
    true
}

impl ContentNode {
    pub fn property(&self, alias: &str) -> Option<&serde_json::Value> {
        self.properties.get(alias)
    }

    pub fn is_type(&self, alias: &str) -> bool {
        self.content_type == alias
    }
}

/// A member group as resolved by the group directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberGroup {
    pub id: GroupId,
    pub name: String,
}

/// Minimal description of a content item named in a change notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedItem {
    pub id: NodeId,
    pub content_type: String,
}

/// Content change notifications that may require the rules to be recompiled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentEvent {
    Published(Vec<ChangedItem>),
    Trashed(Vec<ChangedItem>),
}

impl ContentEvent {
    pub fn items(&self) -> &[ChangedItem] {
        match self {
            ContentEvent::Published(items) | ContentEvent::Trashed(items) => items,
        }
    }
}
