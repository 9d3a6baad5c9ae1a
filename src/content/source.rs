//! Content collaborator traits
//!
//! The rule core never talks to storage directly. Content trees and member
//! group directories are reached through these traits so the host can plug in
//! whatever repository it runs on.

use crate::config::{ContentConfig, ContentSource};
use crate::content::client::ContentApiClient;
use crate::content::memory::InMemoryContentTree;
use crate::content::model::{ContentNode, GroupId, NodeId, PathAncestry};
use crate::error::{ConfigError, ContentResult};
// async_trait required for dyn-compatibility with Arc<dyn ContentTree>
use async_trait::async_trait;
use std::sync::Arc;

/// Read access to a hierarchical content tree
#[async_trait]
pub trait ContentTree: Send + Sync {
    /// Fetch a single node, `None` when it does not exist
    async fn get_by_id(&self, id: NodeId) -> ContentResult<Option<ContentNode>>;

    /// Published children of a node, in the order the tree stores them
    async fn published_children(&self, id: NodeId) -> ContentResult<Vec<ContentNode>>;

    /// Root-to-node ancestry, `None` when the node does not exist
    async fn ancestor_path(&self, id: NodeId) -> ContentResult<Option<PathAncestry>> {
        Ok(self.get_by_id(id).await?.map(|node| node.path))
    }

    /// Items at the top level of the tree
    async fn root_items(&self) -> ContentResult<Vec<ContentNode>>;

    /// Pick up external changes before a compile pass
    ///
    /// Sources that read live data need nothing here.
    async fn refresh(&self) -> ContentResult<()> {
        Ok(())
    }

    /// Short name of the source (for logging)
    fn source_type(&self) -> &'static str;
}

/// Resolution of member group ids to their names
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    async fn group_name(&self, id: GroupId) -> ContentResult<Option<String>>;
}

/// Shared handle to a content tree
pub type SharedContentTree = Arc<dyn ContentTree>;

/// Shared handle to a group directory
pub type SharedGroupDirectory = Arc<dyn GroupDirectory>;

/// Open the configured content source as both tree and group directory
pub fn open_sources(
    config: &ContentConfig,
) -> crate::Result<(SharedContentTree, SharedGroupDirectory)> {
    match config.source {
        ContentSource::File => {
            let path = config
                .file
                .as_deref()
                .filter(|path| !path.is_empty())
                .ok_or_else(|| ConfigError::Missing {
                    field: "content.file".to_string(),
                })?;
            let tree = Arc::new(InMemoryContentTree::from_file(
                shellexpand::tilde(path).into_owned(),
            )?);
            let content: SharedContentTree = tree.clone();
            let groups: SharedGroupDirectory = tree;
            Ok((content, groups))
        }
        ContentSource::Api => {
            let client = Arc::new(ContentApiClient::new(&config.api)?);
            let content: SharedContentTree = client.clone();
            let groups: SharedGroupDirectory = client;
            Ok((content, groups))
        }
    }
}
