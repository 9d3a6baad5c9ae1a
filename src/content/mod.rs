//! Content collaborators
//!
//! The content tree and member group directory the rule core reads from,
//! plus the two shipped sources: an in-memory/export-file tree and an HTTP
//! content API client.

pub mod client;
pub mod memory;
pub mod model;
pub mod source;

pub use client::ContentApiClient;
pub use memory::{ContentExport, InMemoryContentTree};
pub use model::{
    ChangedItem, ContentEvent, ContentNode, GroupId, MemberGroup, NodeId, PathAncestry,
};
pub use source::{
    ContentTree, GroupDirectory, SharedContentTree, SharedGroupDirectory, open_sources,
};
