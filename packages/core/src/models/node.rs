//! Node Data Structures
//!
//! This module defines the `Node` struct and the request/response shapes that
//! flow through the tree engine.
//!
//! # Architecture
//!
//! - **Single tree**: every node except the root has a `parent_id`
//! - **Integer identity**: ids are generated by the store and never reused
//! - **Sibling order**: `order` sorts children of the same parent; values are
//!   not required to be contiguous or globally unique
//!
//! # Examples
//!
//! ```rust
//! use nodetree_core::models::{NewNode, NodeUpdate};
//!
//! // Payload for the root node
//! let root = NewNode::new("Company", None);
//! assert!(root.is_root());
//!
//! // Rename only (parent and order untouched)
//! let update = NodeUpdate::new().with_title("Acme Inc.");
//! assert!(!update.is_empty());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Store-assigned node identifier
pub type NodeId = i64;

/// Validation errors for node input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("Invalid node ID: {0}")]
    InvalidId(String),
}

/// The stored tree is deeper than a nested read may return
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Tree is deeper than {max_depth} levels")]
pub struct DepthLimitExceeded {
    pub max_depth: usize,
}

/// A single node of the tree.
///
/// # Fields
///
/// - `id`: Unique identifier assigned by the store
/// - `title`: Display text, never blank
/// - `parent_id`: Parent reference; `None` marks the root
/// - `order`: Position among siblings (ascending, left to right)
/// - `created_at` / `modified_at`: Maintained by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    pub title: String,

    /// Parent node ID (`None` only for the root)
    pub parent_id: Option<NodeId>,

    /// Sibling position
    pub order: i64,

    pub created_at: DateTime<Utc>,

    pub modified_at: DateTime<Utc>,
}

impl Node {
    /// True if this node is the tree root
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Parse a node id taken from a URL path segment.
pub fn parse_node_id(raw: &str) -> Result<NodeId, ValidationError> {
    raw.trim()
        .parse()
        .map_err(|_| ValidationError::InvalidId(raw.to_string()))
}

/// Validate a title the way every write path does: blank after trimming is rejected.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(())
}

/// Payload for inserting a node.
///
/// The `order` is not part of the payload: it is always computed by the store
/// inside the insert transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNode {
    pub title: String,

    #[serde(default)]
    pub parent_id: Option<NodeId>,
}

impl NewNode {
    pub fn new(title: impl Into<String>, parent_id: Option<NodeId>) -> Self {
        Self {
            title: title.into(),
            parent_id,
        }
    }

    /// True if this insert would create the root
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)
    }
}

/// Helper for the double-Option pattern on nullable fields.
///
/// Maps three input formats:
/// - Missing field → None (don't update)
/// - null → Some(None) (set to NULL)
/// - value → Some(Some(value))
fn deserialize_optional_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    // Missing field is handled by #[serde(default)] on the struct field
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Partial node update.
///
/// Only provided fields are written; everything else keeps its prior value.
///
/// # Double-Option Pattern
///
/// `parent_id` distinguishes three states:
///
/// - `None`: Don't change parent_id
/// - `Some(None)`: Set parent_id to NULL (only legal as a no-op on the root)
/// - `Some(Some(id))`: Move under `id`
///
/// # Examples
///
/// ```rust
/// # use nodetree_core::models::NodeUpdate;
/// let update = NodeUpdate::new().with_parent(7).with_order(3);
/// assert_eq!(update.parent_id, Some(Some(7)));
/// assert_eq!(update.order, Some(3));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub parent_id: Option<Option<NodeId>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl NodeUpdate {
    /// Create a new empty NodeUpdate
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_parent(mut self, parent_id: NodeId) -> Self {
        self.parent_id = Some(Some(parent_id));
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    /// Check if update contains any changes
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.parent_id.is_none() && self.order.is_none()
    }

    /// Apply the supplied fields to `node` in place
    pub fn apply_to(&self, node: &mut Node) {
        if let Some(title) = &self.title {
            node.title = title.clone();
        }
        if let Some(parent_id) = self.parent_id {
            node.parent_id = parent_id;
        }
        if let Some(order) = self.order {
            node.order = order;
        }
    }
}

/// Result of a delete operation
///
/// `deleted_ids` lists every removed node, children before their parents.
/// For a leaf it holds exactly the target id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted_ids: Vec<NodeId>,
}

impl DeleteResult {
    pub fn deleted_count(&self) -> usize {
        self.deleted_ids.len()
    }
}

/// A node with its children nested, sorted by sibling order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub node: Node,

    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Build the nested tree from a flat node list.
    ///
    /// The `parent_id → children` map is built once; each node is then visited
    /// exactly once, without recursion. Returns `Ok(None)` for an empty list.
    /// Nodes not reachable from the root (which the engine never commits) are
    /// left out. The root sits at depth 0; a node deeper than `max_depth`
    /// fails the whole build.
    pub fn build(
        nodes: Vec<Node>,
        max_depth: usize,
    ) -> Result<Option<TreeNode>, DepthLimitExceeded> {
        let mut by_parent: HashMap<Option<NodeId>, Vec<Node>> = HashMap::new();
        for node in nodes {
            by_parent.entry(node.parent_id).or_default().push(node);
        }
        for siblings in by_parent.values_mut() {
            siblings.sort_by_key(|n| (n.order, n.id));
        }

        let root = match by_parent.remove(&None).and_then(|roots| roots.into_iter().next()) {
            Some(root) => root,
            None => return Ok(None),
        };

        // Breadth-first: (node, index of parent, depth). Siblings stay adjacent
        // and in order, and every parent precedes its children.
        let mut visited: Vec<(Node, Option<usize>, usize)> = vec![(root, None, 0)];
        let mut next = 0;
        while next < visited.len() {
            let (id, depth) = (visited[next].0.id, visited[next].2);
            if let Some(children) = by_parent.remove(&Some(id)) {
                if depth + 1 > max_depth {
                    return Err(DepthLimitExceeded { max_depth });
                }
                visited.extend(children.into_iter().map(|child| (child, Some(next), depth + 1)));
            }
            next += 1;
        }

        // Assemble bottom-up; siblings arrive last-first.
        let mut pending: Vec<Vec<TreeNode>> = (0..visited.len()).map(|_| Vec::new()).collect();
        let mut root = None;
        for (index, (node, parent, _)) in visited.into_iter().enumerate().rev() {
            let mut children = std::mem::take(&mut pending[index]);
            children.reverse();
            let tree = TreeNode { node, children };
            match parent {
                Some(parent) => pending[parent].push(tree),
                None => root = Some(tree),
            }
        }
        Ok(root)
    }

    /// Number of nodes in this subtree, including itself
    pub fn subtree_size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(tree) = stack.pop() {
            count += 1;
            stack.extend(tree.children.iter());
        }
        count
    }

    /// Number of edges on the longest path from this node down to a leaf
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 0)];
        while let Some((tree, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(tree.children.iter().map(|child| (child, depth + 1)));
        }
        deepest
    }
}

impl Drop for TreeNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut tree) = stack.pop() {
            stack.append(&mut tree.children);
        }
    }
}
