//! Tree Service - Tree Invariant Engine
//!
//! Validates and executes every mutation of the tree against a [`NodeStore`]:
//!
//! - exactly one root, created by the first insert without a parent
//! - every non-root node points at an existing parent
//! - no cycles: a node is never moved under itself or a descendant
//! - inserted siblings get `MAX(order) + 1`, computed in the insert's transaction
//! - the root is never deleted or reparented
//!
//! # Transactions
//!
//! Each mutation is one store transaction: begin, checks, writes, commit.
//! Any rejection rolls the transaction back before the error is returned.
//! If the store reports lock contention the whole transaction is re-run
//! according to [`RetryConfig`](crate::services::RetryConfig); domain errors
//! are never retried.
//!
//! # Examples
//!
//! ```rust
//! use nodetree_core::config::TreeConfig;
//! use nodetree_core::db::MemoryStore;
//! use nodetree_core::services::TreeService;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = TreeService::new(Arc::new(MemoryStore::new()), TreeConfig::default());
//!
//! let root = service.insert_node("Root", None).await?;
//! let child = service.insert_node("Child", Some(root.id)).await?;
//! assert_eq!(child.order, 1);
//!
//! let tree = service.get_tree().await?.expect("tree is not empty");
//! assert_eq!(tree.subtree_size(), 2);
//! # Ok(())
//! # }
//! ```

use crate::config::{DeletePolicy, TreeConfig};
use crate::db::{NodeStore, NodeTransaction};
use crate::models::{validate_title, DeleteResult, NewNode, Node, NodeId, NodeUpdate, TreeNode};
use crate::services::error::TreeServiceError;
use crate::services::retry::retry;
use std::collections::HashSet;
use std::sync::Arc;

/// Tree operations over a shared node store
#[derive(Clone)]
pub struct TreeService {
    store: Arc<dyn NodeStore>,
    config: TreeConfig,
}

impl TreeService {
    pub fn new(store: Arc<dyn NodeStore>, config: TreeConfig) -> Self {
        Self { store, config }
    }

    /// All nodes, ordered by `order` then `id`
    pub async fn list_nodes(&self) -> Result<Vec<Node>, TreeServiceError> {
        Ok(self.store.get_all().await?)
    }

    pub async fn get_node(&self, id: NodeId) -> Result<Node, TreeServiceError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| TreeServiceError::not_found(id))
    }

    /// The whole tree nested under its root; `None` while the tree is empty
    ///
    /// # Errors
    ///
    /// - `TooDeep` if a node sits more than `max_tree_depth` levels below the root
    pub async fn get_tree(&self) -> Result<Option<TreeNode>, TreeServiceError> {
        let nodes = self.store.get_all().await?;
        Ok(TreeNode::build(nodes, self.config.max_tree_depth)?)
    }

    /// Insert a node as the last child of `parent_id`.
    ///
    /// Without a parent the node becomes the root, which only succeeds while
    /// the tree is empty.
    ///
    /// # Errors
    ///
    /// - `Validation` if the title is blank
    /// - `Conflict(RootExists)` if `parent_id` is `None` and a root exists
    /// - `NotFound` if the parent does not exist
    pub async fn insert_node(
        &self,
        title: impl Into<String>,
        parent_id: Option<NodeId>,
    ) -> Result<Node, TreeServiceError> {
        let new_node = NewNode::new(title, parent_id);
        new_node.validate()?;

        let node = retry(
            "insert_node",
            &self.config.retry,
            TreeServiceError::is_transient,
            || self.insert_once(&new_node),
        )
        .await?;

        tracing::info!(
            "Inserted node {} under {:?} at order {}",
            node.id,
            node.parent_id,
            node.order
        );
        Ok(node)
    }

    /// Apply a partial update to a node.
    ///
    /// Only supplied fields change. An explicit `null` parent is a no-op for
    /// the root and a conflict for any other node. A supplied `order` is
    /// stored as given, even if a sibling already uses it.
    ///
    /// # Errors
    ///
    /// - `Validation` if a supplied title is blank
    /// - `NotFound` if the node or the new parent does not exist
    /// - `Conflict(RootReparent)` when giving the root a parent
    /// - `Conflict(RootExists)` when detaching a non-root node
    /// - `Conflict(Cycle)` when the new parent is the node or a descendant
    pub async fn update_node(
        &self,
        id: NodeId,
        update: NodeUpdate,
    ) -> Result<Node, TreeServiceError> {
        if let Some(title) = &update.title {
            validate_title(title)?;
        }

        let node = retry(
            "update_node",
            &self.config.retry,
            TreeServiceError::is_transient,
            || self.update_once(id, &update),
        )
        .await?;

        tracing::debug!("Updated node {}", id);
        Ok(node)
    }

    /// Delete a non-root node.
    ///
    /// With [`DeletePolicy::Cascade`] the whole subtree goes, children before
    /// parents, in one transaction. With
    /// [`DeletePolicy::RejectIfHasChildren`] only leaves can be deleted.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the node does not exist
    /// - `Conflict(RootDelete)` for the root
    /// - `Conflict(HasChildren)` for an inner node under the reject policy
    pub async fn delete_node(&self, id: NodeId) -> Result<DeleteResult, TreeServiceError> {
        let result = retry(
            "delete_node",
            &self.config.retry,
            TreeServiceError::is_transient,
            || self.delete_once(id),
        )
        .await?;

        tracing::info!(
            "Deleted node {} ({} nodes removed)",
            id,
            result.deleted_count()
        );
        Ok(result)
    }

    async fn insert_once(&self, new_node: &NewNode) -> Result<Node, TreeServiceError> {
        let mut tx = self.store.begin().await?;
        match Self::insert_in(tx.as_mut(), new_node).await {
            Ok(node) => {
                tx.commit().await?;
                Ok(node)
            }
            Err(e) => {
                Self::abort(tx, "insert_node").await;
                Err(e)
            }
        }
    }

    async fn update_once(&self, id: NodeId, update: &NodeUpdate) -> Result<Node, TreeServiceError> {
        let mut tx = self.store.begin().await?;
        match Self::update_in(tx.as_mut(), id, update).await {
            Ok(node) => {
                tx.commit().await?;
                Ok(node)
            }
            Err(e) => {
                Self::abort(tx, "update_node").await;
                Err(e)
            }
        }
    }

    async fn delete_once(&self, id: NodeId) -> Result<DeleteResult, TreeServiceError> {
        let mut tx = self.store.begin().await?;
        match Self::delete_in(tx.as_mut(), id, self.config.delete_policy).await {
            Ok(result) => {
                tx.commit().await?;
                Ok(result)
            }
            Err(e) => {
                Self::abort(tx, "delete_node").await;
                Err(e)
            }
        }
    }

    async fn abort(tx: Box<dyn NodeTransaction>, operation: &str) {
        if let Err(e) = tx.rollback().await {
            tracing::warn!("Rollback of {} failed: {}", operation, e);
        }
    }

    async fn insert_in(
        tx: &mut dyn NodeTransaction,
        new_node: &NewNode,
    ) -> Result<Node, TreeServiceError> {
        match new_node.parent_id {
            None => {
                if tx.exists_root().await? {
                    return Err(TreeServiceError::root_exists());
                }
            }
            Some(parent_id) => {
                if tx.get_by_id(parent_id).await?.is_none() {
                    return Err(TreeServiceError::not_found(parent_id));
                }
            }
        }

        let order = tx.next_order(new_node.parent_id).await?;
        tx.insert(new_node.clone(), order).await.map_err(|e| {
            // Unique index on the root row
            if new_node.is_root() && e.is_constraint_violation() {
                TreeServiceError::root_exists()
            } else {
                e.into()
            }
        })
    }

    async fn update_in(
        tx: &mut dyn NodeTransaction,
        id: NodeId,
        update: &NodeUpdate,
    ) -> Result<Node, TreeServiceError> {
        let node = tx
            .get_by_id(id)
            .await?
            .ok_or_else(|| TreeServiceError::not_found(id))?;

        let mut update = update.clone();
        match update.parent_id {
            Some(None) if node.is_root() => update.parent_id = None,
            Some(None) => return Err(TreeServiceError::root_exists()),
            Some(Some(_)) if node.is_root() => return Err(TreeServiceError::root_reparent(id)),
            Some(Some(parent_id)) => {
                if tx.get_by_id(parent_id).await?.is_none() {
                    return Err(TreeServiceError::not_found(parent_id));
                }
                if Self::is_self_or_descendant(tx, id, parent_id).await? {
                    return Err(TreeServiceError::cycle(id, parent_id));
                }
            }
            None => {}
        }

        if update.is_empty() {
            return Ok(node);
        }

        tx.update(id, &update)
            .await?
            .ok_or_else(|| TreeServiceError::not_found(id))
    }

    async fn delete_in(
        tx: &mut dyn NodeTransaction,
        id: NodeId,
        policy: DeletePolicy,
    ) -> Result<DeleteResult, TreeServiceError> {
        let node = tx
            .get_by_id(id)
            .await?
            .ok_or_else(|| TreeServiceError::not_found(id))?;
        if node.is_root() {
            return Err(TreeServiceError::root_delete(id));
        }

        let subtree = Self::collect_subtree(tx, id).await?;
        if subtree.len() > 1 && policy == DeletePolicy::RejectIfHasChildren {
            return Err(TreeServiceError::has_children(id));
        }

        // Reverse pre-order: every child goes before its parent
        let mut deleted_ids = Vec::with_capacity(subtree.len());
        for node_id in subtree.into_iter().rev() {
            if tx.delete(node_id).await? {
                deleted_ids.push(node_id);
            }
        }

        Ok(DeleteResult { deleted_ids })
    }

    /// `id` and all of its descendants in pre-order
    async fn collect_subtree(
        tx: &mut dyn NodeTransaction,
        id: NodeId,
    ) -> Result<Vec<NodeId>, TreeServiceError> {
        let mut ordered = Vec::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            ordered.push(current);
            let children = tx.child_ids(current).await?;
            stack.extend(children.into_iter().rev());
        }

        Ok(ordered)
    }

    /// Walk up from `candidate_parent`; true if the walk reaches `id`
    async fn is_self_or_descendant(
        tx: &mut dyn NodeTransaction,
        id: NodeId,
        candidate_parent: NodeId,
    ) -> Result<bool, TreeServiceError> {
        let mut seen = HashSet::new();
        let mut current = Some(candidate_parent);

        while let Some(node_id) = current {
            if node_id == id {
                return Ok(true);
            }
            if !seen.insert(node_id) {
                tracing::warn!("Parent chain of node {} loops", candidate_parent);
                break;
            }
            current = tx.get_by_id(node_id).await?.and_then(|n| n.parent_id);
        }

        Ok(false)
    }
}
