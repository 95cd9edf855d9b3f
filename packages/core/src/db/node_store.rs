//! NodeStore Trait - Database Abstraction Layer
//!
//! This module defines the `NodeStore` and `NodeTransaction` traits that
//! abstract node persistence. The tree engine only talks to these traits, so
//! the libsql backend ([`TursoStore`](crate::db::TursoStore)) and the
//! in-process backend ([`MemoryStore`](crate::db::MemoryStore)) are
//! interchangeable.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async so file-backed and networked
//!    backends share one interface
//! 2. **Transactions are values**: every read-then-write sequence of the engine
//!    (root check + insert, parent check + insert, order computation + insert,
//!    children walk + delete) runs on one `NodeTransaction`
//! 3. **Exclusive writers**: `begin()` returns a transaction that already holds
//!    the write lock, so two transactions can never both pass the same check
//! 4. **Drop = rollback**: a transaction that is neither committed nor rolled
//!    back leaves no trace
//!
//! # Examples
//!
//! ```rust,no_run
//! use nodetree_core::db::{MemoryStore, NodeStore};
//! use nodetree_core::models::NewNode;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::new();
//!
//!     let mut tx = store.begin().await?;
//!     let order = tx.next_order(None).await?;
//!     let root = tx.insert(NewNode::new("root", None), order).await?;
//!     tx.commit().await?;
//!
//!     assert_eq!(store.get_by_id(root.id).await?, Some(root));
//!     Ok(())
//! }
//! ```

use crate::db::DatabaseError;
use crate::models::{NewNode, Node, NodeId, NodeUpdate};
use async_trait::async_trait;

/// Abstraction layer for node persistence
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so one store can be shared by
/// concurrent request handlers.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Every node, ordered by `order` ascending, then `id` ascending
    ///
    /// Siblings come out in display order; callers rebuild the hierarchy
    /// from `parent_id`.
    async fn get_all(&self) -> Result<Vec<Node>, DatabaseError>;

    /// Get node by ID (`Ok(None)` when it doesn't exist)
    async fn get_by_id(&self, id: NodeId) -> Result<Option<Node>, DatabaseError>;

    /// Open an exclusive write transaction
    async fn begin(&self) -> Result<Box<dyn NodeTransaction>, DatabaseError>;
}

/// One atomic unit of work against the node table
///
/// All reads observe the writes made earlier in the same transaction.
#[async_trait]
pub trait NodeTransaction: Send {
    /// Get node by ID (`Ok(None)` when it doesn't exist)
    async fn get_by_id(&mut self, id: NodeId) -> Result<Option<Node>, DatabaseError>;

    /// True iff a node with `parent_id = NULL` exists
    async fn exists_root(&mut self) -> Result<bool, DatabaseError>;

    /// `MAX(order) + 1` among children of `parent_id`, or 1 if there are none
    ///
    /// `None` addresses the root level.
    async fn next_order(&mut self, parent_id: Option<NodeId>) -> Result<i64, DatabaseError>;

    /// IDs of the direct children of `parent_id`, in sibling order
    async fn child_ids(&mut self, parent_id: NodeId) -> Result<Vec<NodeId>, DatabaseError>;

    /// Insert a node with the given sibling order; the store assigns the id
    async fn insert(&mut self, node: NewNode, order: i64) -> Result<Node, DatabaseError>;

    /// Partial update; omitted fields keep their prior value
    ///
    /// Returns `Ok(None)` if no node has `id`.
    async fn update(
        &mut self,
        id: NodeId,
        update: &NodeUpdate,
    ) -> Result<Option<Node>, DatabaseError>;

    /// Delete one node; returns `false` if it did not exist
    async fn delete(&mut self, id: NodeId) -> Result<bool, DatabaseError>;

    /// Make all writes of this transaction visible
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;

    /// Discard all writes of this transaction
    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError>;
}
