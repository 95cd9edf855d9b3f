//! MemoryStore - In-process NodeStore
//!
//! Keeps the node table in a `BTreeMap` behind a `tokio::sync::Mutex`. A
//! transaction owns the mutex guard for its whole lifetime, which gives the
//! same one-writer-at-a-time guarantee as `BEGIN IMMEDIATE`, and keeps a
//! snapshot so rollback (or drop) restores the prior state.
//!
//! The same constraints the SQL schema declares are enforced on write: at most
//! one root, parent must exist, a node with children cannot be deleted.

use crate::db::node_store::{NodeStore, NodeTransaction};
use crate::db::DatabaseError;
use crate::models::{NewNode, Node, NodeId, NodeUpdate};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    nodes: BTreeMap<NodeId, Node>,
    last_id: NodeId,
}

impl MemoryState {
    fn has_root_other_than(&self, id: Option<NodeId>) -> bool {
        self.nodes
            .values()
            .any(|n| n.parent_id.is_none() && Some(n.id) != id)
    }

    fn check_parent(&self, parent_id: Option<NodeId>, own_id: Option<NodeId>) -> Result<(), DatabaseError> {
        match parent_id {
            None if self.has_root_other_than(own_id) => Err(DatabaseError::constraint_violation(
                "UNIQUE constraint failed: only one node may have a NULL parent_id",
            )),
            Some(pid) if !self.nodes.contains_key(&pid) => Err(DatabaseError::constraint_violation(
                format!("FOREIGN KEY constraint failed: parent {} does not exist", pid),
            )),
            _ => Ok(()),
        }
    }
}

/// In-memory implementation of [`NodeStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored nodes
    pub async fn len(&self) -> usize {
        self.state.lock().await.nodes.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.nodes.is_empty()
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    async fn get_all(&self) -> Result<Vec<Node>, DatabaseError> {
        let state = self.state.lock().await;
        let mut nodes: Vec<Node> = state.nodes.values().cloned().collect();
        nodes.sort_by_key(|n| (n.order, n.id));
        Ok(nodes)
    }

    async fn get_by_id(&self, id: NodeId) -> Result<Option<Node>, DatabaseError> {
        Ok(self.state.lock().await.nodes.get(&id).cloned())
    }

    async fn begin(&self) -> Result<Box<dyn NodeTransaction>, DatabaseError> {
        let guard = self.state.clone().lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            snapshot: Some(snapshot),
        }))
    }
}

/// Transaction holding the store lock until commit, rollback or drop
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    /// `None` once the transaction is finished
    snapshot: Option<MemoryState>,
}

impl MemoryTransaction {
    fn state(&mut self) -> Result<&mut MemoryState, DatabaseError> {
        if self.snapshot.is_none() {
            return Err(DatabaseError::TransactionFinished);
        }
        Ok(&mut *self.guard)
    }
}

#[async_trait]
impl NodeTransaction for MemoryTransaction {
    async fn get_by_id(&mut self, id: NodeId) -> Result<Option<Node>, DatabaseError> {
        Ok(self.state()?.nodes.get(&id).cloned())
    }

    async fn exists_root(&mut self) -> Result<bool, DatabaseError> {
        Ok(self.state()?.has_root_other_than(None))
    }

    async fn next_order(&mut self, parent_id: Option<NodeId>) -> Result<i64, DatabaseError> {
        let max = self
            .state()?
            .nodes
            .values()
            .filter(|n| n.parent_id == parent_id)
            .map(|n| n.order)
            .max()
            .unwrap_or(0);
        Ok(max + 1)
    }

    async fn child_ids(&mut self, parent_id: NodeId) -> Result<Vec<NodeId>, DatabaseError> {
        let mut children: Vec<(i64, NodeId)> = self
            .state()?
            .nodes
            .values()
            .filter(|n| n.parent_id == Some(parent_id))
            .map(|n| (n.order, n.id))
            .collect();
        children.sort_unstable();
        Ok(children.into_iter().map(|(_, id)| id).collect())
    }

    async fn insert(&mut self, node: NewNode, order: i64) -> Result<Node, DatabaseError> {
        if node.title.trim().is_empty() {
            return Err(DatabaseError::constraint_violation(
                "CHECK constraint failed: title",
            ));
        }

        let state = self.state()?;
        state.check_parent(node.parent_id, None)?;

        state.last_id += 1;
        let now = Utc::now();
        let created = Node {
            id: state.last_id,
            title: node.title,
            parent_id: node.parent_id,
            order,
            created_at: now,
            modified_at: now,
        };
        state.nodes.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(
        &mut self,
        id: NodeId,
        update: &NodeUpdate,
    ) -> Result<Option<Node>, DatabaseError> {
        let state = self.state()?;
        let Some(mut node) = state.nodes.get(&id).cloned() else {
            return Ok(None);
        };
        if update.is_empty() {
            return Ok(Some(node));
        }

        update.apply_to(&mut node);
        if node.title.trim().is_empty() {
            return Err(DatabaseError::constraint_violation(
                "CHECK constraint failed: title",
            ));
        }
        state.check_parent(node.parent_id, Some(id))?;

        node.modified_at = Utc::now();
        state.nodes.insert(id, node.clone());
        Ok(Some(node))
    }

    async fn delete(&mut self, id: NodeId) -> Result<bool, DatabaseError> {
        let state = self.state()?;
        if state.nodes.values().any(|n| n.parent_id == Some(id)) {
            return Err(DatabaseError::constraint_violation(format!(
                "FOREIGN KEY constraint failed: node {} still has children",
                id
            )));
        }
        Ok(state.nodes.remove(&id).is_some())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), DatabaseError> {
        self.state()?;
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), DatabaseError> {
        self.state()?;
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn insert_committed(store: &MemoryStore, title: &str, parent_id: Option<NodeId>) -> Node {
        let mut tx = store.begin().await.unwrap();
        let order = tx.next_order(parent_id).await.unwrap();
        let node = tx.insert(NewNode::new(title, parent_id), order).await.unwrap();
        tx.commit().await.unwrap();
        node
    }

    #[tokio::test]
    async fn test_ids_and_orders_assigned() {
        let store = MemoryStore::new();

        let root = insert_committed(&store, "root", None).await;
        let a = insert_committed(&store, "a", Some(root.id)).await;
        let b = insert_committed(&store, "b", Some(root.id)).await;

        assert_eq!((root.id, root.order), (1, 1));
        assert_eq!((a.id, a.order), (2, 1));
        assert_eq!((b.id, b.order), (3, 2));
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_rollback_restores_snapshot() {
        let store = MemoryStore::new();
        let root = insert_committed(&store, "root", None).await;

        let mut tx = store.begin().await.unwrap();
        tx.insert(NewNode::new("child", Some(root.id)), 1).await.unwrap();
        tx.update(root.id, &NodeUpdate::new().with_title("changed"))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        let nodes = store.get_all().await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].title, "root");
    }

    #[tokio::test]
    async fn test_drop_restores_snapshot() {
        let store = MemoryStore::new();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert(NewNode::new("root", None), 1).await.unwrap();
        }

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let store = MemoryStore::new();
        let root = insert_committed(&store, "root", None).await;
        let child = insert_committed(&store, "child", Some(root.id)).await;

        let mut tx = store.begin().await.unwrap();
        tx.delete(child.id).await.unwrap();
        tx.commit().await.unwrap();

        let next = insert_committed(&store, "next", Some(root.id)).await;
        assert_eq!(next.id, 3);
    }

    #[tokio::test]
    async fn test_constraints_enforced() {
        let store = MemoryStore::new();
        let root = insert_committed(&store, "root", None).await;
        let child = insert_committed(&store, "child", Some(root.id)).await;
        insert_committed(&store, "grandchild", Some(child.id)).await;

        let mut tx = store.begin().await.unwrap();
        let second_root = tx.insert(NewNode::new("other", None), 1).await.unwrap_err();
        assert!(second_root.is_constraint_violation());

        let orphan = tx.insert(NewNode::new("orphan", Some(99)), 1).await.unwrap_err();
        assert!(orphan.is_constraint_violation());

        let has_children = tx.delete(child.id).await.unwrap_err();
        assert!(has_children.is_constraint_violation());
        tx.rollback().await.unwrap();
    }

    #[test]
    fn test_get_all_sorted_by_order_then_id() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let root = insert_committed(&store, "root", None).await;
            let a = insert_committed(&store, "a", Some(root.id)).await;
            let b = insert_committed(&store, "b", Some(root.id)).await;

            let mut tx = store.begin().await.unwrap();
            tx.update(a.id, &NodeUpdate::new().with_order(5)).await.unwrap();
            tx.commit().await.unwrap();

            let ids: Vec<NodeId> = store
                .get_all()
                .await
                .unwrap()
                .into_iter()
                .map(|n| n.id)
                .collect();
            assert_eq!(ids, vec![root.id, b.id, a.id]);
        });
    }
}
