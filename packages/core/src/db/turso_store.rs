//! TursoStore - NodeStore Implementation for the libsql Backend
//!
//! Thin layer over [`DatabaseService`] that turns node-table rows into
//! [`Node`] values and maps each [`NodeTransaction`] onto one SQLite
//! transaction.
//!
//! # Transactions
//!
//! `begin()` opens a dedicated connection and issues `BEGIN IMMEDIATE`, which
//! takes the database write lock before the first read. A second writer waits
//! (up to the busy timeout) until the first commits, so a check it performs
//! always sees the first writer's result. If the transaction value is dropped
//! without `commit()`, closing its connection rolls the transaction back.
//!
//! # Examples
//!
//! ```rust,no_run
//! use nodetree_core::db::{DatabaseService, NodeStore, TursoStore};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/test.db")).await?);
//!     let store: Arc<dyn NodeStore> = Arc::new(TursoStore::new(db));
//!
//!     let nodes = store.get_all().await?;
//!     println!("{} nodes", nodes.len());
//!     Ok(())
//! }
//! ```

use crate::db::node_store::{NodeStore, NodeTransaction};
use crate::db::{DatabaseError, DatabaseService};
use crate::models::{NewNode, Node, NodeId, NodeUpdate};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::{Connection, Row, Rows};
use std::sync::Arc;

/// Column list matching [`TursoStore::row_to_node`]
const NODE_COLUMNS: &str = "id, title, parent_id, ordering, created_at, modified_at";

/// TursoStore implements NodeStore for the libsql backend
#[derive(Debug, Clone)]
pub struct TursoStore {
    db: Arc<DatabaseService>,
}

impl TursoStore {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Underlying database service
    pub fn database(&self) -> &Arc<DatabaseService> {
        &self.db
    }

    /// Parse timestamp from database - handles both SQLite and RFC3339 formats
    ///
    /// SQLite CURRENT_TIMESTAMP returns: "YYYY-MM-DD HH:MM:SS"
    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }

        Err(DatabaseError::invalid_row(format!(
            "Unable to parse timestamp '{}' as SQLite or RFC3339 format",
            s
        )))
    }

    /// Convert libsql::Row to Node
    ///
    /// Expected columns (in order): id, title, parent_id, ordering,
    /// created_at, modified_at
    fn row_to_node(row: &Row) -> Result<Node, DatabaseError> {
        let id: i64 = row.get(0)?;
        let title: String = row.get(1)?;
        let parent_id: Option<i64> = row.get(2)?;
        let order: i64 = row.get(3)?;
        let created_at_str: String = row.get(4)?;
        let modified_at_str: String = row.get(5)?;

        Ok(Node {
            id,
            title,
            parent_id,
            order,
            created_at: Self::parse_timestamp(&created_at_str)?,
            modified_at: Self::parse_timestamp(&modified_at_str)?,
        })
    }

    async fn collect_nodes(mut rows: Rows, context: &str) -> Result<Vec<Node>, DatabaseError> {
        let mut nodes = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(context, e))?
        {
            nodes.push(Self::row_to_node(&row)?);
        }
        Ok(nodes)
    }

    async fn fetch_node(conn: &Connection, id: NodeId) -> Result<Option<Node>, DatabaseError> {
        let rows = conn
            .query(
                &format!("SELECT {} FROM nodes WHERE id = ?", NODE_COLUMNS),
                [id],
            )
            .await
            .map_err(|e| DatabaseError::sql_execution("Failed to execute get_node query", e))?;

        Ok(Self::collect_nodes(rows, "Failed to read node row")
            .await?
            .into_iter()
            .next())
    }
}

#[async_trait]
impl NodeStore for TursoStore {
    async fn get_all(&self) -> Result<Vec<Node>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        let rows = conn
            .query(
                &format!(
                    "SELECT {} FROM nodes ORDER BY ordering ASC, id ASC",
                    NODE_COLUMNS
                ),
                (),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution("Failed to query nodes", e))?;

        Self::collect_nodes(rows, "Failed to read node rows").await
    }

    async fn get_by_id(&self, id: NodeId) -> Result<Option<Node>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        Self::fetch_node(&conn, id).await
    }

    async fn begin(&self) -> Result<Box<dyn NodeTransaction>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        conn.execute("BEGIN IMMEDIATE", ())
            .await
            .map_err(|e| DatabaseError::sql_execution("Failed to begin transaction", e))?;

        Ok(Box::new(TursoTransaction {
            conn,
            finished: false,
        }))
    }
}

/// One `BEGIN IMMEDIATE` transaction on a dedicated connection
pub struct TursoTransaction {
    conn: Connection,
    finished: bool,
}

impl TursoTransaction {
    fn ensure_open(&self) -> Result<(), DatabaseError> {
        if self.finished {
            return Err(DatabaseError::TransactionFinished);
        }
        Ok(())
    }
}

#[async_trait]
impl NodeTransaction for TursoTransaction {
    async fn get_by_id(&mut self, id: NodeId) -> Result<Option<Node>, DatabaseError> {
        self.ensure_open()?;
        TursoStore::fetch_node(&self.conn, id).await
    }

    async fn exists_root(&mut self) -> Result<bool, DatabaseError> {
        self.ensure_open()?;

        let mut rows = self
            .conn
            .query("SELECT EXISTS(SELECT 1 FROM nodes WHERE parent_id IS NULL)", ())
            .await
            .map_err(|e| DatabaseError::sql_execution("Failed to check for root node", e))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution("Failed to check for root node", e))?
            .ok_or_else(|| DatabaseError::invalid_row("EXISTS returned no row"))?;
        let exists: i64 = row.get(0)?;
        Ok(exists != 0)
    }

    async fn next_order(&mut self, parent_id: Option<NodeId>) -> Result<i64, DatabaseError> {
        self.ensure_open()?;

        let mut rows = self
            .conn
            .query(
                "SELECT COALESCE(MAX(ordering), 0) + 1 FROM nodes WHERE parent_id IS ?",
                [parent_id],
            )
            .await
            .map_err(|e| DatabaseError::sql_execution("Failed to compute next order", e))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution("Failed to compute next order", e))?
            .ok_or_else(|| DatabaseError::invalid_row("MAX(ordering) returned no row"))?;
        Ok(row.get(0)?)
    }

    async fn child_ids(&mut self, parent_id: NodeId) -> Result<Vec<NodeId>, DatabaseError> {
        self.ensure_open()?;

        let mut rows = self
            .conn
            .query(
                "SELECT id FROM nodes WHERE parent_id = ? ORDER BY ordering ASC, id ASC",
                [parent_id],
            )
            .await
            .map_err(|e| DatabaseError::sql_execution("Failed to query children", e))?;

        let mut ids = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution("Failed to read child row", e))?
        {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    async fn insert(&mut self, node: NewNode, order: i64) -> Result<Node, DatabaseError> {
        self.ensure_open()?;

        self.conn
            .execute(
                "INSERT INTO nodes (title, parent_id, ordering) VALUES (?, ?, ?)",
                (node.title.as_str(), node.parent_id, order),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution("Failed to insert node", e))?;

        let id = self.conn.last_insert_rowid();
        TursoStore::fetch_node(&self.conn, id)
            .await?
            .ok_or_else(|| DatabaseError::invalid_row(format!("Node {} not found after insert", id)))
    }

    async fn update(
        &mut self,
        id: NodeId,
        update: &NodeUpdate,
    ) -> Result<Option<Node>, DatabaseError> {
        self.ensure_open()?;

        let Some(mut node) = TursoStore::fetch_node(&self.conn, id).await? else {
            return Ok(None);
        };
        if update.is_empty() {
            return Ok(Some(node));
        }
        update.apply_to(&mut node);

        self.conn
            .execute(
                "UPDATE nodes SET title = ?, parent_id = ?, ordering = ?, modified_at = CURRENT_TIMESTAMP WHERE id = ?",
                (node.title.as_str(), node.parent_id, node.order, id),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution("Failed to update node", e))?;

        TursoStore::fetch_node(&self.conn, id).await
    }

    async fn delete(&mut self, id: NodeId) -> Result<bool, DatabaseError> {
        self.ensure_open()?;

        let rows_affected = self
            .conn
            .execute("DELETE FROM nodes WHERE id = ?", [id])
            .await
            .map_err(|e| DatabaseError::sql_execution("Failed to delete node", e))?;

        Ok(rows_affected > 0)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), DatabaseError> {
        self.ensure_open()?;
        self.finished = true;

        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            if let Err(rollback_err) = self.conn.execute("ROLLBACK", ()).await {
                tracing::warn!("Rollback after failed commit also failed: {}", rollback_err);
            }
            return Err(DatabaseError::sql_execution(
                "Failed to commit transaction",
                e,
            ));
        }
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), DatabaseError> {
        self.ensure_open()?;
        self.finished = true;

        self.conn
            .execute("ROLLBACK", ())
            .await
            .map_err(|e| DatabaseError::sql_execution("Failed to roll back transaction", e))?;
        Ok(())
    }
}

impl Drop for TursoTransaction {
    fn drop(&mut self) {
        if !self.finished {
            // Closing the connection discards the open transaction.
            tracing::debug!("Dropping unfinished transaction; SQLite will roll it back");
        }
    }
}
