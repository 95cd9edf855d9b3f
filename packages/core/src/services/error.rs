//! Service Layer Error Types
//!
//! This module defines the errors returned by tree operations. Every error
//! falls into one [`ErrorKind`], which the HTTP layer maps to a status code.

use crate::db::DatabaseError;
use crate::models::{DepthLimitExceeded, NodeId, ValidationError};
use thiserror::Error;

/// Coarse classification of a [`TreeServiceError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    /// The request is valid but the result exceeds a configured limit
    Limit,
    Storage,
}

/// A mutation that would break the tree structure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeConflict {
    #[error("A root node already exists")]
    RootExists,

    #[error("Cannot change the parent of root node {id}")]
    RootReparent { id: NodeId },

    #[error("Cannot move node {id} under {parent_id}: it is the node itself or one of its descendants")]
    Cycle { id: NodeId, parent_id: NodeId },

    #[error("Node {id} has children")]
    HasChildren { id: NodeId },

    #[error("Cannot delete root node {id}")]
    RootDelete { id: NodeId },
}

/// Tree operation errors
///
/// Validation, not-found and conflict errors are never retried. Storage
/// errors are retried internally while transient, then surfaced.
#[derive(Error, Debug)]
pub enum TreeServiceError {
    /// Input failed validation
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Node (or referenced parent) not found by ID
    #[error("Node not found: {id}")]
    NotFound { id: NodeId },

    /// Structural conflict
    #[error("Conflict: {0}")]
    Conflict(#[from] TreeConflict),

    /// Nested read refused: the tree is deeper than `TreeConfig::max_tree_depth`
    #[error("{0}")]
    TooDeep(#[from] DepthLimitExceeded),

    /// Database operation failed
    #[error("Database operation failed: {0}")]
    Storage(#[from] DatabaseError),
}

impl TreeServiceError {
    /// Create a node not found error
    pub fn not_found(id: NodeId) -> Self {
        Self::NotFound { id }
    }

    /// Create a root exists conflict
    pub fn root_exists() -> Self {
        Self::Conflict(TreeConflict::RootExists)
    }

    pub fn root_reparent(id: NodeId) -> Self {
        Self::Conflict(TreeConflict::RootReparent { id })
    }

    pub fn cycle(id: NodeId, parent_id: NodeId) -> Self {
        Self::Conflict(TreeConflict::Cycle { id, parent_id })
    }

    pub fn has_children(id: NodeId) -> Self {
        Self::Conflict(TreeConflict::HasChildren { id })
    }

    pub fn root_delete(id: NodeId) -> Self {
        Self::Conflict(TreeConflict::RootDelete { id })
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::TooDeep(_) => ErrorKind::Limit,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether re-running the whole transaction may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_transient())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            TreeServiceError::from(ValidationError::EmptyTitle).kind(),
            ErrorKind::Validation
        );
        assert_eq!(TreeServiceError::not_found(4).kind(), ErrorKind::NotFound);
        assert_eq!(TreeServiceError::root_delete(1).kind(), ErrorKind::Conflict);
        assert_eq!(
            TreeServiceError::from(DepthLimitExceeded { max_depth: 3 }).kind(),
            ErrorKind::Limit
        );
        assert_eq!(
            TreeServiceError::from(DatabaseError::TransactionFinished).kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn test_only_locked_storage_is_transient() {
        let busy = TreeServiceError::from(DatabaseError::sql_execution(
            "Failed to begin transaction",
            libsql::Error::SqliteFailure(5, "database is locked".to_string()),
        ));
        assert!(busy.is_transient());
        assert!(!TreeServiceError::root_exists().is_transient());
        assert!(!TreeServiceError::not_found(1).is_transient());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            TreeServiceError::cycle(2, 5).to_string(),
            "Conflict: Cannot move node 2 under 5: it is the node itself or one of its descendants"
        );
        assert_eq!(TreeServiceError::not_found(9).to_string(), "Node not found: 9");
    }
}
