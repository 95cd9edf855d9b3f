//! Database Error Types
//!
//! This module defines error types for database operations, providing
//! clear error handling for connection, initialization, and query failures.

use std::path::PathBuf;
use thiserror::Error;

/// SQLite primary result codes the store cares about
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;
const SQLITE_CONSTRAINT: i32 = 19;

/// Database operation errors
///
/// Covers connection, initialization and statement failures. Business rule
/// violations are reported by the service layer, not here.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Permission denied when accessing database
    #[error("Permission denied for database path: {path}")]
    PermissionDenied { path: PathBuf },

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}: {source}")]
    SqlExecutionError {
        context: String,
        source: libsql::Error,
    },

    /// Write refused by a store constraint (backends without SQL error codes)
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Stored row could not be converted into a node
    #[error("Invalid row data: {0}")]
    InvalidRow(String),

    /// Transaction used after commit/rollback
    #[error("Transaction already finished")]
    TransactionFinished,
}

impl DatabaseError {
    /// Create a connection failed error
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create a permission denied error
    pub fn permission_denied(path: PathBuf) -> Self {
        Self::PermissionDenied { path }
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>, source: libsql::Error) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
            source,
        }
    }

    /// Create a constraint violation error
    pub fn constraint_violation(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }

    /// Create an invalid row error
    pub fn invalid_row(msg: impl Into<String>) -> Self {
        Self::InvalidRow(msg.into())
    }

    fn libsql_source(&self) -> Option<&libsql::Error> {
        match self {
            Self::ConnectionFailed { source, .. } | Self::SqlExecutionError { source, .. } => {
                Some(source)
            }
            Self::LibsqlError(source) => Some(source),
            _ => None,
        }
    }

    fn primary_code(&self) -> Option<i32> {
        match self.libsql_source()? {
            libsql::Error::SqliteFailure(code, _) => Some(code & 0xff),
            _ => None,
        }
    }

    /// Lock contention that may succeed if the whole transaction is re-run
    pub fn is_transient(&self) -> bool {
        if let Some(code) = self.primary_code() {
            return code == SQLITE_BUSY || code == SQLITE_LOCKED;
        }
        self.libsql_source()
            .map(|e| {
                let msg = e.to_string();
                msg.contains("database is locked") || msg.contains("database table is locked")
            })
            .unwrap_or(false)
    }

    /// UNIQUE / FOREIGN KEY / CHECK constraint refused the write
    pub fn is_constraint_violation(&self) -> bool {
        if matches!(self, Self::ConstraintViolation(_)) {
            return true;
        }
        if let Some(code) = self.primary_code() {
            return code == SQLITE_CONSTRAINT;
        }
        self.libsql_source()
            .map(|e| e.to_string().contains("constraint failed"))
            .unwrap_or(false)
    }
}
