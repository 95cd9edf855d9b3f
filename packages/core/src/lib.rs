//! NodeTree Core
//!
//! Storage and business rules for a single-rooted, ordered tree of named
//! nodes.
//!
//! # Architecture
//!
//! - **One root**: the first node inserted without a parent is the root;
//!   it can be renamed but never moved or deleted
//! - **Ordered siblings**: each insert is appended after the current last
//!   sibling, inside the same transaction as the insert
//! - **libsql/Turso**: embedded SQLite-compatible database; the schema
//!   itself refuses a second root and orphaned nodes
//!
//! # Modules
//!
//! - [`models`] - Data structures (Node, NodeUpdate, TreeNode, ...)
//! - [`db`] - Database layer with libsql integration and an in-memory store
//! - [`services`] - Tree engine (`TreeService`) and retry policy
//! - [`config`] - Runtime configuration from the environment

pub mod config;
pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::{DeletePolicy, TreeConfig};
pub use db::{DatabaseError, DatabaseService, MemoryStore, NodeStore, TursoStore};
pub use models::*;
pub use services::*;
