//! Database Layer
//!
//! This module handles node persistence:
//!
//! - Database initialization and connection management (`DatabaseService`)
//! - The `NodeStore` / `NodeTransaction` abstraction used by the tree engine
//! - `TursoStore`: libsql (SQLite-compatible) backend
//! - `MemoryStore`: in-process backend with the same constraints
//!
//! # Architecture
//!
//! The schema itself refuses a second root, orphans and blank titles, so a
//! bug above this layer cannot corrupt the tree; the service layer checks
//! the same rules first to report typed errors.

mod database;
mod error;
mod memory_store;
mod node_store;
mod turso_store;

pub use database::{DatabaseService, DEFAULT_BUSY_TIMEOUT_MS};
pub use error::DatabaseError;
pub use memory_store::{MemoryStore, MemoryTransaction};
pub use node_store::{NodeStore, NodeTransaction};
pub use turso_store::{TursoStore, TursoTransaction};
