//! Business Services
//!
//! - `TreeService` - validated, transactional tree mutations and reads
//! - `retry` - exponential backoff for transactions that hit a locked database
//!
//! Services sit between the database layer and the HTTP surface and own
//! every tree invariant.

pub mod error;
pub mod retry;
pub mod tree_service;

pub use error::{ErrorKind, TreeConflict, TreeServiceError};
pub use retry::RetryConfig;
pub use tree_service::TreeService;
