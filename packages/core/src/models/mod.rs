//! Data Models
//!
//! This module contains the data structures used throughout NodeTree:
//!
//! - `Node` - A persisted tree node
//! - `NewNode` / `NodeUpdate` - Write payloads
//! - `TreeNode` - Nested read shape built from the flat node list

mod node;

pub use node::{
    parse_node_id, validate_title, DeleteResult, DepthLimitExceeded, NewNode, Node, NodeId,
    NodeUpdate, TreeNode, ValidationError,
};
