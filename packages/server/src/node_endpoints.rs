//! Node Endpoints
//!
//! # Endpoints
//!
//! - `GET /api/health` - Health check endpoint
//! - `GET /api/nodes` - All nodes, ordered by sibling order
//! - `GET /api/nodes/tree` - Nested tree from the root (`null` when empty)
//! - `GET /api/nodes/:id` - Get a node by ID
//! - `POST /api/nodes` - Insert a node
//! - `PUT /api/nodes/:id` - Partially update a node
//! - `DELETE /api/nodes/:id` - Delete a node

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;

use crate::{AppState, HttpError};
use nodetree_core::models::{parse_node_id, NewNode, Node, NodeId, NodeUpdate, TreeNode};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
///
/// ```bash
/// curl http://localhost:5000/api/health
/// ```
async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn list_nodes(State(state): State<AppState>) -> Result<Json<Vec<Node>>, HttpError> {
    Ok(Json(state.tree.list_nodes().await?))
}

/// Node id from the `:id` path segment
fn node_id(segment: Result<Path<String>, PathRejection>) -> Result<NodeId, HttpError> {
    let Path(raw) = segment?;
    Ok(parse_node_id(&raw)?)
}

/// Nested tree from the root
///
/// Responds `422 TREE_TOO_DEEP` when the tree is deeper than the configured
/// limit; `GET /api/nodes` still lists every node.
async fn get_tree(State(state): State<AppState>) -> Result<Json<Option<TreeNode>>, HttpError> {
    Ok(Json(state.tree.get_tree().await?))
}

async fn get_node(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<Node>, HttpError> {
    let id = node_id(id)?;
    Ok(Json(state.tree.get_node(id).await?))
}

/// Insert a node
///
/// A missing or `null` `parent_id` creates the root, which only succeeds on
/// an empty tree.
///
/// ```bash
/// curl -X POST http://localhost:5000/api/nodes \
///   -H "Content-Type: application/json" \
///   -d '{"title": "Chapter 1", "parent_id": 1}'
/// ```
async fn create_node(
    State(state): State<AppState>,
    payload: Result<Json<NewNode>, JsonRejection>,
) -> Result<(StatusCode, Json<Node>), HttpError> {
    let Json(new_node) = payload?;
    let node = state
        .tree
        .insert_node(new_node.title, new_node.parent_id)
        .await?;

    tracing::debug!("✅ Created node: {}", node.id);
    Ok((StatusCode::CREATED, Json(node)))
}

/// Update an existing node
///
/// Only the supplied fields change.
///
/// ```bash
/// curl -X PUT http://localhost:5000/api/nodes/2 \
///   -H "Content-Type: application/json" \
///   -d '{"title": "Renamed", "order": 3}'
/// ```
async fn update_node(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<NodeUpdate>, JsonRejection>,
) -> Result<Json<Node>, HttpError> {
    let id = node_id(id)?;
    let Json(update) = payload?;
    tracing::info!("📝 UPDATE request for node: {} with update: {:?}", id, update);

    Ok(Json(state.tree.update_node(id, update).await?))
}

/// Delete a node (and, under the cascade policy, its descendants)
///
/// ```bash
/// curl -X DELETE http://localhost:5000/api/nodes/2
/// ```
async fn delete_node(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, HttpError> {
    let id = node_id(id)?;
    let result = state.tree.delete_node(id).await?;

    tracing::debug!("✅ Deleted nodes: {:?}", result.deleted_ids);
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/nodes", get(list_nodes).post(create_node))
        .route("/api/nodes/tree", get(get_tree))
        .route(
            "/api/nodes/:id",
            get(get_node).put(update_node).delete(delete_node),
        )
        .with_state(state)
}
