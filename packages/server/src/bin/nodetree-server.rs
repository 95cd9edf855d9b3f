//! NodeTree HTTP Server Binary
//!
//! Opens (or creates) the tree database and serves the REST API.
//! See the `nodetree_server` crate docs for environment variables.

use std::sync::Arc;

use nodetree_core::db::{DatabaseService, NodeStore, TursoStore};
use nodetree_core::{TreeConfig, TreeService};
use nodetree_server::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("🌳 NodeTree Server");

    let tree_config = TreeConfig::from_env()?;
    let server_config = ServerConfig::from_env()?;

    tracing::info!("📦 Database: {}", tree_config.database_path.display());
    tracing::info!("🗑️  Delete policy: {}", tree_config.delete_policy);

    let db = Arc::new(
        DatabaseService::with_busy_timeout(
            tree_config.database_path.clone(),
            tree_config.busy_timeout_ms,
        )
        .await?,
    );
    let store: Arc<dyn NodeStore> = Arc::new(TursoStore::new(db.clone()));
    let tree = TreeService::new(store, tree_config);

    tracing::info!("✅ Services initialized");

    start_server(tree, server_config).await?;

    // Leave a self-contained database file behind
    db.checkpoint().await?;
    Ok(())
}
