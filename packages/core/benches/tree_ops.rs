//! Performance benchmarks for NodeTree core operations
//!
//! Run with: `cargo bench -p nodetree-core`
//!
//! These benchmarks measure the critical paths:
//! - Sibling insert (root check, parent check, order computation, insert)
//! - Cascade delete of a subtree
//! - Nested tree shaping from the flat node list

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nodetree_core::db::{DatabaseService, NodeStore, TursoStore};
use nodetree_core::services::{RetryConfig, TreeService};
use nodetree_core::config::DEFAULT_MAX_TREE_DEPTH;
use nodetree_core::{Node, TreeConfig, TreeNode};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::runtime::Runtime;

/// Setup a test service with a fresh database
async fn setup_test_service() -> (TreeService, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("bench.db");

    let db = Arc::new(DatabaseService::new(db_path).await.unwrap());
    let store: Arc<dyn NodeStore> = Arc::new(TursoStore::new(db));
    let service = TreeService::new(store, TreeConfig::default().with_retry(RetryConfig::test()));
    (service, temp_dir)
}

/// Flat node list for a tree with `fanout` children per node, `depth` levels deep
fn generate_flat_tree(fanout: usize, depth: usize) -> Vec<Node> {
    let now = chrono::Utc::now();
    let mut nodes = vec![Node {
        id: 1,
        title: "root".to_string(),
        parent_id: None,
        order: 1,
        created_at: now,
        modified_at: now,
    }];
    let mut level = vec![1];
    for _ in 0..depth {
        let mut next_level = Vec::new();
        for parent in level {
            for order in 1..=fanout {
                let id = nodes.len() as i64 + 1;
                nodes.push(Node {
                    id,
                    title: format!("node {}", id),
                    parent_id: Some(parent),
                    order: order as i64,
                    created_at: now,
                    modified_at: now,
                });
                next_level.push(id);
            }
        }
        level = next_level;
    }
    nodes
}

/// Benchmark appending siblings under one parent
fn bench_insert_sibling(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("insert_sibling", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let (service, _temp) = setup_test_service().await;
                let root = service.insert_node("Root", None).await.unwrap();

                let start = std::time::Instant::now();
                for i in 0..iters {
                    service
                        .insert_node(format!("Child{}", i), Some(root.id))
                        .await
                        .unwrap();
                }
                start.elapsed()
            })
        });
    });
}

/// Benchmark cascade delete of a 40-node subtree
fn bench_cascade_delete(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("cascade_delete");
    group.sample_size(10); // Fewer samples for expensive setup

    group.bench_function("subtree_40", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let (service, _temp) = setup_test_service().await;
                let root = service.insert_node("Root", None).await.unwrap();
                let mut total = std::time::Duration::ZERO;

                for _ in 0..iters {
                    let branch = service.insert_node("Branch", Some(root.id)).await.unwrap();
                    for i in 0..3 {
                        let child = service
                            .insert_node(format!("Child{}", i), Some(branch.id))
                            .await
                            .unwrap();
                        for j in 0..12 {
                            service
                                .insert_node(format!("Leaf{}", j), Some(child.id))
                                .await
                                .unwrap();
                        }
                    }

                    let start = std::time::Instant::now();
                    service.delete_node(branch.id).await.unwrap();
                    total += start.elapsed();
                }

                total
            })
        });
    });

    group.finish();
}

/// Benchmark nesting ~1100 flat nodes into a tree
fn bench_tree_build(c: &mut Criterion) {
    let nodes = generate_flat_tree(10, 3);

    c.bench_function("tree_build_1111", |b| {
        b.iter(|| TreeNode::build(black_box(nodes.clone()), DEFAULT_MAX_TREE_DEPTH))
    });
}

criterion_group!(
    benches,
    bench_insert_sibling,
    bench_cascade_delete,
    bench_tree_build
);
criterion_main!(benches);
