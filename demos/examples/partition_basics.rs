// Copyright 2025 the Keyscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Partition tree basics: split on insert, join on remove, pooled nodes.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p keyscope_demos --example partition_basics`

use keyscope_partition::{NodeKind, PartitionTree, Quad};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn dump(tree: &PartitionTree<&'static str>) {
    tree.visit(|node| {
        let indent = "  ".repeat(node.depth as usize);
        match node.kind {
            NodeKind::Leaf(bucket) => {
                let names: Vec<_> = bucket.iter().filter_map(|&k| tree.payload(k)).collect();
                println!(
                    "{indent}leaf {:?} @ ({}, {}) {}x{} {:?}",
                    node.id,
                    node.quad.x,
                    node.quad.y,
                    node.quad.width(),
                    node.quad.height(),
                    names
                );
            }
            NodeKind::Internal(_) => println!("{indent}split {:?}", node.id),
        }
    });
}

fn main() {
    init_tracing();

    let mut tree = PartitionTree::new(Quad::from_origin_size(0.0, 0.0, 5000.0, 5000.0));
    let a = tree.insert(0.0, 0.0, "a").unwrap();
    let b = tree.insert(10.0, 0.0, "b").unwrap();
    let c = tree.insert(3000.0, 3000.0, "c").unwrap();
    let d = tree.insert(12.0, 4.0, "d").unwrap();

    println!("== After four inserts ==");
    dump(&tree);
    println!(
        "nodes in use: {}, pooled: {}",
        tree.node_count(),
        tree.reclaimed_nodes()
    );

    // Equidistant from "a" and "b": the first inserted wins.
    println!("closest to (5, 0): {:?}", tree.closest(5.0, 0.0, 20.0, 1.0, 1.0));

    for key in [d, c, b] {
        tree.remove(key).unwrap();
    }
    println!("== After removing down to one element ==");
    dump(&tree);
    println!(
        "nodes in use: {}, pooled: {}",
        tree.node_count(),
        tree.reclaimed_nodes()
    );
    assert!(tree.node(tree.root()).unwrap().is_leaf());
    assert_eq!(tree.len(), 1);
    assert!(tree.contains(a));
    tree.check_invariants().unwrap();
}
