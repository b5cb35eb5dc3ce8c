// Copyright 2025 the Keyscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=keyscope_partition --heading-base-level=0

//! Keyscope Partition: a pooled quadrant tree for interactive point picking.
//!
//! Keyscope Partition indexes a few hundred editor handles (keyframe markers,
//! curve nodes, Bézier handles) and answers "closest point within radius"
//! queries while those points are dragged around.
//!
//! - Leaves hold a tiny bucket (two elements by default) and split into four
//!   quadrants when a full leaf receives another element, until quads reach a
//!   minimum size; below that buckets overflow in place.
//! - Removals join subtrees back into a leaf once at most `capacity - 1`
//!   elements remain, so an element nudged across a boundary does not make the
//!   tree split and join on every frame.
//! - Nodes freed by joins are kept in a free-list and reused by later splits.
//! - Elements can be *evicted* (kept alive, but out of every bucket) and
//!   reinserted, which is how a drag takes a point out of the index while it
//!   moves.
//! - Queries take a per-axis scale, so one tree serves every zoom level.
//!
//! It is not a general R-tree: it stores points, not boxes, and its root never
//! grows. Size the root generously; out-of-bounds inserts are rejected.
//!
//! # Example
//!
//! ```rust
//! use keyscope_partition::{PartitionTree, Quad};
//!
//! let mut tree: PartitionTree<&str> =
//!     PartitionTree::new(Quad::from_origin_size(0.0, 0.0, 5000.0, 5000.0));
//! let a = tree.insert(0.0, 0.0, "a").unwrap();
//! let _b = tree.insert(10.0, 0.0, "b").unwrap();
//! let _c = tree.insert(2000.0, 2000.0, "c").unwrap();
//!
//! // The third insert split the root.
//! assert!(!tree.node(tree.root()).unwrap().is_leaf());
//!
//! // Equidistant elements: the first inserted wins.
//! assert_eq!(tree.closest(5.0, 0.0, 20.0, 1.0, 1.0), Some((a, "a")));
//!
//! // Take `a` out of the index while it is being dragged, then put it back.
//! tree.evict(a).unwrap();
//! tree.set_position(a, 40.0, 0.0).unwrap();
//! assert_eq!(tree.closest(0.0, 0.0, 5.0, 1.0, 1.0), None);
//! tree.reinsert(a).unwrap();
//! assert_eq!(tree.closest(40.0, 0.0, 5.0, 1.0, 1.0), Some((a, "a")));
//! ```
//!
//! ## Errors
//!
//! Every operation that can observe a broken protocol (stale key, evicting an
//! evicted element, an element missing from the bucket its back-reference names)
//! returns a [`PartitionError`] instead of ignoring it.
//! [`PartitionTree::check_invariants`] walks the whole structure and is meant for
//! tests and debug builds.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod error;
pub mod tree;
pub mod types;

pub use error::PartitionError;
pub use tree::{NodeKind, NodeView, PartitionTree};
pub use types::{ElementKey, NodeId, PartitionConfig, Quad};
