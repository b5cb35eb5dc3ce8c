// Copyright 2025 the Keyscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by [`PartitionTree`](crate::PartitionTree).

use crate::types::{ElementKey, NodeId};

/// Failures of partition tree operations.
///
/// Apart from [`OutOfBounds`](Self::OutOfBounds), every variant is a programmer
/// error: the caller used a stale key, broke the evict/reinsert protocol, or the
/// tree's bookkeeping is corrupt. They are reported instead of ignored so a broken
/// edit protocol shows up where it happens, not later as a wrong pick.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum PartitionError {
    /// The key does not name a live element (removed, cleared, or reused slot).
    #[error("stale element key {0:?}")]
    StaleKey(ElementKey),
    /// The position lies outside the root rectangle. Roots are never grown.
    #[error("position ({x}, {y}) lies outside the partition bounds")]
    OutOfBounds {
        /// Rejected x.
        x: f64,
        /// Rejected y.
        y: f64,
    },
    /// The element is evicted, so it cannot be evicted again.
    #[error("element {0:?} is not placed in any partition")]
    NotPlaced(ElementKey),
    /// The element is already placed, so it cannot be reinserted.
    #[error("element {0:?} is already placed")]
    AlreadyPlaced(ElementKey),
    /// The element's back-reference names a leaf whose bucket does not hold it.
    #[error("element {key:?} claims membership of {node:?} but is not in its bucket")]
    MissingFromBucket {
        /// The element being detached.
        key: ElementKey,
        /// The leaf its back-reference points at.
        node: NodeId,
    },
    /// A structural invariant does not hold.
    #[error("partition tree corrupted: {0}")]
    Corrupted(&'static str),
}
