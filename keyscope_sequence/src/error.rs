// Copyright 2025 the Keyscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by [`IndexedSequence`](crate::IndexedSequence).

use keyscope_partition::PartitionError;

use crate::model::KeyRef;
use crate::types::GroupId;

/// Failures of sequence index operations. All of them are caller or
/// bookkeeping errors; none is meant to be shown to a user.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SequenceError {
    /// A partition tree refused an operation.
    #[error(transparent)]
    Partition(#[from] PartitionError),
    /// The group id does not exist (stale after a rebuild).
    #[error("unknown group {0:?}")]
    UnknownGroup(GroupId),
    /// The group's keyframe no longer exists in the sequence.
    #[error("keyframe {0:?} is missing from the sequence")]
    MissingKeyframe(KeyRef),
    /// An edit is already active; finish it with `end_edit` first.
    #[error("group {active:?} is still being edited")]
    EditInProgress {
        /// The group of the active edit.
        active: GroupId,
    },
    /// `end_edit` was called with no active edit.
    #[error("no edit is active")]
    NoActiveEdit,
    /// `end_edit` named a different group than `begin_edit`.
    #[error("edit of {active:?} cannot be ended through {requested:?}")]
    EditMismatch {
        /// The group of the active edit.
        active: GroupId,
        /// The group passed to `end_edit`.
        requested: GroupId,
    },
}
