// Copyright 2025 the Keyscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=keyscope_sequence --heading-base-level=0

//! Keyscope Sequence: a pick index over an animation's keyframes.
//!
//! An [`IndexedSequence`] owns an [`AnimSequence`] and mirrors it into two
//! [`PartitionTree`](keyscope_partition::PartitionTree)s:
//!
//! - keyframe markers on the timeline lanes, one lane per scalar channel;
//! - curve nodes and Bézier handles on the value plane.
//!
//! Every keyframe becomes a [`Group`] of up to four elements (marker, node and
//! zero to two handles). Picking returns an [`ElementRef`], which names the
//! group and the member kind. Dragging is a three-step protocol:
//!
//! 1. [`begin_edit`](IndexedSequence::begin_edit) evicts the whole group, so a
//!    moving point is never picked against its own stale position;
//! 2. [`apply_offset`](IndexedSequence::apply_offset) mutates the keyframe
//!    (clamped between its neighbours) and updates stored positions, including
//!    the handles of the next keyframe whose segment changed shape;
//! 3. [`end_edit`](IndexedSequence::end_edit) reinserts the group.
//!
//! Only one edit may be active at a time; misuse is reported as a
//! [`SequenceError`] rather than corrupting the index.
//!
//! # Example
//!
//! ```rust
//! use keyscope_sequence::{
//!     AnimSequence, Channel, ElementKind, IndexedSequence, Keyframe, Property, Viewport,
//! };
//! use kurbo::Point;
//!
//! let anim = AnimSequence::new().with_property(
//!     "opacity",
//!     Property::Scalar(Channel::new([
//!         Keyframe::new(0.0, 0.0),
//!         Keyframe::new(500.0, 100.0),
//!     ])),
//! );
//! let mut seq = IndexedSequence::new(anim).unwrap();
//! seq.set_offset_y(400.0);
//! let view = Viewport { pan_x: 10.0, scale_x: 0.2, scale_y: 1.0 };
//!
//! // Keyframe (500, 100) is drawn at (10 + 500 * 0.2, 400 - 100).
//! let hit = seq.pick(Point::new(110.0, 300.0), 6.0, &view).unwrap();
//! assert_eq!(hit.kind, ElementKind::CurveNode);
//!
//! seq.begin_edit(hit).unwrap();
//! seq.apply_offset(hit, 250.0, -20.0).unwrap();
//! seq.end_edit(hit).unwrap();
//!
//! let moved = seq.keyframe(hit).unwrap();
//! assert_eq!((moved.time, moved.value), (750.0, 80.0));
//! assert_eq!(seq.sequence().duration(), 750.0);
//! assert_eq!(seq.pick(Point::new(160.0, 320.0), 6.0, &view), Some(hit));
//! ```
//!
//! The [`debug`] module draws the partition leaves through a small
//! [`DebugSurface`] trait, which is handy when tuning tree bounds.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod debug;
pub mod error;
pub mod model;
pub mod sequence;
pub mod types;

pub use debug::{DEBUG_PICK_RADIUS, DebugSurface, draw_partition};
pub use error::SequenceError;
pub use model::{AnimSequence, Channel, KeyRef, Keyframe, Property, PropertyEntry, Segment};
pub use sequence::IndexedSequence;
pub use types::{ElementKind, ElementRef, Group, GroupId, HandleSlot, SequenceConfig, Viewport};
