// Copyright 2025 the Keyscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the sequence index: element identity, groups, viewport and
//! configuration.

use keyscope_partition::{ElementKey, PartitionConfig, Quad};

use crate::model::KeyRef;

/// Identifier of a [`Group`] inside an [`IndexedSequence`](crate::IndexedSequence).
///
/// Group ids are dense and are reassigned by every rebuild.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) u32);

impl GroupId {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Group counts are bounded by keyframe counts, far below u32::MAX."
    )]
    pub(crate) const fn new(idx: usize) -> Self {
        Self(idx as u32)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Which control point of a curved segment a handle is.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HandleSlot {
    /// `p1`, present for quadratic and cubic segments.
    First,
    /// `p2`, present for cubic segments.
    Second,
}

impl HandleSlot {
    pub(crate) const fn idx(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

/// The kind of a pickable element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Diamond on a property lane of the timeline (time axis only).
    KeyframeMarker,
    /// The keyframe's sample on the value curve.
    CurveNode,
    /// A Bézier control point of the segment arriving at the keyframe.
    CurveHandle(HandleSlot),
}

/// A pickable element: a member of a group. This is the payload stored in the
/// partition trees.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ElementRef {
    /// The owning group.
    pub group: GroupId,
    /// Which member of the group.
    pub kind: ElementKind,
}

/// Every index element that stands for one keyframe: its timeline marker, its
/// curve node, and zero to two handles of its incoming segment.
///
/// Members are evicted and reinserted together during a drag.
#[derive(Clone, Debug)]
pub struct Group {
    pub(crate) key: KeyRef,
    pub(crate) lane: usize,
    pub(crate) prev: Option<GroupId>,
    pub(crate) next: Option<GroupId>,
    pub(crate) marker: Option<ElementKey>,
    pub(crate) node: Option<ElementKey>,
    pub(crate) handles: [Option<ElementKey>; 2],
}

impl Group {
    /// The keyframe this group stands for. The `channel` component is the
    /// vector sub-channel.
    pub fn key(&self) -> KeyRef {
        self.key
    }

    /// Timeline lane of the marker (one lane per scalar channel, from 1).
    pub fn lane(&self) -> usize {
        self.lane
    }

    /// The group of the previous keyframe in the same channel.
    pub fn prev(&self) -> Option<GroupId> {
        self.prev
    }

    /// The group of the next keyframe in the same channel.
    pub fn next(&self) -> Option<GroupId> {
        self.next
    }

    /// The partition element of a member, `None` for an empty slot.
    pub fn slot(&self, kind: ElementKind) -> Option<ElementKey> {
        match kind {
            ElementKind::KeyframeMarker => self.marker,
            ElementKind::CurveNode => self.node,
            ElementKind::CurveHandle(h) => self.handles[h.idx()],
        }
    }

    /// Kinds of the non-empty slots, marker first.
    pub fn members(&self) -> impl Iterator<Item = ElementKind> + '_ {
        [
            ElementKind::KeyframeMarker,
            ElementKind::CurveNode,
            ElementKind::CurveHandle(HandleSlot::First),
            ElementKind::CurveHandle(HandleSlot::Second),
        ]
        .into_iter()
        .filter(|&k| self.slot(k).is_some())
    }

    /// Number of handles (0 linear, 1 quadratic, 2 cubic).
    pub fn handle_count(&self) -> usize {
        self.handles.iter().flatten().count()
    }
}

/// Pan and zoom of the editor surface.
///
/// Screen `x = pan_x + time * scale_x`. On the curve plane screen
/// `y = offset_y - value * scale_y`; on the timeline lanes screen `y` is the
/// lane position itself.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Viewport {
    /// Horizontal screen offset of time 0.
    pub pan_x: f64,
    /// Screen units per time unit.
    pub scale_x: f64,
    /// Screen units per value unit on the curve plane.
    pub scale_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan_x: 0.0,
            scale_x: 0.2,
            scale_y: 1.0,
        }
    }
}

/// Layout and tree sizing for an [`IndexedSequence`](crate::IndexedSequence).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceConfig {
    /// Capacity and minimum size shared by both trees.
    pub partition: PartitionConfig,
    /// Root of the marker tree, in (time, lane position) space.
    pub marker_bounds: Quad,
    /// Root of the curve tree, in (time, -value) space.
    pub curve_bounds: Quad,
    /// Distance between timeline lanes.
    pub row_height: f64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            partition: PartitionConfig::default(),
            marker_bounds: Quad::from_origin_size(0.0, 0.0, 5_000.0, 5_000.0),
            curve_bounds: Quad::from_origin_size(0.0, -25_000.0, 2_000_000.0, 50_000.0),
            row_height: 20.0,
        }
    }
}
