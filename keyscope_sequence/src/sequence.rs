// Copyright 2025 the Keyscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The sequence index: two partition trees plus group bookkeeping.

use alloc::vec::Vec;
use keyscope_partition::{ElementKey, PartitionTree};
use kurbo::Point;

use crate::error::SequenceError;
use crate::model::{AnimSequence, KeyRef, Keyframe, Segment};
use crate::types::{ElementKind, ElementRef, Group, GroupId, HandleSlot, SequenceConfig, Viewport};

/// Pick index over one animated object's keyframes.
///
/// Owns the keyframe data and two [`PartitionTree`]s:
/// - the *marker* tree, one diamond per keyframe on a lane per scalar channel,
///   in `(time, lane * row_height)` space;
/// - the *curve* tree, the curve node of every keyframe plus the Bézier handles
///   of curved segments, in `(time, -value)` space so that larger values sit
///   higher on screen.
///
/// A drag goes through [`begin_edit`](Self::begin_edit) (evict the whole group),
/// any number of [`apply_offset`](Self::apply_offset) calls, then
/// [`end_edit`](Self::end_edit) (reinsert the group at its new geometry).
pub struct IndexedSequence {
    sequence: AnimSequence,
    config: SequenceConfig,
    markers: PartitionTree<ElementRef>,
    curves: PartitionTree<ElementRef>,
    groups: Vec<Group>,
    offset_y: f64,
    active_edit: Option<GroupId>,
}

impl core::fmt::Debug for IndexedSequence {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IndexedSequence")
            .field("properties", &self.sequence.properties().len())
            .field("groups", &self.groups.len())
            .field("markers", &self.markers)
            .field("curves", &self.curves)
            .field("offset_y", &self.offset_y)
            .field("active_edit", &self.active_edit)
            .finish_non_exhaustive()
    }
}

/// Local-space positions of every member of a group.
#[derive(Copy, Clone, Debug)]
struct GroupGeometry {
    marker: Point,
    node: Point,
    handles: [Option<Point>; 2],
}

/// Curve-plane position of a sample: values grow upward, screen y grows down.
fn curve_point(time: f64, value: f64) -> Point {
    Point::new(time, -value)
}

/// Absolute handle positions of the segment `prev → key`.
fn handle_points(prev: Option<&Keyframe>, key: &Keyframe) -> [Option<Point>; 2] {
    let Some(prev) = prev else {
        return [None, None];
    };
    let w = key.time - prev.time;
    let h = key.value - prev.value;
    let at = |p: Point| curve_point(prev.time + w * p.x, prev.value + h * p.y);
    match key.segment() {
        Segment::Linear => [None, None],
        Segment::Quadratic(p1) => [Some(at(p1)), None],
        Segment::Cubic(p1, p2) => [Some(at(p1)), Some(at(p2))],
    }
}

const HANDLE_SLOTS: [HandleSlot; 2] = [HandleSlot::First, HandleSlot::Second];

impl IndexedSequence {
    /// Index `sequence` with the default configuration.
    pub fn new(sequence: AnimSequence) -> Result<Self, SequenceError> {
        Self::with_config(sequence, SequenceConfig::default())
    }

    /// Index `sequence`.
    pub fn with_config(sequence: AnimSequence, config: SequenceConfig) -> Result<Self, SequenceError> {
        let mut this = Self {
            markers: PartitionTree::with_config(config.marker_bounds, config.partition),
            curves: PartitionTree::with_config(config.curve_bounds, config.partition),
            groups: Vec::new(),
            offset_y: 0.0,
            active_edit: None,
            sequence,
            config,
        };
        this.rebuild()?;
        Ok(this)
    }

    /// Clear both trees and index every keyframe again.
    ///
    /// Refused while an edit is active. If any element falls outside its tree's
    /// bounds the rebuild fails and the index is left empty.
    pub fn rebuild(&mut self) -> Result<(), SequenceError> {
        if let Some(active) = self.active_edit {
            return Err(SequenceError::EditInProgress { active });
        }
        self.clear_index();
        match self.index_all() {
            Ok(()) => {
                tracing::debug!(
                    groups = self.groups.len(),
                    markers = self.markers.len(),
                    curves = self.curves.len(),
                    "rebuilt sequence index"
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "sequence rebuild failed; index left empty");
                self.clear_index();
                Err(e)
            }
        }
    }

    /// Mutate the keyframe data, then refresh durations and rebuild.
    pub fn edit_sequence<R>(
        &mut self,
        f: impl FnOnce(&mut AnimSequence) -> R,
    ) -> Result<R, SequenceError> {
        if let Some(active) = self.active_edit {
            return Err(SequenceError::EditInProgress { active });
        }
        let out = f(&mut self.sequence);
        self.sequence.refresh_durations();
        self.rebuild()?;
        Ok(out)
    }

    /// The curve element closest to a screen point, within `radius` screen units.
    pub fn pick(&self, screen: Point, radius: f64, viewport: &Viewport) -> Option<ElementRef> {
        let hit = self
            .curves
            .closest(
                screen.x - viewport.pan_x,
                screen.y - self.offset_y,
                radius,
                viewport.scale_x,
                viewport.scale_y,
            )
            .map(|(_, e)| e);
        tracing::trace!(x = screen.x, y = screen.y, ?hit, "curve pick");
        hit
    }

    /// The keyframe marker closest to a screen point on the timeline lanes.
    pub fn pick_marker(&self, screen: Point, radius: f64, viewport: &Viewport) -> Option<ElementRef> {
        let hit = self
            .markers
            .closest(screen.x - viewport.pan_x, screen.y, radius, viewport.scale_x, 1.0)
            .map(|(_, e)| e);
        tracing::trace!(x = screen.x, y = screen.y, ?hit, "marker pick");
        hit
    }

    /// Evict every member of `element`'s group from its tree, so the group
    /// cannot be picked while it moves. Empty slots are skipped, and so are
    /// members an earlier commit left out of the index.
    ///
    /// On failure the members already evicted are put back and no edit starts.
    pub fn begin_edit(&mut self, element: ElementRef) -> Result<(), SequenceError> {
        if let Some(active) = self.active_edit {
            tracing::warn!(?active, requested = ?element.group, "refused nested edit");
            return Err(SequenceError::EditInProgress { active });
        }
        let mut evicted: [Option<(ElementKind, ElementKey)>; 4] = [None; 4];
        for (i, (kind, key)) in self.member_keys(element.group)?.enumerate() {
            let tree = self.tree_mut(kind);
            if tree.contains(key) && !tree.is_placed(key) {
                continue;
            }
            if let Err(e) = tree.evict(key) {
                tracing::warn!(group = ?element.group, ?kind, error = %e, "edit not started");
                for (kind, key) in evicted.into_iter().flatten() {
                    if let Err(e) = self.tree_mut(kind).reinsert(key) {
                        tracing::warn!(group = ?element.group, ?kind, error = %e, "member left out of the index");
                    }
                }
                return Err(e.into());
            }
            evicted[i] = Some((kind, key));
        }
        self.active_edit = Some(element.group);
        tracing::debug!(group = ?element.group, kind = ?element.kind, "began edit");
        Ok(())
    }

    /// Reinsert every member of the edited group at its current geometry.
    ///
    /// Every member is attempted; the first failure (for example a value dragged
    /// outside the curve tree) is returned and that member stays evicted.
    pub fn end_edit(&mut self, element: ElementRef) -> Result<(), SequenceError> {
        let active = self.active_edit.ok_or(SequenceError::NoActiveEdit)?;
        if active != element.group {
            return Err(SequenceError::EditMismatch {
                active,
                requested: element.group,
            });
        }
        self.active_edit = None;
        let mut first_err = self.sync_group(active).err();
        for (kind, key) in self.member_keys(active)? {
            let tree = self.tree_mut(kind);
            if tree.is_placed(key) {
                continue;
            }
            if let Err(e) = tree.reinsert(key) {
                tracing::warn!(group = ?active, ?kind, error = %e, "member left out of the index");
                first_err.get_or_insert(e.into());
            }
        }
        tracing::debug!(group = ?active, "ended edit");
        first_err.map_or(Ok(()), Err)
    }

    /// Move the keyframe data behind `element` and mirror the new geometry.
    ///
    /// - Markers move in time only.
    /// - Curve nodes move in time and value.
    /// - Handles move their own control point; its time coordinate stays inside
    ///   the segment.
    ///
    /// Keyframe times are clamped between the neighbouring keyframes and never
    /// go below 0. The next keyframe's handles are recomputed (they are derived
    /// from this keyframe), and cached durations are refreshed.
    pub fn apply_offset(
        &mut self,
        element: ElementRef,
        delta_time: f64,
        delta_value: f64,
    ) -> Result<(), SequenceError> {
        let group = self.group_checked(element.group)?;
        let (key, next) = (group.key, group.next);
        match element.kind {
            ElementKind::KeyframeMarker => self.shift_keyframe(key, delta_time, 0.0)?,
            ElementKind::CurveNode => self.shift_keyframe(key, delta_time, delta_value)?,
            ElementKind::CurveHandle(slot) => {
                self.shift_handle(key, slot, delta_time, delta_value)?;
            }
        }
        self.sync_group(element.group)?;
        if let Some(next) = next {
            self.sync_group(next)?;
        }
        self.sequence.refresh_durations();
        Ok(())
    }

    /// Placed elements in both trees.
    pub fn element_count(&self) -> usize {
        self.markers.len() + self.curves.len()
    }

    /// Placed keyframe markers.
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Placed curve nodes and handles.
    pub fn curve_count(&self) -> usize {
        self.curves.len()
    }

    /// A group by id.
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(id.idx())
    }

    /// All groups, in rebuild order (property, channel, keyframe).
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// The group standing for a keyframe.
    pub fn find_group(&self, key: KeyRef) -> Option<GroupId> {
        self.groups
            .iter()
            .position(|g| g.key == key)
            .map(GroupId::new)
    }

    /// Stored local-space position of an element (also while evicted).
    pub fn element_position(&self, element: ElementRef) -> Option<Point> {
        let key = self.group(element.group)?.slot(element.kind)?;
        let (x, y) = self.tree(element.kind).position(key)?;
        Some(Point::new(x, y))
    }

    /// Whether an element is currently in its tree.
    pub fn is_indexed(&self, element: ElementRef) -> bool {
        self.group(element.group)
            .and_then(|g| g.slot(element.kind))
            .is_some_and(|key| self.tree(element.kind).is_placed(key))
    }

    /// The keyframe behind an element.
    pub fn keyframe(&self, element: ElementRef) -> Option<&Keyframe> {
        self.sequence.keyframe(self.group(element.group)?.key)
    }

    /// Vertical screen offset of the curve plane.
    pub fn offset_y(&self) -> f64 {
        self.offset_y
    }

    /// Set the vertical screen offset of the curve plane.
    pub fn set_offset_y(&mut self, offset_y: f64) {
        self.offset_y = offset_y;
    }

    /// The group currently being edited.
    pub fn active_edit(&self) -> Option<GroupId> {
        self.active_edit
    }

    /// The keyframe data.
    pub fn sequence(&self) -> &AnimSequence {
        &self.sequence
    }

    /// Give the keyframe data back.
    pub fn into_sequence(self) -> AnimSequence {
        self.sequence
    }

    /// The configuration.
    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// The marker tree.
    pub fn markers(&self) -> &PartitionTree<ElementRef> {
        &self.markers
    }

    /// The curve tree.
    pub fn curves(&self) -> &PartitionTree<ElementRef> {
        &self.curves
    }

    fn clear_index(&mut self) {
        self.markers.clear();
        self.curves.clear();
        self.groups.clear();
    }

    fn index_all(&mut self) -> Result<(), SequenceError> {
        let mut lane = 1;
        for property in 0..self.sequence.properties().len() {
            let channels = self.sequence.properties()[property]
                .property()
                .channels()
                .len();
            for channel in 0..channels {
                self.index_channel(property, channel, lane)?;
                lane += 1;
            }
        }
        Ok(())
    }

    fn index_channel(&mut self, property: usize, channel: usize, lane: usize) -> Result<(), SequenceError> {
        let count = self
            .sequence
            .channel(KeyRef::new(property, channel, 0))
            .map_or(0, |c| c.keys.len());
        let mut prev: Option<GroupId> = None;
        for k in 0..count {
            let key = KeyRef::new(property, channel, k);
            let id = GroupId::new(self.groups.len());
            let element = |kind| ElementRef { group: id, kind };
            let geometry = self.geometry(key, lane)?;

            let marker = self.markers.insert(
                geometry.marker.x,
                geometry.marker.y,
                element(ElementKind::KeyframeMarker),
            )?;
            let node = self.curves.insert(
                geometry.node.x,
                geometry.node.y,
                element(ElementKind::CurveNode),
            )?;
            let mut handles = [None, None];
            for (slot, point) in HANDLE_SLOTS.into_iter().zip(geometry.handles) {
                if let Some(p) = point {
                    handles[slot.idx()] =
                        Some(self.curves.insert(p.x, p.y, element(ElementKind::CurveHandle(slot)))?);
                }
            }

            self.groups.push(Group {
                key,
                lane,
                prev,
                next: None,
                marker: Some(marker),
                node: Some(node),
                handles,
            });
            if let Some(p) = prev {
                self.groups[p.idx()].next = Some(id);
            }
            prev = Some(id);
        }
        Ok(())
    }

    fn geometry(&self, key: KeyRef, lane: usize) -> Result<GroupGeometry, SequenceError> {
        let channel = self
            .sequence
            .channel(key)
            .ok_or(SequenceError::MissingKeyframe(key))?;
        let k = channel
            .keys
            .get(key.key)
            .ok_or(SequenceError::MissingKeyframe(key))?;
        let prev = key.key.checked_sub(1).and_then(|i| channel.keys.get(i));
        Ok(GroupGeometry {
            marker: Point::new(k.time, lane as f64 * self.config.row_height),
            node: curve_point(k.time, k.value),
            handles: handle_points(prev, k),
        })
    }

    fn group_checked(&self, id: GroupId) -> Result<&Group, SequenceError> {
        self.group(id).ok_or(SequenceError::UnknownGroup(id))
    }

    /// Non-empty slots of a group with the kind that selects their tree.
    fn member_keys(
        &self,
        id: GroupId,
    ) -> Result<impl Iterator<Item = (ElementKind, ElementKey)> + use<>, SequenceError> {
        let g = self.group_checked(id)?;
        let mut slots = [None; 4];
        for (slot, kind) in slots.iter_mut().zip(g.members()) {
            *slot = g.slot(kind).map(|key| (kind, key));
        }
        Ok(slots.into_iter().flatten())
    }

    fn tree(&self, kind: ElementKind) -> &PartitionTree<ElementRef> {
        match kind {
            ElementKind::KeyframeMarker => &self.markers,
            ElementKind::CurveNode | ElementKind::CurveHandle(_) => &self.curves,
        }
    }

    fn tree_mut(&mut self, kind: ElementKind) -> &mut PartitionTree<ElementRef> {
        match kind {
            ElementKind::KeyframeMarker => &mut self.markers,
            ElementKind::CurveNode | ElementKind::CurveHandle(_) => &mut self.curves,
        }
    }

    /// Bring every member's stored position in line with the keyframe data.
    /// Placed members move inside their tree; evicted ones only record it.
    fn sync_group(&mut self, id: GroupId) -> Result<(), SequenceError> {
        let g = self.group_checked(id)?;
        let geometry = self.geometry(g.key, g.lane)?;
        let targets = [
            (ElementKind::KeyframeMarker, g.marker, Some(geometry.marker)),
            (ElementKind::CurveNode, g.node, Some(geometry.node)),
            (
                ElementKind::CurveHandle(HandleSlot::First),
                g.handles[0],
                geometry.handles[0],
            ),
            (
                ElementKind::CurveHandle(HandleSlot::Second),
                g.handles[1],
                geometry.handles[1],
            ),
        ];
        for (kind, key, target) in targets {
            let (Some(key), Some(target)) = (key, target) else {
                continue;
            };
            let tree = self.tree_mut(kind);
            if tree.position(key) != Some((target.x, target.y)) {
                tree.set_position(key, target.x, target.y)?;
            }
        }
        Ok(())
    }

    fn shift_keyframe(&mut self, key: KeyRef, delta_time: f64, delta_value: f64) -> Result<(), SequenceError> {
        let channel = self
            .sequence
            .channel(key)
            .ok_or(SequenceError::MissingKeyframe(key))?;
        let lower = key
            .key
            .checked_sub(1)
            .and_then(|i| channel.keys.get(i))
            .map_or(0.0, |k| k.time)
            .max(0.0);
        let upper = channel
            .keys
            .get(key.key + 1)
            .map_or(f64::INFINITY, |k| k.time);
        let k = self
            .sequence
            .keyframe_mut(key)
            .ok_or(SequenceError::MissingKeyframe(key))?;
        k.time = (k.time + delta_time).max(lower).min(upper);
        k.value += delta_value;
        Ok(())
    }

    fn shift_handle(
        &mut self,
        key: KeyRef,
        slot: HandleSlot,
        delta_time: f64,
        delta_value: f64,
    ) -> Result<(), SequenceError> {
        let channel = self
            .sequence
            .channel(key)
            .ok_or(SequenceError::MissingKeyframe(key))?;
        // Handles only exist on segments with a previous keyframe.
        let Some((prev_time, prev_value)) = key
            .key
            .checked_sub(1)
            .and_then(|i| channel.keys.get(i))
            .map(|k| (k.time, k.value))
        else {
            return Ok(());
        };
        let k = self
            .sequence
            .keyframe_mut(key)
            .ok_or(SequenceError::MissingKeyframe(key))?;
        let w = k.time - prev_time;
        let h = k.value - prev_value;
        let handle = match slot {
            HandleSlot::First => &mut k.p1,
            HandleSlot::Second => &mut k.p2,
        };
        let Some(p) = handle.as_mut() else {
            return Ok(());
        };
        // Degenerate segments cannot express a handle offset along that axis.
        if w != 0.0 {
            p.x = (p.x + delta_time / w).clamp(0.0, 1.0);
        }
        if h != 0.0 {
            p.y += delta_value / h;
        }
        Ok(())
    }
}
