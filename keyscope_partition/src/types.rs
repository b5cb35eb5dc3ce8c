// Copyright 2025 the Keyscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types, handles and configuration.

/// Axis-aligned partition rectangle: an origin (top-left) plus half extents.
///
/// The rectangle covers `[x, x + 2 * half_w) × [y, y + 2 * half_h)`. Splitting a
/// quad produces four children with halved extents that tile it exactly:
///
/// ```text
///  0 | 1
/// ---+---
///  2 | 3
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quad {
    /// Minimum x (left).
    pub x: f64,
    /// Minimum y (top).
    pub y: f64,
    /// Half of the width.
    pub half_w: f64,
    /// Half of the height.
    pub half_h: f64,
}

impl Quad {
    /// The zero quad. Reclaimed nodes are reset to this.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Create a quad from an origin and half extents.
    pub const fn new(x: f64, y: f64, half_w: f64, half_h: f64) -> Self {
        Self {
            x,
            y,
            half_w,
            half_h,
        }
    }

    /// Create a quad from an origin and a full size.
    pub const fn from_origin_size(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self::new(x, y, w * 0.5, h * 0.5)
    }

    /// Full width.
    pub fn width(&self) -> f64 {
        self.half_w * 2.0
    }

    /// Full height.
    pub fn height(&self) -> f64 {
        self.half_h * 2.0
    }

    /// Whether the point lies inside the closed rectangle.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x && y >= self.y && x <= self.x + self.width() && y <= self.y + self.height()
    }

    /// Quadrant index (0..4) of a point relative to this quad.
    ///
    /// Computed as `floor((x - self.x) / half_w) + 2 * floor((y - self.y) / half_h)`
    /// with each axis clamped to `0..=1`, so points on the max edge fall into the
    /// last row/column instead of escaping the tree.
    pub fn quadrant_of(&self, x: f64, y: f64) -> usize {
        let qx = axis_cell((x - self.x) / self.half_w);
        let qy = axis_cell((y - self.y) / self.half_h);
        qx + 2 * qy
    }

    /// The `i`th child quad (see the type docs for the layout).
    pub fn child(&self, i: usize) -> Self {
        debug_assert!(i < 4, "quadrant index out of range");
        let half_w = self.half_w * 0.5;
        let half_h = self.half_h * 0.5;
        let x = if i & 1 == 0 { self.x } else { self.x + self.half_w };
        let y = if i & 2 == 0 { self.y } else { self.y + self.half_h };
        Self::new(x, y, half_w, half_h)
    }

    /// Whether halving this quad keeps it above the minimum half extent.
    pub fn can_halve(&self, min_half_extent: f64) -> bool {
        self.half_w > min_half_extent && self.half_h > min_half_extent
    }

    /// Whether a query at `(px, py)` in scaled space could reach this quad
    /// within `radius`, given a per-axis scale.
    pub fn reaches(&self, px: f64, py: f64, radius: f64, scale_x: f64, scale_y: f64) -> bool {
        let ax = px - self.x * scale_x;
        let ay = py - self.y * scale_y;
        let aw = self.width() * scale_x;
        let ah = self.height() * scale_y;
        !(ax < -radius || ax > aw + radius || ay < -radius || ay > ah + radius)
    }
}

impl Default for Quad {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Floor a normalized axis offset and clamp it to a child column/row.
#[inline]
fn axis_cell(v: f64) -> usize {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Quadrant offsets are small; the cast is a floor before clamping."
    )]
    let i = v as i64;
    let floored = if (i as f64) > v { i - 1 } else { i };
    if floored <= 0 { 0 } else { 1 }
}

/// Tuning knobs shared by every node in a tree.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartitionConfig {
    /// Elements a leaf holds before it tries to split. Clamped to at least 1.
    pub capacity: usize,
    /// Quads whose half extents are at or below this never split; their
    /// buckets overflow instead.
    pub min_half_extent: f64,
}

impl PartitionConfig {
    pub(crate) fn normalized(self) -> Self {
        Self {
            capacity: self.capacity.max(1),
            min_half_extent: self.min_half_extent.max(0.0),
        }
    }
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            capacity: 2,
            min_half_extent: 8.0,
        }
    }
}

/// Generational handle for elements.
///
/// Keys stay valid while an element is evicted. Removing an element or clearing
/// the tree frees its slot; a later insert reusing the slot bumps the generation,
/// so stale keys never alias a live element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ElementKey(u32, u32);

impl ElementKey {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Element keys are intentionally 32-bit; higher bits are truncated by design."
    )]
    pub(crate) const fn new(idx: usize, generation: u32) -> Self {
        Self(idx as u32, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn generation(self) -> u32 {
        self.1
    }
}

/// Arena slot of a partition node.
///
/// Node ids are recycled through the tree's free-list when subtrees collapse,
/// so an id only names the same node until the next structural change.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) const ROOT: Self = Self(0);

    #[allow(
        clippy::cast_possible_truncation,
        reason = "Node arenas are far below u32::MAX slots."
    )]
    pub(crate) const fn new(idx: usize) -> Self {
        Self(idx as u32)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_tile_parent() {
        let q = Quad::from_origin_size(0.0, 0.0, 100.0, 60.0);
        let c: [Quad; 4] = core::array::from_fn(|i| q.child(i));
        assert_eq!(c[0], Quad::new(0.0, 0.0, 25.0, 15.0));
        assert_eq!(c[1], Quad::new(50.0, 0.0, 25.0, 15.0));
        assert_eq!(c[2], Quad::new(0.0, 30.0, 25.0, 15.0));
        assert_eq!(c[3], Quad::new(50.0, 30.0, 25.0, 15.0));
        let area: f64 = c.iter().map(|q| q.width() * q.height()).sum();
        assert_eq!(area, q.width() * q.height());
    }

    #[test]
    fn quadrant_of_clamps_each_axis() {
        let q = Quad::from_origin_size(0.0, -50.0, 100.0, 100.0);
        assert_eq!(q.quadrant_of(0.0, -50.0), 0);
        assert_eq!(q.quadrant_of(75.0, -40.0), 1);
        assert_eq!(q.quadrant_of(10.0, 10.0), 2);
        assert_eq!(q.quadrant_of(50.0, 0.0), 3);
        // Max edges stay inside.
        assert_eq!(q.quadrant_of(100.0, 50.0), 3);
        // Slightly negative offsets floor to -1 and clamp back to 0.
        assert_eq!(q.quadrant_of(-0.5, -50.5), 0);
    }

    #[test]
    fn reaches_grows_by_radius_in_scaled_space() {
        let q = Quad::from_origin_size(10.0, 10.0, 10.0, 10.0);
        assert!(q.reaches(20.0, 20.0, 0.0, 1.0, 1.0));
        assert!(!q.reaches(25.0, 15.0, 4.0, 1.0, 1.0));
        assert!(q.reaches(25.0, 15.0, 5.0, 1.0, 1.0));
        // At 2x zoom the quad spans 20..40 in screen units.
        assert!(q.reaches(38.0, 30.0, 0.0, 2.0, 2.0));
        assert!(!q.reaches(15.0, 30.0, 4.0, 2.0, 2.0));
    }

    #[test]
    fn can_halve_checks_both_axes() {
        assert!(Quad::new(0.0, 0.0, 16.0, 9.0).can_halve(8.0));
        assert!(!Quad::new(0.0, 0.0, 16.0, 8.0).can_halve(8.0));
        assert!(!Quad::new(0.0, 0.0, 8.0, 100.0).can_halve(8.0));
    }
}
