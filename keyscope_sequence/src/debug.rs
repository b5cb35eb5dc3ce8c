// Copyright 2025 the Keyscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Debug overlay: draws partition leaves onto any surface.

use core::fmt::Debug;

use keyscope_partition::PartitionTree;
use kurbo::{Point, Rect, Vec2};

use crate::sequence::IndexedSequence;
use crate::types::Viewport;

/// Pick radius used to mark the closest element in overlays.
pub const DEBUG_PICK_RADIUS: f64 = 6.0;

/// Minimal drawing sink for [`draw_partition`].
pub trait DebugSurface {
    /// Outline a leaf.
    fn stroke_rect(&mut self, rect: Rect);
    /// Emphasize the leaf under the cursor.
    fn highlight_rect(&mut self, rect: Rect);
    /// Print a leaf's bucket size at `at`.
    fn label(&mut self, at: Point, elements: usize);
    /// Mark the element a pick at the cursor would return.
    fn mark_closest(&mut self, at: Point);
}

/// Draw every on-screen leaf of `tree`.
///
/// Tree coordinates map to the screen as `offset + p * scale`. Leaves entirely
/// above or left of the surface are skipped, the leaf containing `cursor` is
/// highlighted, and the closest element within `pick_radius` is marked.
pub fn draw_partition<P: Copy + Debug>(
    tree: &PartitionTree<P>,
    surface: &mut impl DebugSurface,
    offset: Vec2,
    scale: Vec2,
    cursor: Point,
    pick_radius: f64,
) {
    let to_screen = |x: f64, y: f64| Point::new(offset.x + x * scale.x, offset.y + y * scale.y);
    tree.visit(|node| {
        if !node.is_leaf() {
            return;
        }
        let q = node.quad;
        let rect = Rect::from_points(
            to_screen(q.x, q.y),
            to_screen(q.x + q.width(), q.y + q.height()),
        );
        if rect.x1 < 0.0 || rect.y1 < 0.0 {
            return;
        }
        surface.stroke_rect(rect);
        let count = node.bucket().len();
        if count > 0 {
            surface.label(rect.center(), count);
        }
        if rect.contains(cursor) {
            surface.highlight_rect(rect);
        }
    });

    let closest = tree.closest(
        cursor.x - offset.x,
        cursor.y - offset.y,
        pick_radius,
        scale.x,
        scale.y,
    );
    if let Some((x, y)) = closest.and_then(|(key, _)| tree.position(key)) {
        surface.mark_closest(to_screen(x, y));
    }
}

impl IndexedSequence {
    /// Draw both trees as they are laid out on screen: markers on the timeline
    /// lanes, curve elements on the value plane.
    pub fn debug_draw(&self, surface: &mut impl DebugSurface, cursor: Point, viewport: &Viewport) {
        draw_partition(
            self.markers(),
            surface,
            Vec2::new(viewport.pan_x, 0.0),
            Vec2::new(viewport.scale_x, 1.0),
            cursor,
            DEBUG_PICK_RADIUS,
        );
        draw_partition(
            self.curves(),
            surface,
            Vec2::new(viewport.pan_x, self.offset_y()),
            Vec2::new(viewport.scale_x, viewport.scale_y),
            cursor,
            DEBUG_PICK_RADIUS,
        );
    }
}
