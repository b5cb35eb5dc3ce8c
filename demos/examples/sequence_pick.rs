// Copyright 2025 the Keyscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Picking keyframe markers, curve nodes and handles under pan/zoom, and the
//! partition debug overlay.
//!
//! Run:
//! - `cargo run -p keyscope_demos --example sequence_pick`

use keyscope_sequence::{
    AnimSequence, Channel, DebugSurface, IndexedSequence, Keyframe, Property, Viewport,
};
use kurbo::{Point, Rect};
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

/// Prints draw calls instead of rendering them.
#[derive(Default)]
struct TextSurface {
    leaves: usize,
}

impl DebugSurface for TextSurface {
    fn stroke_rect(&mut self, _rect: Rect) {
        self.leaves += 1;
    }
    fn highlight_rect(&mut self, rect: Rect) {
        println!("  cursor leaf: {rect:?}");
    }
    fn label(&mut self, at: Point, elements: usize) {
        println!("  {elements} element(s) around ({:.0}, {:.0})", at.x, at.y);
    }
    fn mark_closest(&mut self, at: Point) {
        println!("  closest at ({:.1}, {:.1})", at.x, at.y);
    }
}

fn main() {
    init_tracing();

    let anim = AnimSequence::new()
        .with_property(
            "opacity",
            Property::Scalar(Channel::new([
                Keyframe::new(0.0, 0.0),
                Keyframe::new(400.0, 100.0).with_quadratic(Point::new(0.5, 1.0)),
                Keyframe::new(1200.0, 40.0)
                    .with_cubic(Point::new(0.3, 0.0), Point::new(0.7, 1.0)),
            ])),
        )
        .with_property(
            "position",
            Property::Vector(vec![
                Channel::new([Keyframe::new(0.0, -50.0), Keyframe::new(800.0, 50.0)]),
                Channel::new([Keyframe::new(200.0, 0.0), Keyframe::new(1600.0, 80.0)]),
            ]),
        );

    let mut seq = IndexedSequence::new(anim).unwrap();
    seq.set_offset_y(300.0);
    let view = Viewport {
        pan_x: 40.0,
        scale_x: 0.25,
        scale_y: 1.5,
    };

    println!("== Index ==");
    println!(
        "groups: {}, markers: {}, curve elements: {}, duration: {}",
        seq.groups().len(),
        seq.marker_count(),
        seq.curve_count(),
        seq.sequence().duration()
    );

    println!("== Picks ==");
    // Curve node of (400, 100): x = 40 + 400 * 0.25, y = 300 - 100 * 1.5.
    let probes = [
        Point::new(140.0, 150.0),
        Point::new(90.0, 152.0),
        Point::new(340.0, 40.0),
        Point::new(600.0, 600.0),
    ];
    for p in probes {
        let curve = seq.pick(p, 6.0, &view);
        let marker = seq.pick_marker(p, 6.0, &view);
        println!("  {p:?}: curve {curve:?}, marker {marker:?}");
    }

    println!("== Debug overlay ==");
    let mut surface = TextSurface::default();
    seq.debug_draw(&mut surface, Point::new(140.0, 150.0), &view);
    println!("  {} leaves drawn", surface.leaves);
}
