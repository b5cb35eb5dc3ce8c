// Copyright 2025 the Keyscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A scripted pointer session: drag a curve node, drag a handle, scrub, pan,
//! then step through keyframes.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p keyscope_demos --example drag_session`

use keyscope_gesture::{EditSession, Modifiers, SessionState};
use keyscope_sequence::{AnimSequence, Channel, IndexedSequence, Keyframe, Property, Viewport};
use kurbo::Point;
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

fn print_keys(seq: &IndexedSequence) {
    for entry in seq.sequence().properties() {
        for channel in entry.property().channels() {
            let keys: Vec<_> = channel.keys.iter().map(|k| (k.time, k.value)).collect();
            println!("  {}: {:?}", entry.name(), keys);
        }
    }
}

fn main() {
    init_tracing();

    let anim = AnimSequence::new().with_property(
        "scale",
        Property::Scalar(Channel::new([
            Keyframe::new(0.0, 0.0),
            Keyframe::new(400.0, 100.0),
            Keyframe::new(800.0, 20.0).with_quadratic(Point::new(0.5, 0.0)),
        ])),
    );
    let mut seq = IndexedSequence::new(anim).unwrap();
    seq.set_offset_y(300.0);
    let mut session = EditSession::new(Viewport {
        pan_x: 0.0,
        scale_x: 0.5,
        scale_y: 1.0,
    });

    println!("== Initial ==");
    print_keys(&seq);

    // The node at (400, 100) is at (200, 200) on screen. Drag it right and up.
    let state = session
        .pointer_down(&mut seq, Point::new(200.0, 200.0), Modifiers::empty())
        .unwrap();
    println!("== Drag node: {state:?} ==");
    for step in 1..=5 {
        let p = Point::new(200.0 + 10.0 * f64::from(step), 200.0 - 4.0 * f64::from(step));
        session.pointer_move(&mut seq, p).unwrap();
    }
    session.pointer_up(&mut seq).unwrap();
    print_keys(&seq);

    // Trying to pass the next keyframe stops at it.
    session
        .pointer_down(&mut seq, Point::new(250.0, 180.0), Modifiers::empty())
        .unwrap();
    session.pointer_move(&mut seq, Point::new(900.0, 180.0)).unwrap();
    session.pointer_up(&mut seq).unwrap();
    println!("== Drag past the next keyframe ==");
    print_keys(&seq);

    println!("== Scrub ==");
    session
        .pointer_down(&mut seq, Point::new(150.0, 500.0), Modifiers::SCRUB)
        .unwrap();
    println!("  playhead at {}", session.playhead());
    session.pointer_move(&mut seq, Point::new(60.0, 500.0)).unwrap();
    println!("  playhead at {}", session.playhead());
    session.pointer_up(&mut seq).unwrap();

    println!("== Pan ==");
    session
        .pointer_down(&mut seq, Point::new(10.0, 10.0), Modifiers::PAN)
        .unwrap();
    session.pointer_move(&mut seq, Point::new(60.0, 30.0)).unwrap();
    session.pointer_up(&mut seq).unwrap();
    println!(
        "  pan_x = {}, curve offset = {}",
        session.viewport().pan_x,
        seq.offset_y()
    );

    println!("== Step ==");
    session.set_playhead(0.0);
    while session.playhead() < seq.sequence().duration() {
        println!("  -> {}", session.step_to_next_keyframe(&seq));
    }
    println!("  <- {}", session.step_to_previous_keyframe(&seq));

    assert_eq!(session.state(), SessionState::Idle);
}
