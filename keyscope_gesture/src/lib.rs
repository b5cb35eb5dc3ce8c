// Copyright 2025 the Keyscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=keyscope_gesture --heading-base-level=0

//! Keyscope Gesture: pointer gestures for a keyframe editor.
//!
//! [`EditSession`] sits between raw pointer events and a
//! [`keyscope_sequence::IndexedSequence`]. It runs one gesture at a time:
//!
//! - **Drag**: pointer down on a curve node, handle or keyframe marker begins an
//!   edit of that keyframe's group; moves are converted from screen units to
//!   time/value offsets; pointer up commits the group back into the index.
//! - **Scrub**: pointer down on empty space (or with [`Modifiers::SCRUB`]) moves
//!   the playhead under the pointer.
//! - **Pan**: with [`Modifiers::PAN`], moves shift the viewport and the curve
//!   plane.
//!
//! Cancelling a gesture commits what already happened; there is no undo stack.
//!
//! ## Example
//!
//! ```rust
//! use keyscope_gesture::{EditSession, Modifiers, SessionState};
//! use keyscope_sequence::{AnimSequence, Channel, IndexedSequence, Keyframe, Property, Viewport};
//! use kurbo::Point;
//!
//! let anim = AnimSequence::new().with_property(
//!     "x",
//!     Property::Scalar(Channel::new([Keyframe::new(0.0, 0.0), Keyframe::new(100.0, 0.0)])),
//! );
//! let mut seq = IndexedSequence::new(anim).unwrap();
//! let mut session = EditSession::new(Viewport { pan_x: 0.0, scale_x: 1.0, scale_y: 1.0 });
//!
//! let state = session.pointer_down(&mut seq, Point::new(100.0, 0.0), Modifiers::empty()).unwrap();
//! assert!(matches!(state, SessionState::Dragging { .. }));
//! session.pointer_move(&mut seq, Point::new(130.0, 0.0)).unwrap();
//! session.pointer_up(&mut seq).unwrap();
//! assert_eq!(seq.sequence().duration(), 130.0);
//! ```
//!
//! This crate is `no_std`.

#![no_std]

pub mod session;
pub mod types;

pub use session::EditSession;
pub use types::{GestureConfig, GestureError, Modifiers, SessionState};
