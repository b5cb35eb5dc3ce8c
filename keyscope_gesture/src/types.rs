// Copyright 2025 the Keyscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Session state, modifiers and configuration.

use keyscope_sequence::{ElementRef, SequenceError};

bitflags::bitflags! {
    /// Modifier keys held when a gesture starts.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// Pan the surface instead of picking.
        const PAN   = 0b0000_0001;
        /// Scrub the playhead even over a pickable element.
        const SCRUB = 0b0000_0010;
    }
}

/// What the pointer is currently doing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No button held.
    #[default]
    Idle,
    /// Moving the playhead.
    Scrubbing,
    /// Dragging a picked element; its group is evicted from the index.
    Dragging {
        /// The element under the pointer when the drag started.
        element: ElementRef,
    },
    /// Panning the surface.
    Panning,
}

impl SessionState {
    /// Whether a gesture is in progress.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Tuning for an [`EditSession`](crate::EditSession).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GestureConfig {
    /// Pick radius in screen units.
    pub pick_radius: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self { pick_radius: 6.0 }
    }
}

/// Failures of gesture handling.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum GestureError {
    /// `pointer_down` arrived while another gesture was still running.
    #[error("a {0:?} gesture is still active")]
    SessionActive(SessionState),
    /// The sequence index refused an edit step.
    #[error(transparent)]
    Sequence(#[from] SequenceError),
}
