// Copyright 2025 the Keyscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The pointer gesture state machine.

use keyscope_sequence::{ElementRef, IndexedSequence, Viewport};
use kurbo::{Point, Vec2};

use crate::types::{GestureConfig, GestureError, Modifiers, SessionState};

/// Turns pointer events into edits of an [`IndexedSequence`].
///
/// One gesture runs at a time, from `pointer_down` to `pointer_up` (or
/// `cancel`). The session owns the viewport and the playhead; the sequence
/// owns the curve plane's vertical offset.
#[derive(Clone, Debug, Default)]
pub struct EditSession {
    state: SessionState,
    viewport: Viewport,
    playhead: f64,
    last: Point,
    config: GestureConfig,
}

impl EditSession {
    /// A session over `viewport` with the default configuration.
    pub fn new(viewport: Viewport) -> Self {
        Self::with_config(viewport, GestureConfig::default())
    }

    /// A session over `viewport`.
    pub fn with_config(viewport: Viewport, config: GestureConfig) -> Self {
        Self {
            state: SessionState::Idle,
            viewport,
            playhead: 0.0,
            last: Point::ZERO,
            config,
        }
    }

    /// Start a gesture.
    ///
    /// With [`Modifiers::PAN`] the surface pans. Otherwise the curve plane is
    /// picked first, then the timeline markers; a hit starts a drag (evicting
    /// the element's group). With no hit, or with [`Modifiers::SCRUB`], the
    /// playhead jumps under the pointer and follows it.
    pub fn pointer_down(
        &mut self,
        seq: &mut IndexedSequence,
        point: Point,
        modifiers: Modifiers,
    ) -> Result<SessionState, GestureError> {
        if self.state.is_active() {
            tracing::warn!(state = ?self.state, "pointer down during an active gesture");
            return Err(GestureError::SessionActive(self.state));
        }
        let next = if modifiers.contains(Modifiers::PAN) {
            SessionState::Panning
        } else if let Some(element) = self.hit(seq, point, modifiers) {
            seq.begin_edit(element)?;
            SessionState::Dragging { element }
        } else {
            self.playhead = self.time_at(point.x);
            SessionState::Scrubbing
        };
        self.state = next;
        self.last = point;
        tracing::debug!(x = point.x, y = point.y, state = ?next, "gesture started");
        Ok(next)
    }

    /// Continue the current gesture. A no-op while idle.
    pub fn pointer_move(&mut self, seq: &mut IndexedSequence, point: Point) -> Result<(), GestureError> {
        let delta = point - self.last;
        self.last = point;
        match self.state {
            SessionState::Idle => {}
            SessionState::Scrubbing => self.playhead = self.time_at(point.x),
            SessionState::Dragging { element } => {
                let (dt, dv) = self.to_sequence_delta(delta);
                seq.apply_offset(element, dt, dv)?;
            }
            SessionState::Panning => {
                self.viewport.pan_x += delta.x;
                seq.set_offset_y(seq.offset_y() + delta.y);
            }
        }
        Ok(())
    }

    /// Finish the current gesture. A drag commits its group back into the
    /// index. The session is idle afterwards even if the commit fails.
    pub fn pointer_up(&mut self, seq: &mut IndexedSequence) -> Result<(), GestureError> {
        let finished = core::mem::take(&mut self.state);
        if finished.is_active() {
            tracing::debug!(state = ?finished, "gesture finished");
        }
        if let SessionState::Dragging { element } = finished {
            seq.end_edit(element)?;
        }
        Ok(())
    }

    /// Abort the current gesture (pointer left the surface, window lost focus).
    ///
    /// Edits already applied are kept; there is no undo here.
    pub fn cancel(&mut self, seq: &mut IndexedSequence) -> Result<(), GestureError> {
        self.pointer_up(seq)
    }

    /// Move the playhead to the latest keyframe before it (or 0).
    pub fn step_to_previous_keyframe(&mut self, seq: &IndexedSequence) -> f64 {
        self.playhead = seq.sequence().previous_keyframe_time(self.playhead);
        self.playhead
    }

    /// Move the playhead to the earliest keyframe after it (or the end).
    pub fn step_to_next_keyframe(&mut self, seq: &IndexedSequence) -> f64 {
        self.playhead = seq.sequence().next_keyframe_time(self.playhead);
        self.playhead
    }

    /// The current gesture.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The pan/zoom state.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Replace the pan/zoom state, e.g. after a wheel zoom.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Playhead time.
    pub fn playhead(&self) -> f64 {
        self.playhead
    }

    /// Move the playhead; negative times clamp to 0.
    pub fn set_playhead(&mut self, time: f64) {
        self.playhead = time.max(0.0);
    }

    /// The configuration.
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    fn hit(
        &self,
        seq: &IndexedSequence,
        point: Point,
        modifiers: Modifiers,
    ) -> Option<ElementRef> {
        if modifiers.contains(Modifiers::SCRUB) {
            return None;
        }
        let r = self.config.pick_radius;
        seq.pick(point, r, &self.viewport)
            .or_else(|| seq.pick_marker(point, r, &self.viewport))
    }

    fn time_at(&self, x: f64) -> f64 {
        if self.viewport.scale_x == 0.0 {
            return self.playhead;
        }
        ((x - self.viewport.pan_x) / self.viewport.scale_x).max(0.0)
    }

    /// Screen delta to (time, value) delta. Screen y grows downward.
    fn to_sequence_delta(&self, delta: Vec2) -> (f64, f64) {
        let Viewport {
            scale_x, scale_y, ..
        } = self.viewport;
        let dt = if scale_x == 0.0 { 0.0 } else { delta.x / scale_x };
        let dv = if scale_y == 0.0 { 0.0 } else { -delta.y / scale_y };
        (dt, dv)
    }
}
