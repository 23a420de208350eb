use glam::Vec2;
use shipdemo_engine::{Timestamp, TouchEvent, TouchId};

/// Tracks a single-finger drag between frames.
///
/// The touchscreen may report several samples of the same touch within one
/// animation frame, so deltas accumulate until the controller takes them.
/// Over a whole gesture the deltas taken sum to `end - origin`.
#[derive(Debug, Clone, Default)]
pub struct GestureTracker {
    touch: Option<TouchId>,
    /// Where the current gesture started.
    origin: Vec2,
    /// Last sample folded into `pending`.
    last: Vec2,
    started_at: Timestamp,
    pending: Vec2,
    swipe_reset: bool,
    swipe_time_ms: f64,
    swipe_length: f32,
}

impl GestureTracker {
    pub fn new(swipe_time_ms: f64, swipe_length: f32) -> Self {
        Self {
            swipe_time_ms,
            swipe_length,
            ..Self::default()
        }
    }

    pub fn touch_began(&mut self, event: &TouchEvent, focus: bool) {
        if !focus || self.touch.is_some() {
            return;
        }
        self.touch = Some(event.touch);
        self.origin = event.position;
        self.last = event.position;
        self.started_at = event.timestamp;
        log::debug!("gesture began at ({}, {})", event.position.x, event.position.y);
    }

    pub fn touch_moved(&mut self, event: &TouchEvent, focus: bool) {
        if !focus || self.touch != Some(event.touch) {
            return;
        }
        self.pending += event.position - self.last;
        self.last = event.position;
    }

    /// End events are honoured without focus, otherwise a gesture that
    /// loses focus mid-drag would never finish.
    pub fn touch_ended(&mut self, event: &TouchEvent, _focus: bool) {
        if self.touch != Some(event.touch) {
            return;
        }
        self.pending += event.position - self.last;

        let travel = event.position - self.origin;
        let elapsed = event.timestamp.elapsed_millis(self.started_at);
        if elapsed < self.swipe_time_ms && travel.x.abs() >= self.swipe_length {
            log::debug!("swipe reset: dx={} in {}ms", travel.x, elapsed);
            self.swipe_reset = true;
        }

        log::debug!(
            "gesture ended after {}ms, travel ({}, {})",
            elapsed,
            travel.x,
            travel.y
        );
        self.end_gesture();
    }

    /// The host aborted the touch. Drag already reported stays pending; the
    /// gesture is dropped without a final delta or swipe check.
    pub fn touch_cancelled(&mut self, event: &TouchEvent, _focus: bool) {
        if self.touch != Some(event.touch) {
            return;
        }
        log::debug!("gesture cancelled at ({}, {})", event.position.x, event.position.y);
        self.end_gesture();
    }

    /// Drag accumulated since the last call.
    pub fn take_delta(&mut self) -> Vec2 {
        std::mem::take(&mut self.pending)
    }

    /// Whether a swipe requested a reset since the last call.
    pub fn take_reset(&mut self) -> bool {
        std::mem::take(&mut self.swipe_reset)
    }

    pub fn is_tracking(&self) -> bool {
        self.touch.is_some()
    }

    /// Start of the current gesture, if one is in progress.
    pub fn origin(&self) -> Option<Vec2> {
        self.touch.map(|_| self.origin)
    }

    pub fn started_at(&self) -> Option<Timestamp> {
        self.touch.map(|_| self.started_at)
    }

    fn end_gesture(&mut self) {
        self.touch = None;
        self.origin = Vec2::ZERO;
        self.last = Vec2::ZERO;
        self.started_at = Timestamp::ZERO;
    }

    /// Forget the current gesture and anything pending. Swipe settings stay.
    pub fn reset(&mut self) {
        *self = Self::new(self.swipe_time_ms, self.swipe_length);
    }
}
