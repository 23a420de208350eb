use std::collections::{BTreeMap, HashMap, HashSet};

use glam::{Vec2, Vec3};

use crate::time::Timestamp;

/// Input event types the engine understands.
/// Generic, no game-specific semantics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// A touch/click began at screen coordinates (x, y).
    PointerDown { id: u32, x: f32, y: f32, time: f64 },
    /// A touch/click ended at screen coordinates (x, y).
    PointerUp { id: u32, x: f32, y: f32, time: f64 },
    /// A touch/cursor moved to screen coordinates (x, y).
    PointerMove { id: u32, x: f32, y: f32, time: f64 },
    /// The host aborted a touch (e.g. `touchcancel`); no end will follow.
    PointerCancel { id: u32, x: f32, y: f32, time: f64 },
    /// A key was pressed.
    KeyDown { key_code: u32 },
    /// A key was released.
    KeyUp { key_code: u32 },
    /// Device acceleration in g, device axes.
    Acceleration { x: f32, y: f32, z: f32 },
    /// The host window gained or lost focus.
    FocusChanged { focused: bool },
}

/// A queue of input events.
/// JS writes events into the queue; Rust reads and drains them each frame.
pub struct InputQueue {
    events: Vec<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(32),
        }
    }

    /// Push a new input event (called from JS via wasm-bindgen).
    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    /// Drain all pending events, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// A keyboard key, identified by the browser `keyCode` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const ARROW_LEFT: KeyCode = KeyCode(37);
    pub const ARROW_UP: KeyCode = KeyCode(38);
    pub const ARROW_RIGHT: KeyCode = KeyCode(39);
    pub const ARROW_DOWN: KeyCode = KeyCode(40);
    pub const R: KeyCode = KeyCode(82);
}

/// Polled keyboard device: the set of keys currently held.
#[derive(Debug, Default)]
pub struct Keyboard {
    down: HashSet<KeyCode>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: KeyCode) {
        self.down.insert(key);
    }

    pub fn release(&mut self, key: KeyCode) {
        self.down.remove(&key);
    }

    /// Drop every held key (e.g. when the window loses focus and
    /// key-up events will never arrive).
    pub fn release_all(&mut self) {
        self.down.clear();
    }

    pub fn key_down(&self, key: KeyCode) -> bool {
        self.down.contains(&key)
    }

    /// Number of keys currently held.
    pub fn key_count(&self) -> usize {
        self.down.len()
    }
}

/// Polled accelerometer: the last reading the host reported.
#[derive(Debug, Default)]
pub struct Accelerometer {
    acceleration: Vec3,
}

impl Accelerometer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_acceleration(&mut self, acceleration: Vec3) {
        self.acceleration = acceleration;
    }

    pub fn acceleration(&self) -> Vec3 {
        self.acceleration
    }
}

/// Identifier for a single finger (or the mouse) across a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TouchId(pub u32);

/// A touch sample delivered to touchscreen listeners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub touch: TouchId,
    pub position: Vec2,
    pub timestamp: Timestamp,
}

impl TouchEvent {
    pub fn new(touch: TouchId, position: Vec2, timestamp: Timestamp) -> Self {
        Self {
            touch,
            position,
            timestamp,
        }
    }
}

/// Touch callback. The bool is whether the app currently has focus.
pub type TouchListener = Box<dyn FnMut(&TouchEvent, bool)>;

/// Listener phases. Each has its own key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Began,
    Moved,
    Ended,
    Cancelled,
}

/// Touchscreen device with keyed listener registration.
#[derive(Default)]
pub struct Touchscreen {
    began: BTreeMap<u32, TouchListener>,
    moved: BTreeMap<u32, TouchListener>,
    ended: BTreeMap<u32, TouchListener>,
    cancelled: BTreeMap<u32, TouchListener>,
    /// Touches currently down, with their latest sample.
    down: HashMap<TouchId, TouchEvent>,
}

impl Touchscreen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `phase`. Returns false if `key` is taken.
    pub fn add_listener(
        &mut self,
        phase: TouchPhase,
        key: u32,
        listener: impl FnMut(&TouchEvent, bool) + 'static,
    ) -> bool {
        let map = self.listeners_mut(phase);
        if map.contains_key(&key) {
            return false;
        }
        map.insert(key, Box::new(listener));
        true
    }

    /// Returns whether a listener was removed.
    pub fn remove_listener(&mut self, phase: TouchPhase, key: u32) -> bool {
        self.listeners_mut(phase).remove(&key).is_some()
    }

    /// Total listeners across all phases.
    pub fn listener_count(&self) -> usize {
        self.began.len() + self.moved.len() + self.ended.len() + self.cancelled.len()
    }

    pub fn is_down(&self, touch: TouchId) -> bool {
        self.down.contains_key(&touch)
    }

    pub fn touch_count(&self) -> usize {
        self.down.len()
    }

    fn listeners_mut(&mut self, phase: TouchPhase) -> &mut BTreeMap<u32, TouchListener> {
        match phase {
            TouchPhase::Began => &mut self.began,
            TouchPhase::Moved => &mut self.moved,
            TouchPhase::Ended => &mut self.ended,
            TouchPhase::Cancelled => &mut self.cancelled,
        }
    }

    fn touch_began(&mut self, event: &TouchEvent, focus: bool) {
        self.down.insert(event.touch, *event);
        notify(&mut self.began, event, focus);
    }

    fn touch_moved(&mut self, event: &TouchEvent, focus: bool) {
        match self.down.get_mut(&event.touch) {
            Some(last) => *last = *event,
            None => return,
        }
        notify(&mut self.moved, event, focus);
    }

    fn touch_ended(&mut self, event: &TouchEvent, focus: bool) {
        self.down.remove(&event.touch);
        notify(&mut self.ended, event, focus);
    }

    fn touch_cancelled(&mut self, event: &TouchEvent, focus: bool) {
        if self.down.remove(&event.touch).is_none() {
            return;
        }
        notify(&mut self.cancelled, event, focus);
    }

    /// Cancel every touch still down, reporting each at its last sample.
    fn cancel_all(&mut self, focus: bool) {
        for (_, last) in std::mem::take(&mut self.down) {
            notify(&mut self.cancelled, &last, focus);
        }
    }
}

fn notify(listeners: &mut BTreeMap<u32, TouchListener>, event: &TouchEvent, focus: bool) {
    for listener in listeners.values_mut() {
        listener(event, focus);
    }
}

/// The input device hub. Devices are optional: a desktop build has a
/// keyboard, a phone has a touchscreen and an accelerometer.
pub struct Input {
    keyboard: Option<Keyboard>,
    touchscreen: Option<Touchscreen>,
    accelerometer: Option<Accelerometer>,
    focused: bool,
}

impl Input {
    /// A hub with no devices attached.
    pub fn new() -> Self {
        Self {
            keyboard: None,
            touchscreen: None,
            accelerometer: None,
            focused: true,
        }
    }

    pub fn desktop() -> Self {
        Self {
            keyboard: Some(Keyboard::new()),
            ..Self::new()
        }
    }

    pub fn mobile() -> Self {
        Self {
            touchscreen: Some(Touchscreen::new()),
            accelerometer: Some(Accelerometer::new()),
            ..Self::new()
        }
    }

    pub fn with_all() -> Self {
        Self {
            keyboard: Some(Keyboard::new()),
            ..Self::mobile()
        }
    }

    /// Attach or detach the accelerometer.
    pub fn set_accelerometer(&mut self, accelerometer: Option<Accelerometer>) {
        self.accelerometer = accelerometer;
    }

    pub fn keyboard(&self) -> Option<&Keyboard> {
        self.keyboard.as_ref()
    }

    pub fn touchscreen(&self) -> Option<&Touchscreen> {
        self.touchscreen.as_ref()
    }

    pub fn touchscreen_mut(&mut self) -> Option<&mut Touchscreen> {
        self.touchscreen.as_mut()
    }

    pub fn accelerometer(&self) -> Option<&Accelerometer> {
        self.accelerometer.as_ref()
    }

    pub fn has_device(&self) -> bool {
        self.keyboard.is_some() || self.touchscreen.is_some() || self.accelerometer.is_some()
    }

    pub fn has_focus(&self) -> bool {
        self.focused
    }

    /// Route a single event to its device. Touch listeners run synchronously,
    /// before this returns. Events for missing devices are dropped.
    pub fn dispatch(&mut self, event: InputEvent) {
        let focus = self.focused;
        match event {
            InputEvent::KeyDown { key_code } => {
                if let Some(keyboard) = self.keyboard.as_mut() {
                    keyboard.press(KeyCode(key_code));
                }
            }
            InputEvent::KeyUp { key_code } => {
                if let Some(keyboard) = self.keyboard.as_mut() {
                    keyboard.release(KeyCode(key_code));
                }
            }
            InputEvent::PointerDown { id, x, y, time } => {
                if let Some(touch) = self.touchscreen.as_mut() {
                    touch.touch_began(&touch_event(id, x, y, time), focus);
                }
            }
            InputEvent::PointerMove { id, x, y, time } => {
                if let Some(touch) = self.touchscreen.as_mut() {
                    touch.touch_moved(&touch_event(id, x, y, time), focus);
                }
            }
            InputEvent::PointerUp { id, x, y, time } => {
                if let Some(touch) = self.touchscreen.as_mut() {
                    touch.touch_ended(&touch_event(id, x, y, time), focus);
                }
            }
            InputEvent::PointerCancel { id, x, y, time } => {
                if let Some(touch) = self.touchscreen.as_mut() {
                    touch.touch_cancelled(&touch_event(id, x, y, time), focus);
                }
            }
            InputEvent::Acceleration { x, y, z } => {
                if let Some(accel) = self.accelerometer.as_mut() {
                    accel.set_acceleration(Vec3::new(x, y, z));
                }
            }
            InputEvent::FocusChanged { focused } => {
                self.focused = focused;
                // Key-ups and touch-ends are not delivered to an unfocused
                // window, so anything held is released now.
                if !focused {
                    if let Some(keyboard) = self.keyboard.as_mut() {
                        keyboard.release_all();
                    }
                    if let Some(touch) = self.touchscreen.as_mut() {
                        touch.cancel_all(false);
                    }
                }
                log::debug!("input focus changed: {}", focused);
            }
        }
    }

    /// Dispatch everything queued since the last frame, in arrival order.
    pub fn pump(&mut self, queue: &mut InputQueue) {
        for event in queue.drain() {
            self.dispatch(event);
        }
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new()
    }
}

fn touch_event(id: u32, x: f32, y: f32, time: f64) -> TouchEvent {
    TouchEvent::new(TouchId(id), Vec2::new(x, y), Timestamp::from_millis(time))
}
