use std::cell::RefCell;
use wasm_bindgen::prelude::*;

use shipdemo_engine::{Accelerometer, Input, InputEvent, InputQueue};

use crate::config::InputConfig;
use crate::controller::ShipInput;

/// Everything the host drives through the exported functions.
struct Host {
    input: Input,
    queue: InputQueue,
    ship: ShipInput,
}

thread_local! {
    static HOST: RefCell<Host> = RefCell::new(Host {
        input: Input::new(),
        queue: InputQueue::new(),
        ship: ShipInput::default(),
    });
}

fn with_host<R>(f: impl FnOnce(&mut Host) -> R) -> R {
    HOST.with(|cell| f(&mut cell.borrow_mut()))
}

fn devices(has_keyboard: bool, has_touch: bool, has_tilt: bool) -> Input {
    let mut input = match (has_keyboard, has_touch) {
        (true, true) => Input::with_all(),
        (true, false) => Input::desktop(),
        (false, true) => Input::mobile(),
        (false, false) => Input::new(),
    };
    input.set_accelerometer(has_tilt.then(Accelerometer::new));
    input
}

/// Attach the given devices and activate the ship controller with default
/// tunables. Returns false if the controller could not be activated.
#[wasm_bindgen]
pub fn init_input(has_keyboard: bool, has_touch: bool, has_tilt: bool) -> bool {
    init_with(devices(has_keyboard, has_touch, has_tilt), InputConfig::default())
}

/// Like `init_input`, with tunables parsed from RON text.
#[wasm_bindgen]
pub fn init_input_with_config(
    has_keyboard: bool,
    has_touch: bool,
    has_tilt: bool,
    ron: &str,
) -> bool {
    match InputConfig::from_ron(ron) {
        Ok(config) => init_with(devices(has_keyboard, has_touch, has_tilt), config),
        Err(e) => {
            log::warn!("shipdemo-sim: {}", e);
            false
        }
    }
}

fn init_with(input: Input, config: InputConfig) -> bool {
    with_host(|h| {
        h.ship.dispose(&mut h.input);
        h.input = input;
        h.queue = InputQueue::new();
        h.ship = ShipInput::new(config);
        h.ship.init(&mut h.input)
    })
}

#[wasm_bindgen]
pub fn dispose_input() {
    with_host(|h| h.ship.dispose(&mut h.input));
}

#[wasm_bindgen]
pub fn is_input_active() -> bool {
    with_host(|h| h.ship.is_active())
}

#[wasm_bindgen]
pub fn push_key_down(key_code: u32) {
    with_host(|h| h.queue.push(InputEvent::KeyDown { key_code }));
}

#[wasm_bindgen]
pub fn push_key_up(key_code: u32) {
    with_host(|h| h.queue.push(InputEvent::KeyUp { key_code }));
}

/// `time` is the host clock in milliseconds (`performance.now()`).
#[wasm_bindgen]
pub fn push_pointer_down(id: u32, x: f32, y: f32, time: f64) {
    with_host(|h| h.queue.push(InputEvent::PointerDown { id, x, y, time }));
}

#[wasm_bindgen]
pub fn push_pointer_move(id: u32, x: f32, y: f32, time: f64) {
    with_host(|h| h.queue.push(InputEvent::PointerMove { id, x, y, time }));
}

#[wasm_bindgen]
pub fn push_pointer_up(id: u32, x: f32, y: f32, time: f64) {
    with_host(|h| h.queue.push(InputEvent::PointerUp { id, x, y, time }));
}

/// The browser aborted a touch (`touchcancel`).
#[wasm_bindgen]
pub fn push_pointer_cancel(id: u32, x: f32, y: f32, time: f64) {
    with_host(|h| h.queue.push(InputEvent::PointerCancel { id, x, y, time }));
}

/// Device acceleration in g (`DeviceMotionEvent.accelerationIncludingGravity` / 9.81).
#[wasm_bindgen]
pub fn push_acceleration(x: f32, y: f32, z: f32) {
    with_host(|h| h.queue.push(InputEvent::Acceleration { x, y, z }));
}

#[wasm_bindgen]
pub fn set_focus(focused: bool) {
    with_host(|h| h.queue.push(InputEvent::FocusChanged { focused }));
}

/// Dispatch queued events, then poll. Call once per animation frame.
#[wasm_bindgen]
pub fn tick_input(dt: f32) {
    with_host(|h| {
        h.input.pump(&mut h.queue);
        h.ship.update(&h.input, dt);
    });
}

#[wasm_bindgen]
pub fn clear_input() {
    with_host(|h| h.ship.clear());
}

#[wasm_bindgen]
pub fn get_thrust_x() -> f32 {
    with_host(|h| h.ship.thrust().x)
}

#[wasm_bindgen]
pub fn get_thrust_y() -> f32 {
    with_host(|h| h.ship.thrust().y)
}

#[wasm_bindgen]
pub fn did_reset() -> bool {
    with_host(|h| h.ship.did_reset())
}
