use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use shipdemo_engine::{Input, KeyCode, Keyboard, TouchEvent, TouchPhase, Touchscreen};

use crate::config::{ConfigError, InputConfig};
use crate::gesture::GestureTracker;

/// Why [`ShipInput::try_init`] could not activate the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum InputError {
    /// No keyboard, touchscreen, or accelerometer is attached.
    NoDevice,
    /// Another listener already holds the configured touchscreen key.
    ListenerInUse(u32),
    /// The controller was built with tunables that fail validation.
    Config(ConfigError),
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputError::NoDevice => write!(f, "no input device available"),
            InputError::ListenerInUse(key) => {
                write!(f, "touchscreen listener key {} is already registered", key)
            }
            InputError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for InputError {}

impl From<ConfigError> for InputError {
    fn from(e: ConfigError) -> Self {
        InputError::Config(e)
    }
}

const PHASES: [TouchPhase; 4] = [
    TouchPhase::Began,
    TouchPhase::Moved,
    TouchPhase::Ended,
    TouchPhase::Cancelled,
];

/// Player input for the ship demo.
///
/// Keyboard and accelerometer are polled once per frame; touch arrives
/// through listeners registered on the touchscreen. Tilt and touch drags
/// feed the same thrust the arrow keys produce, so game logic reads one
/// value regardless of device.
///
/// Construction touches no engine resources. Call [`ShipInput::init`] before
/// use and [`ShipInput::dispose`] to release the listeners.
pub struct ShipInput {
    config: InputConfig,
    active: bool,
    /// Whether listeners are registered on the touchscreen.
    listening: bool,

    // Keyboard
    force_left: f32,
    force_right: f32,
    force_up: f32,
    force_down: f32,
    keybd_thrust: Vec2,

    // Touch, shared with the registered listeners
    gesture: Rc<RefCell<GestureTracker>>,

    // Results
    reset_pressed: bool,
    input_thrust: Vec2,
}

impl ShipInput {
    /// The config is checked by [`ShipInput::try_init`], not here.
    pub fn new(config: InputConfig) -> Self {
        let gesture = GestureTracker::new(config.swipe_time_ms, config.swipe_length);
        Self {
            config,
            active: false,
            listening: false,
            force_left: 0.0,
            force_right: 0.0,
            force_up: 0.0,
            force_down: 0.0,
            keybd_thrust: Vec2::ZERO,
            gesture: Rc::new(RefCell::new(gesture)),
            reset_pressed: false,
            input_thrust: Vec2::ZERO,
        }
    }

    pub fn config(&self) -> &InputConfig {
        &self.config
    }

    /// Activate the controller, attaching touch listeners if a touchscreen
    /// is present. Returns true on success; failures are logged.
    pub fn init(&mut self, input: &mut Input) -> bool {
        match self.try_init(input) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("ship input failed to initialize: {}", e);
                false
            }
        }
    }

    pub fn try_init(&mut self, input: &mut Input) -> Result<(), InputError> {
        if self.active {
            log::debug!("ship input already active");
            return Ok(());
        }
        self.config.validate()?;
        if !input.has_device() {
            return Err(InputError::NoDevice);
        }

        self.reset_state();
        if let Some(touch) = input.touchscreen_mut() {
            self.listen(touch)?;
            self.listening = true;
        }

        self.active = true;
        log::info!(
            "ship input active (keyboard: {}, touch: {}, tilt: {})",
            input.keyboard().is_some(),
            self.listening,
            input.accelerometer().is_some()
        );
        Ok(())
    }

    /// Register one listener per touch phase, all forwarding to the shared
    /// gesture tracker. On failure nothing stays registered.
    fn listen(&self, touch: &mut Touchscreen) -> Result<(), InputError> {
        let key = self.config.listener_key;
        let mut added = Vec::with_capacity(PHASES.len());
        for phase in PHASES {
            let gesture = self.gesture.clone();
            let ok = touch.add_listener(phase, key, move |e, focus| {
                let mut gesture = gesture.borrow_mut();
                match phase {
                    TouchPhase::Began => gesture.touch_began(e, focus),
                    TouchPhase::Moved => gesture.touch_moved(e, focus),
                    TouchPhase::Ended => gesture.touch_ended(e, focus),
                    TouchPhase::Cancelled => gesture.touch_cancelled(e, focus),
                }
            });
            if !ok {
                for phase in added {
                    touch.remove_listener(phase, key);
                }
                return Err(InputError::ListenerInUse(key));
            }
            added.push(phase);
        }
        Ok(())
    }

    /// Deactivate, releasing all listeners. The controller can be
    /// initialized again afterwards.
    pub fn dispose(&mut self, input: &mut Input) {
        if self.listening {
            if let Some(touch) = input.touchscreen_mut() {
                for phase in PHASES {
                    touch.remove_listener(phase, self.config.listener_key);
                }
            }
            self.listening = false;
        }
        if self.active {
            log::info!("ship input disposed");
        }
        self.reset_state();
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Poll the keyboard and accelerometer, and fold in touch drags reported
    /// since the last frame. Does nothing while inactive.
    pub fn update(&mut self, input: &Input, dt: f32) {
        if !self.active {
            return;
        }

        let max = self.config.max_force;
        let mut key_reset = false;
        if let Some(keys) = input.keyboard() {
            let ramp = self.config.force_ramp * dt.max(0.0);
            let bindings = self.config.keys;
            self.force_left = ramp_force(self.force_left, keys, bindings.left(), ramp, max);
            self.force_right = ramp_force(self.force_right, keys, bindings.right(), ramp, max);
            self.force_up = ramp_force(self.force_up, keys, bindings.up(), ramp, max);
            self.force_down = ramp_force(self.force_down, keys, bindings.down(), ramp, max);
            key_reset = keys.key_down(bindings.reset());
        }
        self.keybd_thrust = Vec2::new(
            self.force_right - self.force_left,
            self.force_up - self.force_down,
        );

        // Tilt is read fresh each frame and never builds up like a held key.
        let tilt = input
            .accelerometer()
            .map_or(Vec2::ZERO, |a| a.acceleration().truncate() * self.config.tilt_scale);

        let (drag, swipe_reset) = {
            let mut gesture = self.gesture.borrow_mut();
            (gesture.take_delta(), gesture.take_reset())
        };

        let bound = Vec2::splat(max);
        let thrust = self.keybd_thrust + tilt + drag * self.config.touch_scale;
        self.input_thrust = thrust.clamp(-bound, bound);
        self.reset_pressed |= key_reset || swipe_reset;
    }

    /// Drop buffered input so the next frame starts fresh. Leaves the
    /// controller active.
    pub fn clear(&mut self) {
        self.reset_pressed = false;
        self.input_thrust = Vec2::ZERO;
        self.keybd_thrust = Vec2::ZERO;
        self.force_left = 0.0;
        self.force_right = 0.0;
        self.force_up = 0.0;
        self.force_down = 0.0;
        let mut gesture = self.gesture.borrow_mut();
        gesture.take_delta();
        gesture.take_reset();
    }

    /// Thrust from the most recent update.
    pub fn thrust(&self) -> Vec2 {
        self.input_thrust
    }

    pub fn did_reset(&self) -> bool {
        self.reset_pressed
    }

    pub fn on_touch_began(&mut self, event: &TouchEvent, focus: bool) {
        self.gesture.borrow_mut().touch_began(event, focus);
    }

    pub fn on_touch_moved(&mut self, event: &TouchEvent, focus: bool) {
        self.gesture.borrow_mut().touch_moved(event, focus);
    }

    pub fn on_touch_ended(&mut self, event: &TouchEvent, focus: bool) {
        self.gesture.borrow_mut().touch_ended(event, focus);
    }

    pub fn on_touch_cancelled(&mut self, event: &TouchEvent, focus: bool) {
        self.gesture.borrow_mut().touch_cancelled(event, focus);
    }

    fn reset_state(&mut self) {
        self.clear();
        self.gesture.borrow_mut().reset();
    }
}

impl Default for ShipInput {
    fn default() -> Self {
        Self::new(InputConfig::default())
    }
}

/// Held keys build force over time; releasing drops it straight to zero.
fn ramp_force(force: f32, keys: &Keyboard, key: KeyCode, ramp: f32, max: f32) -> f32 {
    if keys.key_down(key) {
        (force + ramp).min(max)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipdemo_engine::{Accelerometer, InputEvent, InputQueue, Timestamp, TouchId};

    const DT: f32 = 1.0 / 60.0;

    fn config() -> InputConfig {
        InputConfig {
            force_ramp: 60.0,
            max_force: 10.0,
            ..InputConfig::default()
        }
    }

    fn active(input: &mut Input) -> ShipInput {
        let mut ship = ShipInput::new(config());
        assert!(ship.init(input));
        ship
    }

    fn key_down(input: &mut Input, key: KeyCode) {
        input.dispatch(InputEvent::KeyDown { key_code: key.0 });
    }

    fn touch(x: f32, y: f32, ms: f64) -> TouchEvent {
        TouchEvent::new(TouchId(0), Vec2::new(x, y), Timestamp::from_millis(ms))
    }

    #[test]
    fn init_and_dispose_toggle_active() {
        let mut input = Input::with_all();
        let mut ship = ShipInput::default();
        assert!(!ship.is_active());

        assert!(ship.init(&mut input));
        assert!(ship.is_active());
        assert_eq!(input.touchscreen().unwrap().listener_count(), 4);

        ship.dispose(&mut input);
        assert!(!ship.is_active());
        assert_eq!(input.touchscreen().unwrap().listener_count(), 0);

        // Repeated dispose is harmless, and the controller can come back.
        ship.dispose(&mut input);
        assert!(ship.init(&mut input));
        assert!(ship.is_active());
    }

    #[test]
    fn init_fails_without_devices() {
        let mut input = Input::new();
        let mut ship = ShipInput::default();
        assert_eq!(ship.try_init(&mut input), Err(InputError::NoDevice));
        assert!(!ship.init(&mut input));
        assert!(!ship.is_active());
    }

    #[test]
    fn init_fails_when_listener_key_taken() {
        let mut input = Input::mobile();
        let key = InputConfig::default().listener_key;
        input.touchscreen_mut().unwrap().add_listener(TouchPhase::Ended, key, |_, _| {});

        let mut ship = ShipInput::default();
        assert_eq!(ship.try_init(&mut input), Err(InputError::ListenerInUse(key)));
        assert!(!ship.is_active());
        // Partial registration rolled back; only the foreign listener remains.
        assert_eq!(input.touchscreen().unwrap().listener_count(), 1);
    }

    #[test]
    fn reinit_while_active_is_a_no_op() {
        let mut input = Input::with_all();
        let mut ship = active(&mut input);
        assert_eq!(ship.try_init(&mut input), Ok(()));
        assert_eq!(input.touchscreen().unwrap().listener_count(), 4);
    }

    #[test]
    fn held_key_ramps_up_to_max_force() {
        let mut input = Input::desktop();
        let mut ship = active(&mut input);
        key_down(&mut input, KeyCode::ARROW_RIGHT);

        ship.update(&input, DT);
        assert!((ship.thrust().x - 1.0).abs() < 1e-4);
        ship.update(&input, DT);
        assert!((ship.thrust().x - 2.0).abs() < 1e-4);

        for _ in 0..100 {
            ship.update(&input, DT);
        }
        assert_eq!(ship.thrust(), Vec2::new(10.0, 0.0));

        input.dispatch(InputEvent::KeyUp { key_code: KeyCode::ARROW_RIGHT.0 });
        ship.update(&input, DT);
        assert_eq!(ship.thrust(), Vec2::ZERO);
    }

    #[test]
    fn opposing_keys_cancel() {
        let mut input = Input::desktop();
        let mut ship = active(&mut input);
        key_down(&mut input, KeyCode::ARROW_LEFT);
        key_down(&mut input, KeyCode::ARROW_RIGHT);
        key_down(&mut input, KeyCode::ARROW_DOWN);

        for _ in 0..5 {
            ship.update(&input, DT);
        }
        let thrust = ship.thrust();
        assert_eq!(thrust.x, 0.0);
        assert!(thrust.y < 0.0);
        assert!(thrust.y >= -10.0);
    }

    #[test]
    fn reset_key_latches_until_clear() {
        let mut input = Input::desktop();
        let mut ship = active(&mut input);
        key_down(&mut input, KeyCode::R);
        ship.update(&input, DT);
        assert!(ship.did_reset());

        input.dispatch(InputEvent::KeyUp { key_code: KeyCode::R.0 });
        ship.update(&input, DT);
        assert!(ship.did_reset());

        ship.clear();
        assert!(!ship.did_reset());
        assert!(ship.is_active());
    }

    #[test]
    fn tap_in_place_adds_no_thrust() {
        let mut input = Input::mobile();
        let mut ship = active(&mut input);
        let mut queue = InputQueue::new();
        queue.push(InputEvent::PointerDown { id: 0, x: 40.0, y: 40.0, time: 0.0 });
        queue.push(InputEvent::PointerUp { id: 0, x: 40.0, y: 40.0, time: 80.0 });
        input.pump(&mut queue);

        ship.update(&input, DT);
        assert_eq!(ship.thrust(), Vec2::ZERO);
    }

    #[test]
    fn drag_adds_thrust_proportional_to_travel() {
        let mut input = Input::mobile();
        let mut ship = ShipInput::new(InputConfig {
            touch_scale: 0.5,
            ..InputConfig::default()
        });
        assert!(ship.init(&mut input));

        let mut queue = InputQueue::new();
        queue.push(InputEvent::PointerDown { id: 0, x: 10.0, y: 20.0, time: 0.0 });
        queue.push(InputEvent::PointerMove { id: 0, x: 14.0, y: 22.0, time: 8.0 });
        queue.push(InputEvent::PointerUp { id: 0, x: 30.0, y: 10.0, time: 2000.0 });
        input.pump(&mut queue);

        ship.update(&input, DT);
        assert_eq!(ship.thrust(), Vec2::new(10.0, -5.0));
        assert!(!ship.did_reset());

        // The drag is consumed by the frame that saw it.
        ship.update(&input, DT);
        assert_eq!(ship.thrust(), Vec2::ZERO);
    }

    #[test]
    fn touch_thrust_is_clamped() {
        let mut input = Input::mobile();
        let mut ship = active(&mut input);
        ship.on_touch_began(&touch(0.0, 0.0, 0.0), true);
        ship.on_touch_ended(&touch(0.0, 500.0, 10.0), true);
        ship.update(&input, DT);
        assert_eq!(ship.thrust(), Vec2::new(0.0, 10.0));
    }

    #[test]
    fn swipe_requests_reset() {
        let mut input = Input::mobile();
        let mut ship = ShipInput::default();
        assert!(ship.init(&mut input));
        ship.on_touch_began(&touch(300.0, 0.0, 0.0), true);
        ship.on_touch_ended(&touch(100.0, 0.0, 200.0), true);
        ship.update(&input, DT);
        assert!(ship.did_reset());
    }

    #[test]
    fn clear_zeroes_results_but_stays_active() {
        let mut input = Input::with_all();
        let mut ship = active(&mut input);
        key_down(&mut input, KeyCode::ARROW_UP);
        key_down(&mut input, KeyCode::R);
        ship.update(&input, DT);
        assert_ne!(ship.thrust(), Vec2::ZERO);

        ship.clear();
        assert_eq!(ship.thrust(), Vec2::ZERO);
        assert!(!ship.did_reset());
        assert!(ship.is_active());
    }

    #[test]
    fn update_after_dispose_is_a_no_op() {
        let mut input = Input::with_all();
        let mut ship = active(&mut input);
        ship.dispose(&mut input);

        key_down(&mut input, KeyCode::ARROW_LEFT);
        key_down(&mut input, KeyCode::R);
        input.dispatch(InputEvent::PointerDown { id: 0, x: 0.0, y: 0.0, time: 0.0 });
        input.dispatch(InputEvent::PointerUp { id: 0, x: 50.0, y: 0.0, time: 10.0 });
        ship.update(&input, DT);

        assert_eq!(ship.thrust(), Vec2::ZERO);
        assert!(!ship.did_reset());
        assert!(!ship.is_active());
    }

    #[test]
    fn keyboard_and_touch_combine() {
        let mut input = Input::with_all();
        let mut ship = active(&mut input);
        key_down(&mut input, KeyCode::ARROW_RIGHT);
        ship.on_touch_began(&touch(0.0, 0.0, 0.0), true);
        ship.on_touch_ended(&touch(-3.0, 2.0, 5000.0), true);
        ship.update(&input, DT);

        let thrust = ship.thrust();
        assert!((thrust.x - (1.0 - 3.0)).abs() < 1e-4);
        assert_eq!(thrust.y, 2.0);
    }

    #[test]
    fn init_rejects_invalid_config() {
        let mut input = Input::desktop();
        let mut ship = ShipInput::new(InputConfig {
            max_force: -1.0,
            ..InputConfig::default()
        });
        let err = ship.try_init(&mut input).unwrap_err();
        assert!(matches!(err, InputError::Config(ConfigError::Invalid { field: "max_force", .. })));
        assert!(!ship.is_active());
    }

    #[test]
    fn focus_loss_frees_a_touch_whose_end_never_arrives() {
        let mut input = Input::mobile();
        let mut ship = ShipInput::default();
        assert!(ship.init(&mut input));

        let mut queue = InputQueue::new();
        queue.push(InputEvent::PointerDown { id: 0, x: 5.0, y: 5.0, time: 0.0 });
        queue.push(InputEvent::FocusChanged { focused: false });
        queue.push(InputEvent::FocusChanged { focused: true });
        queue.push(InputEvent::PointerDown { id: 1, x: 0.0, y: 0.0, time: 100.0 });
        queue.push(InputEvent::PointerUp { id: 1, x: 50.0, y: 0.0, time: 150.0 });
        input.pump(&mut queue);
        ship.update(&input, DT);

        assert_eq!(ship.thrust(), Vec2::new(50.0, 0.0));
        assert_eq!(input.touchscreen().unwrap().touch_count(), 0);
    }

    #[test]
    fn pointer_cancel_abandons_the_gesture() {
        let mut input = Input::mobile();
        let mut ship = ShipInput::default();
        assert!(ship.init(&mut input));

        let mut queue = InputQueue::new();
        queue.push(InputEvent::PointerDown { id: 0, x: 0.0, y: 0.0, time: 0.0 });
        queue.push(InputEvent::PointerCancel { id: 0, x: 300.0, y: 0.0, time: 50.0 });
        queue.push(InputEvent::PointerDown { id: 2, x: 10.0, y: 10.0, time: 60.0 });
        queue.push(InputEvent::PointerUp { id: 2, x: 10.0, y: 30.0, time: 90.0 });
        input.pump(&mut queue);
        ship.update(&input, DT);

        // The cancelled drag neither moves the ship nor counts as a swipe.
        assert_eq!(ship.thrust(), Vec2::new(0.0, 20.0));
        assert!(!ship.did_reset());
    }

    #[test]
    fn tilt_drives_thrust() {
        let mut input = Input::mobile();
        let mut ship = ShipInput::new(InputConfig {
            tilt_scale: 10.0,
            ..config()
        });
        assert!(ship.init(&mut input));

        input.dispatch(InputEvent::Acceleration { x: 0.5, y: -0.25, z: -1.0 });
        ship.update(&input, DT);
        assert_eq!(ship.thrust(), Vec2::new(5.0, -2.5));

        input.dispatch(InputEvent::Acceleration { x: 4.0, y: 0.0, z: -1.0 });
        ship.update(&input, DT);
        assert_eq!(ship.thrust(), Vec2::new(10.0, 0.0));

        input.dispatch(InputEvent::Acceleration { x: 0.0, y: 0.0, z: -1.0 });
        ship.update(&input, DT);
        assert_eq!(ship.thrust(), Vec2::ZERO);
    }

    #[test]
    fn tilt_adds_to_held_keys() {
        let mut input = Input::desktop();
        input.set_accelerometer(Some(Accelerometer::new()));
        let mut ship = ShipInput::new(InputConfig {
            tilt_scale: 4.0,
            ..config()
        });
        assert!(ship.init(&mut input));

        key_down(&mut input, KeyCode::ARROW_RIGHT);
        input.dispatch(InputEvent::Acceleration { x: 0.5, y: 0.0, z: 0.0 });
        ship.update(&input, DT);
        assert!((ship.thrust().x - 3.0).abs() < 1e-4);

        // Tilting against the held key cancels it out.
        input.dispatch(InputEvent::Acceleration { x: -0.5, y: 0.0, z: 0.0 });
        ship.update(&input, DT);
        assert!(ship.thrust().x.abs() < 1e-4);
    }
}
