//! Tunables for the ship input controller, loadable from RON.

use serde::Deserialize;
use shipdemo_engine::KeyCode;

/// Force a held arrow key adds per second.
pub const DEFAULT_FORCE_RAMP: f32 = 600.0;
/// Clamp for every force scalar and thrust component.
pub const DEFAULT_MAX_FORCE: f32 = 1000.0;
/// Thrust per unit of touch drag.
pub const DEFAULT_TOUCH_SCALE: f32 = 1.0;
/// A gesture must finish within this many milliseconds to count as a swipe.
pub const DEFAULT_SWIPE_TIME_MS: f64 = 1000.0;
/// Horizontal travel a swipe needs to request a reset.
pub const DEFAULT_SWIPE_LENGTH: f32 = 100.0;
/// Thrust per g of device tilt.
pub const DEFAULT_TILT_SCALE: f32 = 500.0;
/// Key the controller registers its touchscreen listeners under.
pub const DEFAULT_LISTENER_KEY: u32 = 1;

/// Errors from loading or validating an [`InputConfig`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Parse(String),
    Invalid { field: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(message) => {
                write!(f, "Failed to parse input config: {}", message)
            }
            ConfigError::Invalid { field, reason } => {
                write!(f, "Invalid input config field `{}`: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Browser key codes bound to each ship action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub left: u32,
    pub right: u32,
    pub up: u32,
    pub down: u32,
    pub reset: u32,
}

impl KeyBindings {
    pub fn left(&self) -> KeyCode {
        KeyCode(self.left)
    }

    pub fn right(&self) -> KeyCode {
        KeyCode(self.right)
    }

    pub fn up(&self) -> KeyCode {
        KeyCode(self.up)
    }

    pub fn down(&self) -> KeyCode {
        KeyCode(self.down)
    }

    pub fn reset(&self) -> KeyCode {
        KeyCode(self.reset)
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            left: KeyCode::ARROW_LEFT.0,
            right: KeyCode::ARROW_RIGHT.0,
            up: KeyCode::ARROW_UP.0,
            down: KeyCode::ARROW_DOWN.0,
            reset: KeyCode::R.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub force_ramp: f32,
    pub max_force: f32,
    pub touch_scale: f32,
    pub tilt_scale: f32,
    pub swipe_time_ms: f64,
    pub swipe_length: f32,
    pub listener_key: u32,
    pub keys: KeyBindings,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            force_ramp: DEFAULT_FORCE_RAMP,
            max_force: DEFAULT_MAX_FORCE,
            touch_scale: DEFAULT_TOUCH_SCALE,
            tilt_scale: DEFAULT_TILT_SCALE,
            swipe_time_ms: DEFAULT_SWIPE_TIME_MS,
            swipe_length: DEFAULT_SWIPE_LENGTH,
            listener_key: DEFAULT_LISTENER_KEY,
            keys: KeyBindings::default(),
        }
    }
}

impl InputConfig {
    /// Parse a RON config. Fields left out keep their defaults.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: InputConfig =
            ron::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// NaN fails every check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_force.is_nan() || self.max_force <= 0.0 {
            return Err(invalid("max_force", "must be positive", self.max_force));
        }
        if self.force_ramp.is_nan() || self.force_ramp < 0.0 {
            return Err(invalid("force_ramp", "must not be negative", self.force_ramp));
        }
        if !self.touch_scale.is_finite() {
            return Err(invalid("touch_scale", "must be finite", self.touch_scale));
        }
        if !self.tilt_scale.is_finite() {
            return Err(invalid("tilt_scale", "must be finite", self.tilt_scale));
        }
        if self.swipe_time_ms.is_nan() || self.swipe_time_ms <= 0.0 {
            return Err(invalid("swipe_time_ms", "must be positive", self.swipe_time_ms));
        }
        if self.swipe_length.is_nan() || self.swipe_length <= 0.0 {
            return Err(invalid("swipe_length", "must be positive", self.swipe_length));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, rule: &str, value: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: format!("{}, got {}", rule, value),
    }
}
