pub mod input;
pub mod time;

pub use input::{
    Accelerometer, Input, InputEvent, InputQueue, KeyCode, Keyboard, TouchEvent, TouchId,
    TouchPhase, Touchscreen,
};
pub use time::Timestamp;
