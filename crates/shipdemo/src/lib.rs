pub mod config;
pub mod controller;
pub mod gesture;

#[cfg(target_arch = "wasm32")]
pub mod bridge;

pub use config::{ConfigError, InputConfig};
pub use controller::{InputError, ShipInput};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("shipdemo-sim initialized");
}
