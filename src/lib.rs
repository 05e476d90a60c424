//! BLE Remote library.
//!
//! A remote control surface for Bluetooth LE peripherals: the firmware
//! declares a tree of controls (sliders, checkboxes, text fields, color
//! pickers), a client asks for its structure and reads/writes values over
//! a single GATT characteristic.
//!
//! Exposes the pure-logic modules for integration testing. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod config;
pub mod error;
pub mod events;
pub mod gui;
pub mod handler;
pub mod identifier;
pub mod led;
pub mod protocol;
pub mod task_pin;
pub mod value;

pub use config::GuiConfig;
pub use error::{DecodeError, Error, TransmitError};
pub use gui::{GuiBuilder, SharedGui};
pub use protocol::{GattTransport, GuiServer};
pub use value::{Rgbw, Value, ValueType};
