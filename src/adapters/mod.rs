//! Adapters: concrete implementations of the crate's ports.
//!
//! | Adapter     | Implements     | Connects to                     |
//! |-------------|----------------|---------------------------------|
//! | `bluedroid` | GattTransport  | Bluedroid GATT server (ESP32)   |
//! | `log_sink`  | EventSink      | Serial log output               |

pub mod bluedroid;
pub mod log_sink;
