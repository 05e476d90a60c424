//! BLE Remote firmware: main entry point.
//!
//! Demo peripheral wiring every layer together:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 Adapters (outer ring)                    │
//! │  BleRemote / Router   BluedroidTransport   LogEventSink  │
//! │                                                          │
//! │  ─────────────── Port Trait Boundary ──────────────      │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │ GuiServer (pure logic) · SharedGui · LedRegistry   │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │                                                          │
//! │  OutboundQueue worker (gui-tx)                           │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{info, warn};

use bleremote::adapters::bluedroid::{BleRemote, BluedroidTransport, Router};
use bleremote::adapters::log_sink::LogEventSink;
use bleremote::config::GuiConfig;
use bleremote::gui::{GuiBuilder, SharedGui};
use bleremote::handler::{FnHandler, RefHandler, ValueCell};
use bleremote::led::{ColorChannels, LedRegistry};
use bleremote::protocol::GuiServer;
use bleremote::value::Rgbw;

const HEADING_PERIOD: Duration = Duration::from_secs(1);

fn build_gui(uptime: Arc<Mutex<i32>>) -> SharedGui {
    let brightness = Arc::new(Mutex::new(128));
    SharedGui::new(
        GuiBuilder::new()
            .group("Lights")
            .range(
                "Brightness",
                0,
                255,
                RefHandler::shared(brightness, || info!("brightness changed")),
            )
            .checkbox("Enabled", ValueCell::shared(true))
            .color_field("Cabin", ValueCell::shared(Rgbw::new(255, 160, 40, 0)), "RGBW")
            .drop_down("Mode", &["Steady", "Pulse", "Warp"], ValueCell::shared(0))
            .end_group()
            .group("Device")
            .collapsible(true)
            .text_field("Label", ValueCell::shared(String::from("bridge")))
            .max_length(16)
            .password_field("PIN", ValueCell::shared(String::new()))
            .number_field("Uptime", RefHandler::shared(uptime, || {}))
            .read_only()
            .compass_f32(
                "Heading",
                Arc::new(FnHandler::new(
                    || heading_degrees(Instant::now()),
                    |_: f32| {},
                )),
            )
            .button("Reboot", Arc::new(|| warn!("reboot requested from client")))
            .advanced()
            .end_group()
            .build(),
    )
}

fn heading_degrees(now: Instant) -> f32 {
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    let elapsed = now.duration_since(*START.get_or_init(Instant::now));
    (elapsed.as_secs_f32() * 10.0) % 360.0
}

fn build_leds() -> LedRegistry {
    let mut leds = LedRegistry::new();
    for (name, mask) in [("Warp", "RGB"), ("Impulse", "RGB"), ("Deflector", "RGBW")] {
        leds.add_output(name, ColorChannels::parse(mask), move |c| {
            info!("LED '{name}' -> {c}");
        });
    }
    leds
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("BLE Remote v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let config = GuiConfig::default();
    config.validate()?;

    // ── 3. GUI tree + server ──────────────────────────────────
    let uptime = Arc::new(Mutex::new(0));
    let gui = build_gui(uptime.clone());
    let link = Arc::new(BluedroidTransport::new());
    let server = Arc::new(GuiServer::new(gui, link.clone(), &config)?);
    server.set_event_sink(Arc::new(LogEventSink::new()));

    // ── 4. BLE ────────────────────────────────────────────────
    let router = Router::new(link, server.clone(), Arc::new(build_leds()), &config);
    let mut ble = BleRemote::new(&config);
    ble.start(router)?;

    // ── 5. Main loop: push live readouts ──────────────────────
    let boot = Instant::now();
    loop {
        std::thread::sleep(HEADING_PERIOD);
        *uptime
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) =
            boot.elapsed().as_secs().min(i32::MAX as u64) as i32;
        server.notify_value_change(&["Device", "Uptime"]);
        server.notify_value_change(&["Device", "Heading"]);
    }
}
