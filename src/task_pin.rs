//! Named worker threads with explicit stack size and core affinity.
//!
//! On ESP-IDF, `std::thread` is backed by pthreads over FreeRTOS tasks;
//! `esp_pthread_set_cfg()` configures the *next* thread created by the
//! calling thread, so the config→spawn pair must not interleave with other
//! thread creation on the same thread. On the host only the name and
//! stack size apply.

use std::io;
use std::thread::JoinHandle;

/// CPU core identifiers on dual-core ESP32 parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU), shared with the Bluetooth controller.
    Pro = 0,
    /// Core 1 (APP_CPU).
    App = 1,
}

/// How to spawn a worker.
#[derive(Debug, Clone, Copy)]
pub struct WorkerSpec {
    /// Null-terminated task name, e.g. `"gui-tx\0"`.
    pub name: &'static str,
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
}

impl WorkerSpec {
    pub fn display_name(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }
}

#[cfg(target_os = "espidf")]
pub fn spawn_worker(spec: WorkerSpec, f: impl FnOnce() + Send + 'static) -> io::Result<JoinHandle<()>> {
    // SAFETY: the config struct is fully initialised by the IDF helper and
    // `name` is a 'static null-terminated string.
    let ret = unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = spec.core as i32;
        cfg.prio = i32::from(spec.priority);
        cfg.stack_size = (spec.stack_kb * 1024) as i32;
        cfg.thread_name = spec.name.as_ptr().cast();
        esp_idf_sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_sys::ESP_OK as i32 {
        return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
    }

    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        spec.display_name(),
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .spawn(f)
}

/// Host fallback: ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_worker(spec: WorkerSpec, f: impl FnOnce() + Send + 'static) -> io::Result<JoinHandle<()>> {
    log::debug!(
        "Spawning '{}' (host, stack={}KB)",
        spec.display_name(),
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .stack_size(spec.stack_kb * 1024)
        .spawn(f)
}
