//! Core-pinned thread spawning for ESP32-S3 dual-core.
//!
//! Wraps `esp_pthread_set_cfg()` so that `std::thread::spawn` creates a
//! FreeRTOS task pinned to a specific CPU core with explicit priority
//! and stack size. On non-ESP targets, falls back to plain thread spawn.
//!
//! `esp_pthread_set_cfg()` sets thread-local configuration that applies to
//! the *next* `pthread_create()` call from the calling thread, so the
//! config→spawn pair must not be interleaved with other thread creation
//! on the same thread.

use serde::{Deserialize, Serialize};

/// CPU core identifiers for the ESP32-S3 Xtensa LX7 dual-core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU) — protocol stacks (WiFi, BLE, lwIP).
    Pro = 0,
    /// Core 1 (APP_CPU) — application logic, the LED control worker.
    App = 1,
}

/// Spawn a thread pinned to a specific core with explicit priority and stack.
///
/// The `name` parameter must be a null-terminated string (e.g. `"led-ctl\0"`).
#[cfg(target_os = "espidf")]
pub fn spawn_on_core(
    core: Core,
    priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    // SAFETY: the config only applies to the next pthread_create() from this
    // thread, which is the spawn directly below.
    unsafe {
        let mut cfg = esp_idf_svc::sys::esp_create_default_pthread_config();
        cfg.pin_to_core = core as i32;
        cfg.prio = i32::from(priority);
        cfg.stack_size = (stack_kb * 1024) as _;
        cfg.thread_name = name.as_ptr().cast();
        let ret = esp_idf_svc::sys::esp_pthread_set_cfg(&cfg);
        if ret != esp_idf_svc::sys::ESP_OK as i32 {
            return Err(std::io::Error::other(format!(
                "esp_pthread_set_cfg failed: {ret}"
            )));
        }
    }

    let display_name = name.trim_end_matches('\0');
    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        display_name,
        core,
        priority,
        stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .spawn(f)
}

/// Host stacks need more headroom than FreeRTOS tasks for the same code.
#[cfg(not(target_os = "espidf"))]
const SIM_MIN_STACK: usize = 64 * 1024;

/// Simulation fallback — ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(
    _core: Core,
    _priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    let display_name = name.trim_end_matches('\0');
    log::info!(
        "Spawning '{}' (sim, no core pinning, stack={}KB)",
        display_name,
        stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size((stack_kb * 1024).max(SIM_MIN_STACK))
        .spawn(f)
}
