//! LEDC fader firmware — main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Adapters:  EspLedc (PwmPort)   LogEventSink (EventSink)  │
//! │  ─────────────── Port trait boundary ───────────────      │
//! │  LedDriver (facade) ─▶ HandoffQueue ─▶ ControlWorker      │
//! │  fade-end ISR ─▶ FadeBinding ─┘                           │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use ledc_fader::adapters::ledc::EspLedc;
use ledc_fader::adapters::log_sink::LogEventSink;
use ledc_fader::{HandoffQueue, LedConfig, LedDriver, pins};

/// Handoff queue shared by the fade-end interrupts and the control worker.
static HANDOFF: HandoffQueue = HandoffQueue::new();

/// Heartbeat period of the idle main task.
const HEARTBEAT: Duration = Duration::from_secs(30);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("LEDC fader v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Driver + worker ────────────────────────────────────
    let driver = LedDriver::new(EspLedc::new(), &HANDOFF, LedConfig::default())?;
    let allocator = driver.allocator();
    driver.worker(LogEventSink::new()).spawn()?;

    // ── 3. Board LEDs ─────────────────────────────────────────
    let mut leds = Vec::with_capacity(pins::BOARD_LEDS.len());
    for gpio in pins::BOARD_LEDS {
        match driver.create(&allocator, gpio) {
            Ok(led) => leds.push(led),
            Err(e) => warn!("LED on gpio {} unavailable: {}", gpio, e),
        }
    }
    info!(
        "{} LED(s) ready, {} channel(s) free",
        leds.len(),
        allocator.remaining()
    );

    // ── 4. Demo pattern ───────────────────────────────────────
    // power: steady, activity: breathing, status: dim fade.
    let patterns: [(u8, Option<u32>); 3] = [(60, None), (100, Some(1_000)), (20, Some(2_500))];
    for (led, (intensity, fade)) in leds.iter().zip(patterns) {
        let res = match fade {
            Some(ms) => driver.set_fade(*led, intensity, ms),
            None => driver.set_continuous(*led, intensity),
        };
        if let Err(e) = res {
            warn!("LED #{}: {}", led.id().index(), e);
        }
    }

    // ── 5. Idle ───────────────────────────────────────────────
    loop {
        std::thread::sleep(HEARTBEAT);
        let dropped = driver.dropped_completions();
        if dropped > 0 {
            warn!("{} fade completion(s) dropped so far", dropped);
        }
    }
}
