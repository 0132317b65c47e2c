//! LEDC fader library.
//!
//! A bounded pool of PWM LED channels with steady, fading and (reserved)
//! blink modes.  Fade-end interrupts hand off to a single control worker
//! through a bounded queue, so fades free-run without polling.
//!
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module; the rest builds and tests on the host.

#![deny(unused_must_use)]

pub mod allocator;
pub mod app;
pub mod bridge;
pub mod config;
pub mod handoff;
pub mod led;
pub mod worker;

pub mod adapters;
pub mod drivers;

pub mod error;
pub mod pins;

pub use allocator::ChannelAllocator;
pub use app::service::{LedDriver, LedHandle};
pub use config::LedConfig;
pub use error::{DriverError, HwError};
pub use handoff::HandoffQueue;
pub use led::LedMode;
pub use worker::{ControlWorker, WorkerStats};
