//! Port traits — the boundary between the LED core and the outside world.
//!
//! ```text
//!   LedDriver / ControlWorker ──▶ PwmPort ──▶ Adapter (LEDC, sim, mock)
//!   ControlWorker ──▶ EventSink ──▶ Adapter (log, test recorder)
//! ```
//!
//! The PWM capability is shared by application threads (create, stop) and
//! the control worker, so every method takes `&self` and implementations
//! are `Send + Sync`, handling their own synchronisation.

use crate::bridge::FadeBinding;
use crate::error::HwError;
use crate::led::ChannelId;

use super::events::DriverEvent;

// ───────────────────────────────────────────────────────────────
// Peripheral configuration records
// ───────────────────────────────────────────────────────────────

/// Shared timer setup, applied once on the first channel allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    pub timer_id: u8,
    pub resolution_bits: u8,
    pub frequency_hz: u32,
}

/// Per-channel setup.  Channels are configured with the fade interrupt
/// disabled; the fade-end callback is registered separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub channel: ChannelId,
    pub gpio: i32,
    pub timer_id: u8,
    pub initial_duty: u32,
}

// ───────────────────────────────────────────────────────────────
// PWM port (driven adapter: core → hardware)
// ───────────────────────────────────────────────────────────────

/// Narrow capability over the LEDC peripheral.
pub trait PwmPort: Send + Sync {
    /// Configure the shared timer (frequency, resolution).
    fn configure_timer(&self, timer: &TimerConfig) -> Result<(), HwError>;

    /// Install the fade service shared by all channels.
    /// "Already installed" must be reported as success.
    fn install_fade_service(&self) -> Result<(), HwError>;

    /// Bind a channel to a GPIO and timer at `initial_duty`.
    fn configure_channel(&self, channel: &ChannelConfig) -> Result<(), HwError>;

    /// Latch a new duty value.  Takes effect on [`update_duty`](Self::update_duty).
    fn set_duty(&self, channel: ChannelId, duty: u32) -> Result<(), HwError>;

    /// Apply the latched duty value.
    fn update_duty(&self, channel: ChannelId) -> Result<(), HwError>;

    /// Start a hardware fade towards `target_duty` without waiting for it.
    /// Completion is reported through the registered fade callback.
    fn start_fade(&self, channel: ChannelId, target_duty: u32, duration_ms: u32)
    -> Result<(), HwError>;

    /// Stop the channel output, idling low.
    fn stop(&self, channel: ChannelId) -> Result<(), HwError>;

    /// Route this channel's fade-end interrupt to `binding`.
    fn register_fade_callback(&self, channel: ChannelId, binding: FadeBinding)
    -> Result<(), HwError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: core → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The control worker emits structured [`DriverEvent`]s through this port.
/// Adapters decide where they go (serial log, test recorder, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &DriverEvent);
}
