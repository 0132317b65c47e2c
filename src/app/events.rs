//! Outbound driver events.
//!
//! The [`ControlWorker`](crate::worker::ControlWorker) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.

use crate::error::HwError;
use crate::led::{ChannelId, LedId};

/// Structured events emitted by the control worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverEvent {
    /// A Continuous request was applied to the channel.
    DutyApplied {
        led: LedId,
        channel: ChannelId,
        duty: u32,
    },

    /// A fade segment was started.
    FadeStarted {
        led: LedId,
        channel: ChannelId,
        target_duty: u32,
        duration_ms: u32,
    },

    /// A request arrived while a fade was still running on the channel.  It
    /// is applied when that fade completes.
    RequestDeferred { led: LedId },

    /// Blink mode has no duty policy yet; the request was accepted and ignored.
    BlinkIgnored { led: LedId },

    /// The instance is stopped; a late handoff was discarded.
    Skipped { led: LedId },

    /// The peripheral rejected a command; the cycle was dropped.
    CycleAbandoned {
        led: LedId,
        channel: ChannelId,
        error: HwError,
    },

    /// A handoff named an LED that does not exist in the arena.
    UnknownLed { led: LedId },
}
