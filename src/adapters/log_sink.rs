//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing worker events to the `log` facade
//! (UART / USB-CDC through `EspLogger` in production, whatever logger the
//! host installs in simulation).  Per-cycle traffic goes out at `debug`,
//! abandoned cycles at `warn`.

use log::{debug, warn};

use crate::app::events::DriverEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`DriverEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &DriverEvent) {
        match *event {
            DriverEvent::DutyApplied { led, channel, duty } => {
                debug!("LED   | #{} ch{} duty={}", led.index(), channel.raw(), duty);
            }
            DriverEvent::FadeStarted {
                led,
                channel,
                target_duty,
                duration_ms,
            } => {
                debug!(
                    "FADE  | #{} ch{} -> {} over {}ms",
                    led.index(),
                    channel.raw(),
                    target_duty,
                    duration_ms
                );
            }
            DriverEvent::RequestDeferred { led } => {
                debug!("DEFER | #{} waits for the running fade", led.index());
            }
            DriverEvent::BlinkIgnored { led } => {
                debug!("BLINK | #{} not implemented, request ignored", led.index());
            }
            DriverEvent::Skipped { led } => {
                debug!("SKIP  | #{} stopped", led.index());
            }
            DriverEvent::CycleAbandoned {
                led,
                channel,
                error,
            } => {
                warn!(
                    "ABORT | #{} ch{} cycle abandoned: {}",
                    led.index(),
                    channel.raw(),
                    error
                );
            }
            DriverEvent::UnknownLed { led } => {
                warn!("ABORT | handoff for unknown LED #{}", led.index());
            }
        }
    }
}
