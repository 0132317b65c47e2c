//! Control worker — the single consumer of the handoff queue.
//!
//! Each handoff names one LED.  The worker locks that instance and
//! dispatches on its mode:
//!
//! | Mode         | Action                                                  |
//! |--------------|---------------------------------------------------------|
//! | Continuous   | `set_duty(target)` + `update_duty`                      |
//! | Blink        | nothing (no duty policy yet)                            |
//! | Fade         | `start_fade(target or 0)`, flip `toggle` on success     |
//!
//! A `Request` handoff resets `toggle`, so every new request begins with a
//! rising fade.  While a hardware fade is running the channel is left
//! alone: a request only updates the stored params and the pending
//! fade-end applies them, so each channel has at most one fade chain.
//! Stopped instances and completions with no fade outstanding are skipped.
//! Peripheral errors abandon the cycle: the LED stays where it is until the
//! next explicit request.

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::task::block_on;
#[cfg(not(target_os = "espidf"))]
use futures_lite::future::block_on;

use log::{debug, info, warn};

use crate::app::events::DriverEvent;
use crate::app::ports::{EventSink, PwmPort};
use crate::app::service::Shared;
use crate::drivers::task_pin::spawn_on_core;
use crate::handoff::{Handoff, Origin};
use crate::led::LedMode;

/// Worker counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Handoffs taken off the queue.
    pub processed: u32,
    /// Handoffs for stopped or unknown LEDs.
    pub skipped: u32,
    /// Cycles dropped because the peripheral rejected a command.
    pub abandoned: u32,
}

/// Drains the handoff queue and programs the peripheral.
///
/// Built by [`LedDriver::worker`](crate::app::service::LedDriver::worker).
pub struct ControlWorker<P: PwmPort, S: EventSink> {
    shared: Arc<Shared<P>>,
    sink: S,
    stats: WorkerStats,
}

impl<P: PwmPort, S: EventSink> ControlWorker<P, S> {
    pub(crate) fn new(shared: Arc<Shared<P>>, sink: S) -> Self {
        Self {
            shared,
            sink,
            stats: WorkerStats::default(),
        }
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Handle one handoff and report what happened.
    pub fn process(&mut self, handoff: Handoff) -> DriverEvent {
        self.stats.processed += 1;
        let event = self.step(handoff);

        match event {
            DriverEvent::Skipped { .. } => self.stats.skipped += 1,
            DriverEvent::UnknownLed { led } => {
                warn!("worker: handoff for unknown LED #{}", led.index());
                self.stats.skipped += 1;
            }
            DriverEvent::CycleAbandoned {
                led,
                channel,
                error,
            } => {
                warn!(
                    "worker: LED #{} ch{} cycle abandoned: {}",
                    led.index(),
                    channel.raw(),
                    error
                );
                self.stats.abandoned += 1;
            }
            DriverEvent::BlinkIgnored { led } => {
                debug!("worker: LED #{} blink not implemented", led.index());
            }
            DriverEvent::DutyApplied { .. }
            | DriverEvent::FadeStarted { .. }
            | DriverEvent::RequestDeferred { .. } => {}
        }

        self.sink.emit(&event);
        event
    }

    /// The state machine.  Runs with the instance lock held so `stop`
    /// cannot interleave with a half-issued command.
    fn step(&self, handoff: Handoff) -> DriverEvent {
        let led = handoff.led;
        let Some(slot) = self.shared.table.get(led) else {
            return DriverEvent::UnknownLed { led };
        };
        let Some(channel) = slot.channel() else {
            return DriverEvent::UnknownLed { led };
        };
        let port = &self.shared.port;

        let mut params = slot.lock();
        if !params.running {
            return DriverEvent::Skipped { led };
        }
        match handoff.origin {
            Origin::Request => {
                params.toggle = false;
                if params.fade_in_flight {
                    return DriverEvent::RequestDeferred { led };
                }
            }
            Origin::FadeComplete => {
                if !params.fade_in_flight {
                    return DriverEvent::Skipped { led };
                }
                params.fade_in_flight = false;
            }
        }

        match params.mode {
            LedMode::Continuous => {
                let duty = params.target_duty;
                match port
                    .set_duty(channel, duty)
                    .and_then(|()| port.update_duty(channel))
                {
                    Ok(()) => DriverEvent::DutyApplied { led, channel, duty },
                    Err(error) => DriverEvent::CycleAbandoned {
                        led,
                        channel,
                        error,
                    },
                }
            }
            LedMode::Blink => DriverEvent::BlinkIgnored { led },
            LedMode::Fade => {
                let target_duty = params.next_fade_target();
                let duration_ms = params.fade_time_ms;
                match port.start_fade(channel, target_duty, duration_ms) {
                    Ok(()) => {
                        params.toggle = !params.toggle;
                        params.fade_in_flight = true;
                        DriverEvent::FadeStarted {
                            led,
                            channel,
                            target_duty,
                            duration_ms,
                        }
                    }
                    Err(error) => DriverEvent::CycleAbandoned {
                        led,
                        channel,
                        error,
                    },
                }
            }
        }
    }

    /// Process everything currently queued without blocking.  Returns the
    /// number of handoffs handled.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Some(handoff) = self.shared.queue.try_pop() {
            self.process(handoff);
            handled += 1;
        }
        handled
    }

    /// Block on the queue forever.
    pub fn run(mut self) -> ! {
        info!("worker: control loop running");
        loop {
            let handoff = block_on(self.shared.queue.pop());
            self.process(handoff);
        }
    }
}

impl<P, S> ControlWorker<P, S>
where
    P: PwmPort + 'static,
    S: EventSink + Send + 'static,
{
    /// Run the worker on its own thread, pinned per the configuration.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        let config = &self.shared.config;
        let (core, priority, stack_kb) =
            (config.worker_core, config.worker_priority, config.worker_stack_kb);
        spawn_on_core(core, priority, stack_kb, "led-ctl\0", move || {
            self.run();
        })
    }
}
