//! Driver facade — the public LED API.
//!
//! [`LedDriver`] owns the LED arena and the PWM capability.  Application
//! threads mutate an instance's desired mode and intensity and enqueue a
//! request; the [`ControlWorker`] is the only context that programs duty
//! or fades.  `stop` is the exception: it takes effect immediately, under
//! the instance lock, so it can never interleave with a half-issued fade.
//!
//! ```text
//!  set_* / start ──▶ LedSlot (params) ──▶ HandoffQueue ──▶ ControlWorker ──▶ PwmPort
//!  stop ────────────────────────────────────────────────────────────────────▶ PwmPort
//!  fade-end ISR ──▶ FadeBinding ─────────▶ HandoffQueue
//! ```

use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::allocator::ChannelAllocator;
use crate::bridge::FadeBinding;
use crate::config::LedConfig;
use crate::error::{DriverError, Result};
use crate::handoff::{Handoff, HandoffQueue};
use crate::led::{ChannelId, LedId, LedMode, LedParams, LedSlot, LedTable};
use crate::worker::ControlWorker;

use super::ports::{ChannelConfig, EventSink, PwmPort};

// ───────────────────────────────────────────────────────────────
// Shared state
// ───────────────────────────────────────────────────────────────

/// State shared between the facade clones and the control worker.
pub(crate) struct Shared<P> {
    pub(crate) port: P,
    pub(crate) table: LedTable,
    pub(crate) queue: &'static HandoffQueue,
    pub(crate) config: LedConfig,
}

/// Opaque reference to a created LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LedHandle {
    id: LedId,
}

impl LedHandle {
    pub const fn id(self) -> LedId {
        self.id
    }
}

// ───────────────────────────────────────────────────────────────
// LedDriver
// ───────────────────────────────────────────────────────────────

/// Cheaply cloneable handle onto the LED pool.
pub struct LedDriver<P: PwmPort> {
    shared: Arc<Shared<P>>,
}

impl<P: PwmPort> Clone for LedDriver<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: PwmPort> LedDriver<P> {
    /// Build the driver around a PWM capability and the handoff queue the
    /// fade-end interrupts will push into.
    ///
    /// Pair it with [`allocator`](Self::allocator) so both share one
    /// configuration.
    pub fn new(port: P, queue: &'static HandoffQueue, config: LedConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "LedDriver: {} channels, {}-bit @ {} Hz, timer {}",
            config.max_channels, config.resolution_bits, config.frequency_hz, config.timer_id
        );
        Ok(Self {
            shared: Arc::new(Shared {
                port,
                table: LedTable::new(),
                queue,
                config,
            }),
        })
    }

    /// The PWM capability the driver programs.
    pub fn port(&self) -> &P {
        &self.shared.port
    }

    pub fn config(&self) -> &LedConfig {
        &self.shared.config
    }

    pub fn max_duty(&self) -> u32 {
        self.shared.config.max_duty()
    }

    /// Build the control worker for this driver.  Exactly one worker
    /// should consume the queue.
    pub fn worker<S: EventSink>(&self, sink: S) -> ControlWorker<P, S> {
        ControlWorker::new(Arc::clone(&self.shared), sink)
    }

    /// Channel allocator sized and timed from this driver's validated
    /// configuration.
    pub fn allocator(&self) -> ChannelAllocator {
        ChannelAllocator::new(&self.shared.config)
    }

    /// Fade completions lost to a saturated queue since boot.
    pub fn dropped_completions(&self) -> u32 {
        self.shared.queue.dropped()
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Create an LED on `gpio`.
    ///
    /// Takes the next free channel from `allocator`, configures it at duty 0
    /// with the fade interrupt routed to this instance.  The channel is only
    /// consumed if configuration succeeds.  Any peripheral failure along the
    /// way, including the one-time timer setup, is an `AllocationFailure`.
    pub fn create(&self, allocator: &ChannelAllocator, gpio: i32) -> Result<LedHandle> {
        let shared = &*self.shared;
        if gpio < 0 || gpio >= shared.config.gpio_count {
            warn!("LedDriver: gpio {} out of range 0..{}", gpio, shared.config.gpio_count);
            return Err(DriverError::InvalidArgument("gpio"));
        }
        if !allocator.matches(&shared.config) {
            warn!("LedDriver: allocator built from a different configuration");
            return Err(DriverError::InvalidArgument("allocator"));
        }

        let channel = allocator.allocate_with(&shared.port, gpio, |channel| {
            shared
                .port
                .configure_channel(&ChannelConfig {
                    channel,
                    gpio,
                    timer_id: shared.config.timer_id,
                    initial_duty: 0,
                })
                .map_err(|e| {
                    error!("LedDriver: ch{} config on gpio {} failed: {}", channel.raw(), gpio, e);
                    DriverError::AllocationFailure(e)
                })?;
            shared
                .port
                .register_fade_callback(
                    channel,
                    FadeBinding::new(shared.queue, LedId::for_channel(channel)),
                )
                .map_err(|e| {
                    error!("LedDriver: ch{} fade callback failed: {}", channel.raw(), e);
                    DriverError::AllocationFailure(e)
                })
        });
        let channel = match channel {
            Err(DriverError::Hw(e)) => return Err(DriverError::AllocationFailure(e)),
            other => other?,
        };

        let id = shared
            .table
            .bind(channel, gpio)
            .ok_or(DriverError::InvalidArgument("channel already bound"))?;
        info!("LedDriver: LED #{} on gpio {} (ch{})", id.index(), gpio, channel.raw());
        Ok(LedHandle { id })
    }

    // ── Mode requests (queued) ────────────────────────────────

    /// Steady output at `intensity` percent.
    pub fn set_continuous(&self, handle: LedHandle, intensity: u8) -> Result<()> {
        self.submit(handle, intensity, |p| p.mode = LedMode::Continuous)
    }

    /// Free-running fade between `intensity` percent and off, each segment
    /// lasting `fade_time_ms`.
    pub fn set_fade(&self, handle: LedHandle, intensity: u8, fade_time_ms: u32) -> Result<()> {
        self.submit(handle, intensity, |p| {
            p.mode = LedMode::Fade;
            p.fade_time_ms = fade_time_ms;
        })
    }

    /// General form: any mode, intensity and fade time at once.
    ///
    /// `Blink` is stored but produces no output.
    pub fn set_mode(
        &self,
        handle: LedHandle,
        mode: LedMode,
        intensity: u8,
        fade_time_ms: u32,
    ) -> Result<()> {
        self.submit(handle, intensity, |p| {
            p.mode = mode;
            p.fade_time_ms = fade_time_ms;
        })
    }

    /// Resume the stored configuration, e.g. after [`stop`](Self::stop).
    pub fn start(&self, handle: LedHandle) -> Result<()> {
        let (slot, _) = self.slot(handle)?;
        let mut params = slot.lock();
        self.enqueue(handle.id)?;
        params.running = true;
        Ok(())
    }

    /// Validate, enqueue, then store and mark running.
    ///
    /// The instance lock is held across the enqueue, so the worker cannot
    /// see the request before the new params, and a rejected request
    /// (`InvalidArgument`, `QueueFull`) leaves the instance untouched.
    fn submit(
        &self,
        handle: LedHandle,
        intensity: u8,
        apply: impl FnOnce(&mut LedParams),
    ) -> Result<()> {
        let (slot, _) = self.slot(handle)?;
        let duty = self.shared.config.duty_for(intensity).inspect_err(|_| {
            warn!("LED #{}: intensity {} rejected", handle.id.index(), intensity);
        })?;

        let mut params = slot.lock();
        self.enqueue(handle.id)?;
        apply(&mut *params);
        params.target_duty = duty;
        params.running = true;
        debug!(
            "LED #{}: {:?} duty={} time={}ms",
            handle.id.index(),
            params.mode,
            duty,
            params.fade_time_ms
        );
        Ok(())
    }

    /// Non-blocking enqueue, retried `enqueue_attempts` times.
    fn enqueue(&self, led: LedId) -> Result<()> {
        let attempts = self.shared.config.enqueue_attempts.max(1);
        for attempt in 1..=attempts {
            match self.shared.queue.try_push(Handoff::request(led)) {
                Ok(()) => return Ok(()),
                Err(_) if attempt < attempts => std::thread::yield_now(),
                Err(e) => {
                    warn!("LED #{}: request not queued after {} attempt(s)", led.index(), attempts);
                    return Err(e);
                }
            }
        }
        Err(DriverError::QueueFull)
    }

    // ── Immediate stop ────────────────────────────────────────

    /// Drive the output to 0 and halt the channel.  Idempotent.
    ///
    /// Late fade completions for a stopped LED are discarded by the worker.
    pub fn stop(&self, handle: LedHandle) -> Result<()> {
        let (slot, channel) = self.slot(handle)?;
        let port = &self.shared.port;

        let mut params = slot.lock();
        params.running = false;
        params.fade_in_flight = false;
        port.set_duty(channel, 0)
            .and_then(|()| port.update_duty(channel))
            .and_then(|()| port.stop(channel))
            .map_err(|e| {
                warn!("LED #{}: stop on ch{} failed: {}", handle.id.index(), channel.raw(), e);
                DriverError::Hw(e)
            })?;
        drop(params);

        info!("LED #{}: stopped", handle.id.index());
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self, handle: LedHandle) -> Result<LedMode> {
        Ok(self.params(handle)?.mode)
    }

    pub fn target_duty(&self, handle: LedHandle) -> Result<u32> {
        Ok(self.params(handle)?.target_duty)
    }

    pub fn fade_time_ms(&self, handle: LedHandle) -> Result<u32> {
        Ok(self.params(handle)?.fade_time_ms)
    }

    pub fn is_running(&self, handle: LedHandle) -> Result<bool> {
        Ok(self.params(handle)?.running)
    }

    pub fn channel(&self, handle: LedHandle) -> Result<ChannelId> {
        Ok(self.slot(handle)?.1)
    }

    pub fn gpio(&self, handle: LedHandle) -> Result<i32> {
        let (slot, _) = self.slot(handle)?;
        slot.gpio().ok_or(DriverError::InvalidArgument("handle"))
    }

    /// Snapshot of an instance's params.
    pub fn params(&self, handle: LedHandle) -> Result<LedParams> {
        Ok(self.slot(handle)?.0.params())
    }

    /// Resolve a handle against this driver's arena.
    fn slot(&self, handle: LedHandle) -> Result<(&LedSlot, ChannelId)> {
        let slot = self
            .shared
            .table
            .get(handle.id)
            .ok_or(DriverError::InvalidArgument("handle"))?;
        let channel = slot.channel().ok_or(DriverError::InvalidArgument("handle"))?;
        Ok((slot, channel))
    }
}
