//! Channel allocator — owns the LEDC channel pool and the shared timer.
//!
//! Hands out channel ids `0, 1, 2, …` up to the configured maximum and
//! never recycles them: LEDs live for the device lifetime.  The first
//! successful allocation also configures the shared timer and installs the
//! fade service; later allocations skip that step.
//!
//! The allocator is a plain value owned by the composition root and passed
//! by reference into [`LedDriver::create`](crate::app::service::LedDriver::create).
//! One mutex guards both the channel count and the install-once flag, so
//! concurrent creations configure the timer exactly once and never receive
//! the same id.

use std::sync::{Mutex, PoisonError};

use heapless::Vec;
use log::{error, info, warn};

use crate::app::ports::{PwmPort, TimerConfig};
use crate::config::{LedConfig, MAX_CHANNELS};
use crate::error::{DriverError, Result};
use crate::led::ChannelId;

#[derive(Default)]
struct AllocState {
    /// Timer configured and fade service installed.
    installed: bool,
    /// GPIO bound to each allocated channel, indexed by channel id.
    bound: Vec<Option<i32>, MAX_CHANNELS>,
}

/// Process-wide channel pool.
pub struct ChannelAllocator {
    capacity: usize,
    timer: TimerConfig,
    state: Mutex<AllocState>,
}

impl ChannelAllocator {
    /// Build an allocator for a validated configuration.
    pub fn new(config: &LedConfig) -> Self {
        Self {
            capacity: (config.max_channels as usize).min(MAX_CHANNELS),
            timer: TimerConfig {
                timer_id: config.timer_id,
                resolution_bits: config.resolution_bits,
                frequency_hz: config.frequency_hz,
            },
            state: Mutex::new(AllocState::default()),
        }
    }

    /// Whether this allocator was built from a configuration with the same
    /// pool size and timer as `config`.
    pub fn matches(&self, config: &LedConfig) -> bool {
        self.capacity == usize::from(config.max_channels)
            && self.timer.timer_id == config.timer_id
            && self.timer.resolution_bits == config.resolution_bits
            && self.timer.frequency_hz == config.frequency_hz
    }

    /// Allocate the next free channel.
    pub fn allocate<P: PwmPort + ?Sized>(&self, port: &P) -> Result<ChannelId> {
        self.reserve(port, None, |_| Ok(()))
    }

    /// Allocate the next free channel for `gpio`, running `setup` before the
    /// id is committed.
    ///
    /// `setup` runs under the allocator lock.  If it fails the id stays free
    /// and the error is returned unchanged.
    pub fn allocate_with<P, F>(&self, port: &P, gpio: i32, setup: F) -> Result<ChannelId>
    where
        P: PwmPort + ?Sized,
        F: FnOnce(ChannelId) -> Result<()>,
    {
        self.reserve(port, Some(gpio), setup)
    }

    fn reserve<P, F>(&self, port: &P, gpio: Option<i32>, setup: F) -> Result<ChannelId>
    where
        P: PwmPort + ?Sized,
        F: FnOnce(ChannelId) -> Result<()>,
    {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if state.bound.len() >= self.capacity {
            warn!("allocator: all {} LED channels in use", self.capacity);
            return Err(DriverError::ResourceExhausted);
        }
        if gpio.is_some() && state.bound.contains(&gpio) {
            return Err(DriverError::InvalidArgument("gpio already bound"));
        }

        if !state.installed {
            self.install(port)?;
            state.installed = true;
        }

        let channel = ChannelId::new(state.bound.len() as u8);
        setup(channel)?;
        state
            .bound
            .push(gpio)
            .map_err(|_| DriverError::ResourceExhausted)?;

        info!(
            "allocator: channel {} assigned ({}/{})",
            channel.raw(),
            state.bound.len(),
            self.capacity
        );
        Ok(channel)
    }

    /// One-time timer + fade service setup.  Caller holds the state lock.
    fn install<P: PwmPort + ?Sized>(&self, port: &P) -> Result<()> {
        port.configure_timer(&self.timer).map_err(|e| {
            error!("allocator: timer {} config failed: {}", self.timer.timer_id, e);
            DriverError::Hw(e)
        })?;
        port.install_fade_service().map_err(|e| {
            error!("allocator: fade service install failed: {}", e);
            DriverError::Hw(e)
        })?;
        info!(
            "allocator: timer {} configured ({} Hz, {}-bit), fade service installed",
            self.timer.timer_id, self.timer.frequency_hz, self.timer.resolution_bits
        );
        Ok(())
    }

    /// Channels handed out so far.
    pub fn allocated(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .bound
            .len()
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.allocated()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the shared timer and fade service are set up.
    pub fn is_installed(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .installed
    }

    /// GPIO bound to `channel`, if it was allocated for one.
    pub fn gpio_of(&self, channel: ChannelId) -> Option<i32> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .bound
            .get(channel.index())
            .copied()
            .flatten()
    }
}
