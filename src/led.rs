//! LED instances and the fixed arena that holds them.
//!
//! Each created LED occupies one [`LedSlot`] for the device lifetime.
//! Slots are addressed by [`LedId`]; the handoff queue and the interrupt
//! bridge carry ids, never references, so a slot can be looked up from any
//! context without lifetimes crossing the interrupt boundary.
//!
//! ## Field ownership
//!
//! | Field           | Written by                 | Read by          |
//! |-----------------|----------------------------|------------------|
//! | channel, gpio   | `create` (once)            | everyone         |
//! | mode, duty, time| application (`set_*`)      | worker           |
//! | running         | application (`set_*`, stop)| worker           |
//! | toggle          | worker                     | worker           |
//! | fade_in_flight  | worker (set), stop (clear) | worker           |
//!
//! Mutable fields sit behind an instance-local mutex, so concurrent
//! `set_*` calls on one LED never produce a torn combination: the last
//! complete submission wins.

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use crate::config::MAX_CHANNELS;
use crate::error::DriverError;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Index into the hardware channel table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u8);

impl ChannelId {
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index into the LED arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LedId(u8);

impl LedId {
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Arena slot for a freshly allocated channel.  Allocation is
    /// append-only, so the two index spaces coincide.
    pub const fn for_channel(channel: ChannelId) -> Self {
        Self(channel.0)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Operating mode of an LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LedMode {
    /// Steady duty at the target intensity.
    Continuous = 0,
    /// Reserved.  Accepted and stored; the worker leaves the hardware alone.
    Blink = 1,
    /// Free-running fade between the target intensity and off.
    Fade = 2,
}

impl TryFrom<u8> for LedMode {
    type Error = DriverError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::Continuous),
            1 => Ok(Self::Blink),
            2 => Ok(Self::Fade),
            _ => Err(DriverError::InvalidArgument("mode")),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-instance state
// ---------------------------------------------------------------------------

/// Mutable state of one LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedParams {
    pub mode: LedMode,
    /// Always within `0..=max_duty`.
    pub target_duty: u32,
    pub fade_time_ms: u32,
    /// `false` → next fade rises to `target_duty`, `true` → falls to 0.
    pub toggle: bool,
    /// Cleared by `stop`; a stopped LED ignores late fade completions.
    pub running: bool,
    /// A hardware fade was started and its completion has not been handled
    /// yet.  At most one fade per channel is ever outstanding.
    pub fade_in_flight: bool,
}

impl LedParams {
    const IDLE: Self = Self {
        mode: LedMode::Continuous,
        target_duty: 0,
        fade_time_ms: 0,
        toggle: false,
        running: false,
        fade_in_flight: false,
    };

    /// Target of the next fade segment.
    pub fn next_fade_target(&self) -> u32 {
        if self.toggle { 0 } else { self.target_duty }
    }
}

#[derive(Debug, Clone, Copy)]
struct SlotBinding {
    channel: ChannelId,
    gpio: i32,
}

/// One arena slot.  Empty until `create` binds it to a channel.
pub struct LedSlot {
    binding: OnceLock<SlotBinding>,
    params: Mutex<LedParams>,
}

impl LedSlot {
    fn new() -> Self {
        Self {
            binding: OnceLock::new(),
            params: Mutex::new(LedParams::IDLE),
        }
    }

    pub fn channel(&self) -> Option<ChannelId> {
        self.binding.get().map(|b| b.channel)
    }

    pub fn gpio(&self) -> Option<i32> {
        self.binding.get().map(|b| b.gpio)
    }

    /// Lock the instance.  A panic while holding the lock cannot leave the
    /// plain-data params inconsistent, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, LedParams> {
        self.params.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current params.
    pub fn params(&self) -> LedParams {
        *self.lock()
    }
}

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

/// Fixed arena of [`MAX_CHANNELS`] slots.
pub struct LedTable {
    slots: [LedSlot; MAX_CHANNELS],
}

impl Default for LedTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LedTable {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| LedSlot::new()),
        }
    }

    /// Bind the slot for `channel`.  Returns the slot id, or `None` if the
    /// channel is out of range or already bound.
    pub(crate) fn bind(&self, channel: ChannelId, gpio: i32) -> Option<LedId> {
        let led = LedId::for_channel(channel);
        let slot = self.slots.get(led.index())?;
        slot.binding.set(SlotBinding { channel, gpio }).ok()?;
        Some(led)
    }

    /// A bound slot, or `None` for an unknown id.
    pub fn get(&self, led: LedId) -> Option<&LedSlot> {
        self.slots
            .get(led.index())
            .filter(|slot| slot.binding.get().is_some())
    }

    /// Number of bound slots.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.binding.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
