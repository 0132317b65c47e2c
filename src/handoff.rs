//! Interrupt-safe handoff queue between producers and the control worker.
//!
//! Producers:
//! - application threads (mode requests from [`LedDriver`](crate::app::service::LedDriver))
//! - the fade-end interrupt ([`FadeBinding`](crate::bridge::FadeBinding))
//!
//! Single consumer: the [`ControlWorker`](crate::worker::ControlWorker).
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ set_* calls │────▶│  Handoff     │     │              │
//! │ (any task)  │     │  Queue       │────▶│ ControlWorker│
//! │ Fade-end ISR│────▶│  (bounded)   │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Capacity is twice the channel count, so a burst of fade completions on
//! every channel plus one pending request per channel always fits.

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::config::MAX_CHANNELS;
use crate::error::{DriverError, Result};
use crate::led::LedId;

/// Queue depth.
pub const QUEUE_DEPTH: usize = 2 * MAX_CHANNELS;

/// Who put the item on the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// An application call changed the instance's configuration.
    Request,
    /// The hardware finished a fade segment.
    FadeComplete,
}

/// One unit of work for the control worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handoff {
    pub led: LedId,
    pub origin: Origin,
}

impl Handoff {
    pub const fn request(led: LedId) -> Self {
        Self {
            led,
            origin: Origin::Request,
        }
    }

    pub const fn fade_complete(led: LedId) -> Self {
        Self {
            led,
            origin: Origin::FadeComplete,
        }
    }
}

/// Bounded MPSC queue of [`Handoff`]s.
///
/// Must live in a `static` (or be leaked) because the fade-end interrupt
/// holds a `&'static` to it.
pub struct HandoffQueue {
    channel: Channel<CriticalSectionRawMutex, Handoff, QUEUE_DEPTH>,
    /// Interrupt pushes that found the queue full.
    dropped: AtomicU32,
}

impl core::fmt::Debug for HandoffQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandoffQueue")
            .field("len", &self.len())
            .field("dropped", &self.dropped())
            .finish()
    }
}

impl Default for HandoffQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl HandoffQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Non-blocking push from task context.
    pub fn try_push(&self, handoff: Handoff) -> Result<()> {
        self.channel
            .try_send(handoff)
            .map_err(|_| DriverError::QueueFull)
    }

    /// Non-blocking push from interrupt context.
    ///
    /// Constant time, no logging, no allocation.  A full queue drops the
    /// handoff and bumps the drop counter.
    #[inline]
    pub fn push_from_isr(&self, handoff: Handoff) -> bool {
        if self.channel.try_send(handoff).is_ok() {
            true
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Wait for the next handoff.  The worker's only blocking point.
    pub async fn pop(&self) -> Handoff {
        self.channel.receive().await
    }

    /// Take the next handoff if one is queued.
    pub fn try_pop(&self) -> Option<Handoff> {
        self.channel.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.channel.is_full()
    }

    /// Interrupt handoffs lost to a full queue since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}
