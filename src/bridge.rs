//! Interrupt bridge — the only code that runs in interrupt context.
//!
//! When the LEDC peripheral finishes a fade segment, its ISR calls
//! [`FadeBinding::on_fade_end`] for the affected channel.  The bridge hands
//! the instance id to the control worker and returns.  It never touches the
//! peripheral, never logs and never allocates; if the queue is full the
//! continuation is dropped and that LED rests at its last duty until the
//! next explicit request.

use crate::handoff::{Handoff, HandoffQueue};
use crate::led::LedId;

/// Association between a channel's fade-end interrupt and an LED instance.
#[derive(Debug, Clone, Copy)]
pub struct FadeBinding {
    queue: &'static HandoffQueue,
    led: LedId,
}

impl FadeBinding {
    pub const fn new(queue: &'static HandoffQueue, led: LedId) -> Self {
        Self { queue, led }
    }

    pub const fn led(&self) -> LedId {
        self.led
    }

    /// Fade-end handler.  Safe to call from interrupt context.
    ///
    /// Returns `false` if the handoff was dropped.
    #[inline]
    pub fn on_fade_end(&self) -> bool {
        self.queue.push_from_isr(Handoff::fade_complete(self.led))
    }
}
