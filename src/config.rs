//! Driver configuration parameters
//!
//! All tunable parameters for the LED pool.  Defaults match the front-panel
//! board described in [`crate::pins`].

use serde::{Deserialize, Serialize};

use crate::drivers::task_pin::Core;
use crate::error::{DriverError, Result};
use crate::pins;

/// Number of LEDC channels the hardware provides.  Sizes the LED arena and
/// the handoff queue.
pub const MAX_CHANNELS: usize = 8;

/// Highest timer resolution the LEDC peripheral supports.
const MAX_RESOLUTION_BITS: u8 = 20;

/// Smallest stack the control worker is allowed to run with.
const MIN_WORKER_STACK_KB: usize = 2;

/// Core driver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedConfig {
    // --- Channel pool ---
    /// How many LEDs may be created (at most [`MAX_CHANNELS`]).
    pub max_channels: u8,
    /// Valid GPIOs are `0..gpio_count`.
    pub gpio_count: i32,

    // --- Shared timer ---
    /// Duty resolution in bits (13 → 0–8191).
    pub resolution_bits: u8,
    /// PWM frequency in Hz.
    pub frequency_hz: u32,
    /// LEDC timer shared by every channel.
    pub timer_id: u8,

    // --- Handoff ---
    /// Non-blocking enqueue attempts per request before `QueueFull`.
    pub enqueue_attempts: u8,

    // --- Control worker ---
    pub worker_core: Core,
    pub worker_priority: u8,
    pub worker_stack_kb: usize,
}

impl Default for LedConfig {
    fn default() -> Self {
        Self {
            // Channel pool
            max_channels: MAX_CHANNELS as u8,
            gpio_count: pins::GPIO_NUM_MAX,

            // Shared timer
            resolution_bits: pins::LED_PWM_RESOLUTION_BITS,
            frequency_hz: pins::LED_PWM_FREQ_HZ,
            timer_id: pins::LED_TIMER,

            // Handoff
            enqueue_attempts: 1,

            // Control worker
            worker_core: Core::App,
            worker_priority: 5,
            worker_stack_kb: 4,
        }
    }
}

impl LedConfig {
    /// Largest duty value for the configured resolution.
    pub const fn max_duty(&self) -> u32 {
        (1u32 << self.resolution_bits) - 1
    }

    /// Map a 0–100 intensity onto `0..=max_duty`.
    ///
    /// Returns `InvalidArgument` for intensities above 100.
    pub fn duty_for(&self, intensity: u8) -> Result<u32> {
        duty_from_intensity(intensity, self.max_duty())
    }

    /// Reject values the hardware or the arena cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_channels == 0 || self.max_channels as usize > MAX_CHANNELS {
            return Err(DriverError::InvalidArgument("max_channels"));
        }
        if self.resolution_bits == 0 || self.resolution_bits > MAX_RESOLUTION_BITS {
            return Err(DriverError::InvalidArgument("resolution_bits"));
        }
        if self.frequency_hz == 0 {
            return Err(DriverError::InvalidArgument("frequency_hz"));
        }
        if self.gpio_count <= 0 {
            return Err(DriverError::InvalidArgument("gpio_count"));
        }
        if self.enqueue_attempts == 0 {
            return Err(DriverError::InvalidArgument("enqueue_attempts"));
        }
        if self.worker_stack_kb < MIN_WORKER_STACK_KB {
            return Err(DriverError::InvalidArgument("worker_stack_kb"));
        }
        Ok(())
    }
}

/// Linear intensity → duty scale.  `duty(0) = 0`, `duty(100) = max_duty`.
pub fn duty_from_intensity(intensity: u8, max_duty: u32) -> Result<u32> {
    if intensity > 100 {
        return Err(DriverError::InvalidArgument("intensity"));
    }
    Ok((u64::from(intensity) * u64::from(max_duty) / 100) as u32)
}
