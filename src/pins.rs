//! GPIO / peripheral pin assignments for the LED board.
//!
//! Single source of truth — every caller references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Chip limits
// ---------------------------------------------------------------------------

/// Number of GPIOs on the ESP32-S3 (`GPIO_NUM_MAX`).  Valid pins are
/// `0..GPIO_NUM_MAX`.
pub const GPIO_NUM_MAX: i32 = 49;

// ---------------------------------------------------------------------------
// LED outputs
// ---------------------------------------------------------------------------

/// Front panel "power" LED.
pub const LED_POWER_GPIO: i32 = 11;
/// Front panel "activity" LED (breathing while idle).
pub const LED_ACTIVITY_GPIO: i32 = 12;
/// Front panel "status" LED.
pub const LED_STATUS_GPIO: i32 = 13;

/// All board LEDs in front-panel order.
pub const BOARD_LEDS: [i32; 3] = [LED_POWER_GPIO, LED_ACTIVITY_GPIO, LED_STATUS_GPIO];

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer shared by every LED channel.
pub const LED_TIMER: u8 = 1;
/// LEDC timer resolution (bits).  13-bit gives 0 – 8191 duty levels.
pub const LED_PWM_RESOLUTION_BITS: u8 = 13;
/// LEDC base frequency for the LEDs (5 kHz — flicker-free).
pub const LED_PWM_FREQ_HZ: u32 = 5_000;
