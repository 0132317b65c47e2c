//! Unified error types for the LED driver.
//!
//! A single [`DriverError`] enum is returned from every public call.
//! Variants are `Copy` so they can be reported from the worker through
//! the event sink without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Peripheral errors
// ---------------------------------------------------------------------------

/// The PWM peripheral rejected an operation.
///
/// Wraps the raw `esp_err_t` code.  Host adapters use small negative codes
/// of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwError(pub i32);

impl HwError {
    /// Raw error code as reported by the peripheral layer.
    pub const fn code(self) -> i32 {
        self.0
    }
}

impl fmt::Display for HwError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peripheral error (rc={})", self.0)
    }
}

impl std::error::Error for HwError {}

#[cfg(target_os = "espidf")]
impl From<esp_idf_svc::sys::EspError> for HwError {
    fn from(e: esp_idf_svc::sys::EspError) -> Self {
        Self(e.code())
    }
}

// ---------------------------------------------------------------------------
// Driver errors
// ---------------------------------------------------------------------------

/// Every fallible driver operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// An argument was rejected before any state or hardware was touched.
    /// The `&'static str` names the offending argument.
    InvalidArgument(&'static str),
    /// Every hardware channel is already allocated.
    ResourceExhausted,
    /// Channel setup failed while creating an LED.
    AllocationFailure(HwError),
    /// The handoff queue is saturated.  Non-fatal, the caller may retry.
    QueueFull,
    /// The peripheral rejected a configuration or command.
    Hw(HwError),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(what) => write!(f, "invalid argument: {what}"),
            Self::ResourceExhausted => write!(f, "no free LED channel"),
            Self::AllocationFailure(e) => write!(f, "channel setup failed: {e}"),
            Self::QueueFull => write!(f, "handoff queue full"),
            Self::Hw(e) => write!(f, "hardware: {e}"),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<HwError> for DriverError {
    fn from(e: HwError) -> Self {
        Self::Hw(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Driver-wide `Result` alias.
pub type Result<T> = core::result::Result<T, DriverError>;
