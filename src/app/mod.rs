//! Application-facing layer of the LED core.
//!
//! [`service::LedDriver`] is the API application code calls.  All
//! interaction with the LEDC peripheral happens through the **port traits**
//! defined in [`ports`], keeping this layer fully testable without real
//! hardware.

pub mod events;
pub mod ports;
pub mod service;
