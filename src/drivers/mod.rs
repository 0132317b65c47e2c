//! Platform helpers for the control worker.

pub mod task_pin;
