//! Adapters — concrete implementations of the port traits.
//!
//! | Adapter    | Implements | Connects to                         |
//! |------------|------------|-------------------------------------|
//! | `ledc`     | PwmPort    | ESP-IDF LEDC (`EspLedc`), host sim (`SimLedc`) |
//! | `log_sink` | EventSink  | Serial log output                   |

pub mod ledc;
pub mod log_sink;
