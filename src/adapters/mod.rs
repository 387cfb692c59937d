//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements     | Connects to            |
//! |------------|----------------|------------------------|
//! | `log_sink` | EventSink      | `log` output           |
//! |            | IndicatorPort  | `log` output           |
//! | `time`     | ClockPort      | `std::time::Instant`   |

pub mod log_sink;
pub mod time;
