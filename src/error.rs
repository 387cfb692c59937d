//! Unified error types for the OpenValve controller.
//!
//! A single `Error` enum that every subsystem can convert into.  All
//! variants are `Copy` so they pass through the controller and the
//! runtime without allocation.
//!
//! Note that button anomalies (release without press, presses during a
//! transition animation) are not errors: they are consumed silently.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An externally supplied value was rejected.
    Input(InputError),
    /// The timer queue could not accept another entry.
    Timer(TimerError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(e) => write!(f, "input: {e}"),
            Self::Timer(e) => write!(f, "timer: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Input errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    /// Soil moisture outside 1-9.
    SoilMoistureOutOfRange(u8),
    /// The command queue is full; the command was dropped.
    QueueFull,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SoilMoistureOutOfRange(v) => {
                write!(f, "soil moisture {v} outside 1-9")
            }
            Self::QueueFull => write!(f, "command queue full"),
        }
    }
}

impl From<InputError> for Error {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

// ---------------------------------------------------------------------------
// Timer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// Every timer slot is occupied.
    QueueFull,
    /// A repeating timer was requested with a zero period.
    ZeroPeriod,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "timer queue full"),
            Self::ZeroPeriod => write!(f, "repeating timer with zero period"),
        }
    }
}

impl From<TimerError> for Error {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
