//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the controller that owns the valve's state
//! machine, its timers and its indicator output.  All interaction with the
//! outside world happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without real peripherals or a real
//! clock.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
