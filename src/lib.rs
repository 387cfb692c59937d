//! OpenValve controller library.
//!
//! Exposes the controller core (state machine, LED patterns, transition
//! sequencer, inactivity supervisor, valve derivation) together with the
//! host runtime and adapters, for the simulator binary and for
//! integration testing.  All time is virtual: every operation takes the
//! current time in milliseconds from the caller.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod fsm;
pub mod runtime;
pub mod scheduler;
pub mod sequencer;
pub mod supervisor;
pub mod valve;

pub use error::{Error, Result};
