//! Inbound commands to the controller.
//!
//! These represent actions requested by the outside world (the button,
//! the simulated soil sensor, the demo battery picker) that the
//! [`Controller`](super::service::Controller) interprets and acts upon.
//! Commands carry no timestamp; the consumer stamps them on arrival.

use crate::fsm::context::BatteryLevel;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Button went down.
    PressStart,

    /// Button came up.
    PressEnd,

    /// Press abandoned (finger slid off); nothing is emitted.
    PressCancel,

    /// New soil-moisture reading, `1..=9`.
    SetSoilMoisture(u8),

    /// Battery gauge changed (demo / testing hook).
    SetBatteryLevel(BatteryLevel),

    /// Drive the device into ERROR from any state.
    RaiseFault,

    /// Tear down timers and stop the runtime.
    Shutdown,
}
