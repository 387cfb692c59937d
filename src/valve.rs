//! Valve state derivation.
//!
//! The valve is open whenever the soil is at least as dry as the opening
//! threshold: `OPEN <=> soil_moisture <= opening_threshold`.  The value is
//! recomputed on every change of either input, independent of the device
//! state.
//!
//! Button paths can override the derived value: opening into MANUAL,
//! closing out of it, and the close on entering OFF.  An override stands
//! until the next change of soil moisture or threshold, which re-derives.
//!
//! Every change after power-up produces a short-lived notice for the
//! presentation layer; the initial derivation is silent.

use serde::Serialize;

/// Open/closed position of the valve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValveState {
    Open,
    Closed,
}

impl ValveState {
    /// Notice text shown when the valve moves into this state.
    pub fn notice_text(self) -> &'static str {
        match self {
            Self::Open => "Valve opened",
            Self::Closed => "Valve closed",
        }
    }

    pub fn is_open(self) -> bool {
        self == Self::Open
    }
}

/// Pure derivation rule.
pub fn derive(soil_moisture: u8, opening_threshold: u8) -> ValveState {
    if soil_moisture <= opening_threshold {
        ValveState::Open
    } else {
        ValveState::Closed
    }
}

/// Holds the current valve state and reports transitions.
#[derive(Debug, Clone)]
pub struct ValveMonitor {
    state: ValveState,
}

impl ValveMonitor {
    /// Derive the power-up state.  No change is reported for it.
    pub fn new(soil_moisture: u8, opening_threshold: u8) -> Self {
        Self {
            state: derive(soil_moisture, opening_threshold),
        }
    }

    pub fn state(&self) -> ValveState {
        self.state
    }

    /// Re-derive from the inputs.  Returns the new state if it changed.
    pub fn recompute(&mut self, soil_moisture: u8, opening_threshold: u8) -> Option<ValveState> {
        self.set(derive(soil_moisture, opening_threshold))
    }

    /// Override the derived value.  Returns the new state if it changed.
    pub fn force(&mut self, state: ValveState) -> Option<ValveState> {
        self.set(state)
    }

    fn set(&mut self, next: ValveState) -> Option<ValveState> {
        if next == self.state {
            return None;
        }
        self.state = next;
        Some(next)
    }
}

/// Transient notice for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Notice {
    pub text: &'static str,
    pub visible: bool,
}
