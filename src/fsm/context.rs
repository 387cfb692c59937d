//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to.  It holds the user settings, the simulated sensor inputs, the
//! valve monitor and the configuration.  Handlers never talk to the LEDs or
//! the timers directly; whatever they change that the outside world must
//! hear about is recorded in [`Effects`] and published by the controller
//! after the handler returns.

use serde::{Deserialize, Serialize};

use crate::config::{
    MULTIPLICATOR_MAX, MULTIPLICATOR_MIN, SystemConfig, THRESHOLD_MAX, THRESHOLD_MIN,
};
use crate::valve::{ValveMonitor, ValveState};

// ---------------------------------------------------------------------------
// External inputs
// ---------------------------------------------------------------------------

/// Battery charge as reported by the (simulated) fuel gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatteryLevel {
    Full,
    Moderate,
    Empty,
}

// ---------------------------------------------------------------------------
// User settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Setting {
    OpeningThreshold,
    Multiplicator,
}

/// Values adjusted from the CHANGE_* states.  Process lifetime only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Soil moisture at or below which the valve opens, `1..=8`.
    pub opening_threshold: u8,
    /// Extra watering time factor in sleep mode, `1..=5`.
    pub multiplicator: u8,
}

/// `value + 1`, wrapping past `max` back to `min`.
pub fn wrap_increment(value: u8, min: u8, max: u8) -> u8 {
    if value >= max || value < min {
        min
    } else {
        value + 1
    }
}

// ---------------------------------------------------------------------------
// Side effects (written by handlers; drained by the controller)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Effects {
    /// Last valve transition caused by the handler.
    pub valve_changed: Option<ValveState>,
    /// Setting that was incremented, with its new value.
    pub setting_changed: Option<(Setting, u8)>,
}

impl Effects {
    pub fn is_empty(&self) -> bool {
        self.valve_changed.is_none() && self.setting_changed.is_none()
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

pub struct FsmContext {
    // -- Settings --
    pub settings: Settings,

    // -- Inputs --
    /// Simulated soil-moisture reading, `1..=9`.
    pub soil_moisture: u8,
    pub battery_level: BatteryLevel,

    // -- Derived --
    pub valve: ValveMonitor,
    /// SLEEP was entered by the inactivity supervisor rather than a press.
    pub entered_by_timeout: bool,

    // -- Configuration --
    pub config: SystemConfig,

    // -- Outputs --
    pub effects: Effects,
}

impl FsmContext {
    pub fn new(config: SystemConfig) -> Self {
        let settings = Settings {
            opening_threshold: config.initial_opening_threshold,
            multiplicator: config.initial_multiplicator,
        };
        let soil_moisture = config.initial_soil_moisture;
        Self {
            valve: ValveMonitor::new(soil_moisture, settings.opening_threshold),
            settings,
            soil_moisture,
            battery_level: config.initial_battery_level,
            entered_by_timeout: false,
            config,
            effects: Effects::default(),
        }
    }

    pub fn valve_state(&self) -> ValveState {
        self.valve.state()
    }

    /// Override the derived valve position.
    pub fn force_valve(&mut self, state: ValveState) {
        if let Some(next) = self.valve.force(state) {
            self.effects.valve_changed = Some(next);
        }
    }

    /// New soil reading; the valve re-derives immediately.
    pub fn set_soil_moisture(&mut self, value: u8) {
        self.soil_moisture = value;
        self.rederive_valve();
    }

    /// Step the opening threshold (wraps 8 → 1) and re-derive the valve.
    pub fn increment_threshold(&mut self) {
        let next = wrap_increment(self.settings.opening_threshold, THRESHOLD_MIN, THRESHOLD_MAX);
        self.settings.opening_threshold = next;
        self.effects.setting_changed = Some((Setting::OpeningThreshold, next));
        self.rederive_valve();
    }

    /// Step the multiplicator (wraps 5 → 1).
    pub fn increment_multiplicator(&mut self) {
        let next = wrap_increment(
            self.settings.multiplicator,
            MULTIPLICATOR_MIN,
            MULTIPLICATOR_MAX,
        );
        self.settings.multiplicator = next;
        self.effects.setting_changed = Some((Setting::Multiplicator, next));
    }

    /// Hand the accumulated effects to the caller and start afresh.
    pub fn take_effects(&mut self) -> Effects {
        core::mem::take(&mut self.effects)
    }

    fn rederive_valve(&mut self) {
        if let Some(next) = self
            .valve
            .recompute(self.soil_moisture, self.settings.opening_threshold)
        {
            self.effects.valve_changed = Some(next);
        }
    }
}
