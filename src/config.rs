//! System configuration parameters
//!
//! All tunable parameters for the OpenValve controller.  Values live for
//! the process lifetime only; the simulator can load them from a JSON file.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::fsm::context::BatteryLevel;

/// Lowest and highest opening threshold (soil-moisture level).
pub const THRESHOLD_MIN: u8 = 1;
pub const THRESHOLD_MAX: u8 = 8;

/// Lowest and highest multiplicator.
pub const MULTIPLICATOR_MIN: u8 = 1;
pub const MULTIPLICATOR_MAX: u8 = 5;

/// Simulated soil-moisture sensor range (1 = extremely dry, 9 = saturated).
pub const SOIL_MOISTURE_MIN: u8 = 1;
pub const SOIL_MOISTURE_MAX: u8 = 9;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Inactivity ---
    /// Seconds without a press before the device forces itself to sleep
    pub inactivity_timeout_secs: u32,

    // --- Press classification ---
    /// Held duration (ms) at which a press stops being Short
    pub long_press_ms: u32,
    /// Held duration (ms) at which a press becomes VeryLong
    pub very_long_press_ms: u32,
    /// Held duration (ms) reported as 100% press progress
    pub press_progress_full_ms: u32,
    /// Live held-duration sampling period (ms)
    pub press_sample_interval_ms: u32,

    // --- Initial values ---
    /// Opening threshold at power-up (1-8)
    pub initial_opening_threshold: u8,
    /// Multiplicator at power-up (1-5)
    pub initial_multiplicator: u8,
    /// Simulated soil moisture at power-up (1-9)
    pub initial_soil_moisture: u8,
    /// Simulated battery level at power-up
    pub initial_battery_level: BatteryLevel,

    // --- Presentation ---
    /// Lifetime of the "Valve opened/closed" notice (ms)
    pub notification_ms: u32,

    // --- Timing ---
    /// Executor timer resolution (ms)
    pub runtime_tick_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: 3000,

            long_press_ms: 1000,
            very_long_press_ms: 2000,
            press_progress_full_ms: 2500,
            press_sample_interval_ms: 20,

            initial_opening_threshold: 4,
            initial_multiplicator: 1,
            initial_soil_moisture: 5,
            initial_battery_level: BatteryLevel::Moderate,

            notification_ms: 2200,

            runtime_tick_ms: 10,
        }
    }
}

impl SystemConfig {
    /// Reject values the controller cannot operate with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.inactivity_timeout_secs == 0 {
            return Err(Error::Config("inactivity_timeout_secs must be > 0"));
        }
        if self.long_press_ms == 0 || self.long_press_ms >= self.very_long_press_ms {
            return Err(Error::Config(
                "press thresholds must satisfy 0 < long_press_ms < very_long_press_ms",
            ));
        }
        if self.press_progress_full_ms == 0 {
            return Err(Error::Config("press_progress_full_ms must be > 0"));
        }
        if self.press_sample_interval_ms == 0 {
            return Err(Error::Config("press_sample_interval_ms must be > 0"));
        }
        if !(THRESHOLD_MIN..=THRESHOLD_MAX).contains(&self.initial_opening_threshold) {
            return Err(Error::Config("initial_opening_threshold must be 1-8"));
        }
        if !(MULTIPLICATOR_MIN..=MULTIPLICATOR_MAX).contains(&self.initial_multiplicator) {
            return Err(Error::Config("initial_multiplicator must be 1-5"));
        }
        if !(SOIL_MOISTURE_MIN..=SOIL_MOISTURE_MAX).contains(&self.initial_soil_moisture) {
            return Err(Error::Config("initial_soil_moisture must be 1-9"));
        }
        if self.runtime_tick_ms == 0 {
            return Err(Error::Config("runtime_tick_ms must be > 0"));
        }
        Ok(())
    }
}
