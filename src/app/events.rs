//! Outbound application events.
//!
//! The [`Controller`](super::service::Controller) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log them, render them, record them
//! in a test.

use serde::Serialize;

use crate::drivers::button::{PressKind, PressProgress};
use crate::drivers::led_patterns::LedOutput;
use crate::fsm::context::{BatteryLevel, Setting, Settings};
use crate::fsm::{PossibleAction, StateId};
use crate::sequencer::Animation;
use crate::valve::{Notice, ValveState};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The controller has started (carries initial state).
    Started(StateId),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// A press was released and classified.
    PressClassified(PressKind),

    /// Live held-duration sample while the button is down.
    PressProgress(PressProgress),

    /// Button released or press cancelled; progress feedback ends.
    PressEnded,

    SettingChanged { setting: Setting, value: u8 },

    SoilMoistureChanged(u8),

    BatteryLevelChanged(BatteryLevel),

    ValveChanged(ValveState),

    /// Valve notice shown or auto-cleared.
    Notice(Notice),

    /// The composed LED output changed.
    Indicators(LedOutput),

    SequenceStarted { animation: Animation, target: StateId },

    /// A running sequence was cut short; `target` will not be committed.
    SequenceAborted { target: StateId },

    /// The inactivity budget ran out.
    InactivityTimeout,

    FaultRaised,

    /// Timers torn down; no further output.
    Stopped,
}

/// A point-in-time view of everything the presentation layer shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub state: StateId,
    pub label: &'static str,
    pub description: &'static str,
    pub actions: &'static [PossibleAction],
    pub leds: LedOutput,
    pub valve: ValveState,
    pub notice: Notice,
    pub settings: Settings,
    pub soil_moisture: u8,
    pub battery_level: BatteryLevel,
    pub entered_by_timeout: bool,
    pub inactivity_remaining_secs: u32,
    pub press: Option<PressProgress>,
    pub button_ever_pressed: bool,
    pub sequence: Option<Animation>,
}
