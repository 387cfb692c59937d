//! Concrete state handler functions and table builder.
//!
//! Each state is a row of plain `fn` pointers; nothing is boxed.
//!
//! ```text
//!                 ┌────────── VeryLong ──────────┐
//!                 ▼                              │
//!  SLEEP ─Short─▶ BATTERY ◀─Short─▶ SHOW_SOIL ─Long─▶ MANUAL
//!    ▲              │                   ▲               │
//!    │           Long (⁂)               └──── Short ────┘
//!    │              ▼
//!    │      SELECT_THRESHOLD ◀─Short─▶ SELECT_MULTIPLICATOR
//!    │              │ Long (⁂)                │ Long (⁂)
//!    │              ▼                         ▼
//!    │      CHANGE_THRESHOLD           CHANGE_MULTIPLICATOR
//!    │        Short: +1 (wrap)           Short: +1 (wrap)
//!    └────────── Long (⁂) ───────────────────┘
//!
//!  (⁂)  double-green sequence through TRANSITION
//!  VeryLong from BATTERY / SHOW_SOIL / MANUAL / SELECT_*:
//!       triple-red sequence through TRANSITION ──▶ OFF (valve closed)
//!  OFF ─VeryLong─▶ BATTERY        ERROR ─VeryLong─▶ OFF
//! ```

use super::context::FsmContext;
use super::{Action, PossibleAction, StateDescriptor, StateId};
use crate::drivers::button::PressKind;
use crate::sequencer::Animation;
use crate::valve::ValveState;
use log::info;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0 — Off
        StateDescriptor {
            id: StateId::Off,
            name: "OFF",
            label: "OFF",
            description: "Device is off. Valve is closed.",
            actions: OFF_ACTIONS,
            on_enter: Some(off_enter),
            on_exit: None,
            on_press: off_press,
        },
        // Index 1 — Battery
        StateDescriptor {
            id: StateId::Battery,
            name: "BATTERY",
            label: "Display Battery Level",
            description: "The upper LED indicates the battery status: green for full, \
                          orange for medium, and red for low.",
            actions: BATTERY_ACTIONS,
            on_enter: None,
            on_exit: None,
            on_press: battery_press,
        },
        // Index 2 — Manual
        StateDescriptor {
            id: StateId::Manual,
            name: "MANUAL",
            label: "Manually Open",
            description: "The valve has been manually opened. It stays open regardless \
                          of soil moisture until a short press or the inactivity timeout.",
            actions: MANUAL_ACTIONS,
            on_enter: Some(manual_enter),
            on_exit: None,
            on_press: manual_press,
        },
        // Index 3 — Sleep
        StateDescriptor {
            id: StateId::Sleep,
            name: "SLEEP",
            label: "Sleep",
            description: "Sleep mode. The valve opens and closes following the user \
                          settings, reacting slower to soil moisture changes to save battery.",
            actions: SLEEP_ACTIONS,
            on_enter: Some(sleep_enter),
            on_exit: None,
            on_press: sleep_press,
        },
        // Index 4 — SelectThreshold
        StateDescriptor {
            id: StateId::SelectThreshold,
            name: "SELECT_THRESHOLD",
            label: "Select Opening Threshold",
            description: "Choose whether to adjust the opening threshold or the \
                          multiplicator setting.",
            actions: SELECT_THRESHOLD_ACTIONS,
            on_enter: None,
            on_exit: None,
            on_press: select_threshold_press,
        },
        // Index 5 — SelectMultiplicator
        StateDescriptor {
            id: StateId::SelectMultiplicator,
            name: "SELECT_MULTIPLICATOR",
            label: "Select Multiplicator",
            description: "Choose whether to adjust the opening threshold or the \
                          multiplicator setting.",
            actions: SELECT_MULTIPLICATOR_ACTIONS,
            on_enter: None,
            on_exit: None,
            on_press: select_multiplicator_press,
        },
        // Index 6 — ChangeThreshold
        StateDescriptor {
            id: StateId::ChangeThreshold,
            name: "CHANGE_THRESHOLD",
            label: "Opening Threshold:",
            description: "The opening threshold, shown by the number of green blinks \
                          (1-8), defines how dry the soil must get before the valve opens.",
            actions: CHANGE_THRESHOLD_ACTIONS,
            on_enter: None,
            on_exit: None,
            on_press: change_threshold_press,
        },
        // Index 7 — ChangeMultiplicator
        StateDescriptor {
            id: StateId::ChangeMultiplicator,
            name: "CHANGE_MULTIPLICATOR",
            label: "Multiplicator:",
            description: "The multiplicator, shown by the number of orange blinks (1-5), \
                          extends how long the valve stays open in sleep mode after the \
                          threshold is exceeded, by 50% per step.",
            actions: CHANGE_MULTIPLICATOR_ACTIONS,
            on_enter: None,
            on_exit: None,
            on_press: change_multiplicator_press,
        },
        // Index 8 — ShowSoilMoisture
        StateDescriptor {
            id: StateId::ShowSoilMoisture,
            name: "SHOW_SOIL_MOISTURE",
            label: "Display Current Soil Moisture",
            description: "The soil moisture level is shown by the number of green blinks, \
                          from 1 (extremely dry) to 9 (saturated).",
            actions: SHOW_SOIL_MOISTURE_ACTIONS,
            on_enter: None,
            on_exit: None,
            on_press: show_soil_moisture_press,
        },
        // Index 9 — Error
        StateDescriptor {
            id: StateId::Error,
            name: "ERROR",
            label: "Error State",
            description: "An error has occurred. Please reset device.",
            actions: ERROR_ACTIONS,
            on_enter: Some(error_enter),
            on_exit: None,
            on_press: error_press,
        },
        // Index 10 — Transition
        StateDescriptor {
            id: StateId::Transition,
            name: "TRANSITION",
            label: "TRANSITION",
            description: "",
            actions: &[],
            on_enter: None,
            on_exit: None,
            on_press: transition_press,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  Offered actions (presentation layer hints)
// ═══════════════════════════════════════════════════════════════════════════

const OFF_ACTIONS: &[PossibleAction] =
    &[offer(PressKind::VeryLong, StateId::Battery, "Turn on device")];

const BATTERY_ACTIONS: &[PossibleAction] = &[
    offer(PressKind::Short, StateId::ShowSoilMoisture, "Display current soil moisture"),
    offer(PressKind::Long, StateId::SelectThreshold, "Change irrigation settings"),
    offer(PressKind::VeryLong, StateId::Off, "Turn off"),
];

const MANUAL_ACTIONS: &[PossibleAction] = &[
    offer(
        PressKind::Short,
        StateId::ShowSoilMoisture,
        "Close valve and display current soil moisture",
    ),
    offer(PressKind::VeryLong, StateId::Off, "Turn off"),
];

const SLEEP_ACTIONS: &[PossibleAction] = &[offer(PressKind::Short, StateId::Battery, "Wake up")];

const SELECT_THRESHOLD_ACTIONS: &[PossibleAction] = &[
    offer(PressKind::Short, StateId::SelectMultiplicator, "Switch to multiplicator"),
    offer(PressKind::Long, StateId::ChangeThreshold, "Adjust opening threshold"),
    offer(PressKind::VeryLong, StateId::Off, "Turn off"),
];

const SELECT_MULTIPLICATOR_ACTIONS: &[PossibleAction] = &[
    offer(PressKind::Short, StateId::SelectThreshold, "Switch to opening threshold"),
    offer(PressKind::Long, StateId::ChangeMultiplicator, "Adjust multiplicator"),
    offer(PressKind::VeryLong, StateId::Off, "Turn off"),
];

const CHANGE_THRESHOLD_ACTIONS: &[PossibleAction] = &[
    offer(PressKind::Short, StateId::ChangeThreshold, "Increase opening threshold"),
    offer(PressKind::Long, StateId::Sleep, "Save setting and sleep"),
];

const CHANGE_MULTIPLICATOR_ACTIONS: &[PossibleAction] = &[
    offer(PressKind::Short, StateId::ChangeMultiplicator, "Increase multiplicator"),
    offer(PressKind::Long, StateId::Sleep, "Save setting and sleep"),
];

const SHOW_SOIL_MOISTURE_ACTIONS: &[PossibleAction] = &[
    offer(PressKind::Short, StateId::Battery, "Display battery level"),
    offer(PressKind::Long, StateId::Manual, "Open valve manually"),
    offer(PressKind::VeryLong, StateId::Off, "Turn off"),
];

const ERROR_ACTIONS: &[PossibleAction] =
    &[offer(PressKind::VeryLong, StateId::Off, "Reset device")];

const fn offer(press: PressKind, target: StateId, hint: &'static str) -> PossibleAction {
    PossibleAction {
        press,
        target,
        hint,
    }
}

/// Every "turn off" path plays the triple-red sequence into OFF.
fn shutdown() -> Option<Action> {
    Some(Action::Sequence {
        animation: Animation::TripleRed,
        target: StateId::Off,
    })
}

fn confirm_into(target: StateId) -> Option<Action> {
    Some(Action::Sequence {
        animation: Animation::DoubleGreen,
        target,
    })
}

// ═══════════════════════════════════════════════════════════════════════════
//  OFF
// ═══════════════════════════════════════════════════════════════════════════

fn off_enter(ctx: &mut FsmContext) {
    ctx.force_valve(ValveState::Closed);
    info!("OFF: device off, valve closed");
}

fn off_press(_ctx: &mut FsmContext, press: PressKind) -> Option<Action> {
    match press {
        PressKind::VeryLong => Some(Action::Goto(StateId::Battery)),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  BATTERY
// ═══════════════════════════════════════════════════════════════════════════

fn battery_press(_ctx: &mut FsmContext, press: PressKind) -> Option<Action> {
    match press {
        PressKind::Short => Some(Action::Goto(StateId::ShowSoilMoisture)),
        PressKind::Long => confirm_into(StateId::SelectThreshold),
        PressKind::VeryLong => shutdown(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  SHOW_SOIL_MOISTURE / MANUAL
// ═══════════════════════════════════════════════════════════════════════════

fn show_soil_moisture_press(ctx: &mut FsmContext, press: PressKind) -> Option<Action> {
    match press {
        PressKind::Short => Some(Action::Goto(StateId::Battery)),
        // Manual opening only makes sense while the valve is shut.
        PressKind::Long if ctx.valve_state() == ValveState::Closed => {
            ctx.force_valve(ValveState::Open);
            Some(Action::Goto(StateId::Manual))
        }
        PressKind::Long => None,
        PressKind::VeryLong => shutdown(),
    }
}

fn manual_enter(ctx: &mut FsmContext) {
    info!(
        "MANUAL: valve {:?} until short press or inactivity timeout",
        ctx.valve_state()
    );
}

fn manual_press(ctx: &mut FsmContext, press: PressKind) -> Option<Action> {
    match press {
        PressKind::Short => {
            ctx.force_valve(ValveState::Closed);
            Some(Action::Goto(StateId::ShowSoilMoisture))
        }
        PressKind::Long => None,
        PressKind::VeryLong => shutdown(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  SLEEP
// ═══════════════════════════════════════════════════════════════════════════

fn sleep_enter(ctx: &mut FsmContext) {
    info!(
        "SLEEP: entered {}",
        if ctx.entered_by_timeout {
            "by inactivity timeout"
        } else {
            "by request"
        }
    );
}

fn sleep_press(_ctx: &mut FsmContext, press: PressKind) -> Option<Action> {
    match press {
        PressKind::Short => Some(Action::Goto(StateId::Battery)),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Settings menu
// ═══════════════════════════════════════════════════════════════════════════

fn select_threshold_press(_ctx: &mut FsmContext, press: PressKind) -> Option<Action> {
    match press {
        PressKind::Short => Some(Action::Goto(StateId::SelectMultiplicator)),
        PressKind::Long => confirm_into(StateId::ChangeThreshold),
        PressKind::VeryLong => shutdown(),
    }
}

fn select_multiplicator_press(_ctx: &mut FsmContext, press: PressKind) -> Option<Action> {
    match press {
        PressKind::Short => Some(Action::Goto(StateId::SelectThreshold)),
        PressKind::Long => confirm_into(StateId::ChangeMultiplicator),
        PressKind::VeryLong => shutdown(),
    }
}

fn change_threshold_press(ctx: &mut FsmContext, press: PressKind) -> Option<Action> {
    match press {
        PressKind::Short => {
            ctx.increment_threshold();
            info!("CHANGE_THRESHOLD: opening threshold now {}", ctx.settings.opening_threshold);
            None
        }
        PressKind::Long => {
            ctx.entered_by_timeout = false;
            confirm_into(StateId::Sleep)
        }
        PressKind::VeryLong => None,
    }
}

fn change_multiplicator_press(ctx: &mut FsmContext, press: PressKind) -> Option<Action> {
    match press {
        PressKind::Short => {
            ctx.increment_multiplicator();
            info!("CHANGE_MULTIPLICATOR: multiplicator now {}", ctx.settings.multiplicator);
            None
        }
        PressKind::Long => {
            ctx.entered_by_timeout = false;
            confirm_into(StateId::Sleep)
        }
        PressKind::VeryLong => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ERROR / TRANSITION
// ═══════════════════════════════════════════════════════════════════════════

fn error_enter(_ctx: &mut FsmContext) {
    log::error!("ERROR: fault raised, very long press resets");
}

fn error_press(_ctx: &mut FsmContext, press: PressKind) -> Option<Action> {
    match press {
        PressKind::VeryLong => Some(Action::Goto(StateId::Off)),
        _ => None,
    }
}

fn transition_press(_ctx: &mut FsmContext, _press: PressKind) -> Option<Action> {
    None
}
