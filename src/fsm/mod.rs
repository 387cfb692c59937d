//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern ported to Rust:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  StateTable                                                  │
//! │  ┌──────────────────┬──────────┬──────────┬───────────────┐  │
//! │  │ StateId          │ on_enter │ on_exit  │ on_press      │  │
//! │  ├──────────────────┼──────────┼──────────┼───────────────┤  │
//! │  │ Off              │ fn(ctx)  │          │ fn(ctx,press) │  │
//! │  │ Battery          │          │          │ fn(ctx,press) │  │
//! │  │ ...              │          │          │      ...      │  │
//! │  │ Transition       │          │          │ (ignores all) │  │
//! │  └──────────────────┴──────────┴──────────┴───────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The machine is event driven: every classified press is handed to the
//! current state's `on_press`.  The handler may mutate the context and
//! returns an [`Action`]:
//!
//! * `Goto(next)`: the engine runs `on_exit` for the current state, then
//!   `on_enter` for the next, and updates the current pointer.
//! * `Sequence { animation, target }`: the engine moves to the
//!   `Transition` pseudostate at once and hands the action back to the
//!   caller, which plays the animation and later commits `target` through
//!   [`Fsm::force_transition`].
//!
//! `None` means the press was consumed without a state change.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;
use serde::Serialize;

use crate::drivers::button::PressKind;
use crate::sequencer::Animation;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all device states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum StateId {
    Off = 0,
    Battery = 1,
    Manual = 2,
    Sleep = 3,
    SelectThreshold = 4,
    SelectMultiplicator = 5,
    ChangeThreshold = 6,
    ChangeMultiplicator = 7,
    ShowSoilMoisture = 8,
    Error = 9,
    /// Pseudostate held while a transition animation plays.
    Transition = 10,
}

impl StateId {
    /// Total number of states; sizes the table array.
    pub const COUNT: usize = 11;

    pub const ALL: [StateId; Self::COUNT] = [
        Self::Off,
        Self::Battery,
        Self::Manual,
        Self::Sleep,
        Self::SelectThreshold,
        Self::SelectMultiplicator,
        Self::ChangeThreshold,
        Self::ChangeMultiplicator,
        Self::ShowSoilMoisture,
        Self::Error,
        Self::Transition,
    ];

    /// Convert an index back to `StateId`.  Panics on out-of-range in
    /// debug builds; returns `Error` in release (safe fallback).
    pub fn from_index(idx: usize) -> Self {
        match Self::ALL.get(idx) {
            Some(id) => *id,
            None => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Error
            }
        }
    }

    /// States in which the inactivity countdown is halted.
    pub fn is_dormant(self) -> bool {
        matches!(self, Self::Off | Self::Sleep)
    }
}

// ---------------------------------------------------------------------------
// Handler results
// ---------------------------------------------------------------------------

/// What a press handler asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Goto(StateId),
    Sequence { animation: Animation, target: StateId },
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut FsmContext);

/// Signature for the press handler.
pub type PressHandlerFn = fn(&mut FsmContext, PressKind) -> Option<Action>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// A press the presentation layer can offer in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PossibleAction {
    pub press: PressKind,
    pub target: StateId,
    pub hint: &'static str,
}

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array, no heap and no `dyn`.
pub struct StateDescriptor {
    pub id: StateId,
    /// Short identifier used in logs.
    pub name: &'static str,
    /// Display label.
    pub label: &'static str,
    pub description: &'static str,
    pub actions: &'static [PossibleAction],
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_press: PressHandlerFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the state table (array of [`StateDescriptor`]).  The mutable
/// [`FsmContext`] is owned by the caller and threaded through every
/// handler call.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Number of transitions since construction.
    transitions: u64,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
            transitions: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first press.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Dispatch a classified press to the current state.
    ///
    /// Returns the action taken, or `None` if the press caused no state
    /// change.  A returned `Sequence` has already moved the machine into
    /// `Transition`; the caller owns the commit.
    pub fn handle_press(&mut self, press: PressKind, ctx: &mut FsmContext) -> Option<Action> {
        let action = (self.table[self.current].on_press)(ctx, press)?;
        match action {
            Action::Goto(next) => self.force_transition(next, ctx),
            Action::Sequence { .. } => self.force_transition(StateId::Transition, ctx),
        }
        Some(action)
    }

    /// Force an immediate transition (used by the sequencer commit, the
    /// inactivity supervisor and fault entry).  No-op if already there.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut FsmContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    pub fn current_descriptor(&self) -> &StateDescriptor {
        &self.table[self.current]
    }

    pub fn transition_count(&self) -> u64 {
        self.transitions
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut FsmContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.transitions += 1;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
