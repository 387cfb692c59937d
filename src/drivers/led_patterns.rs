//! LED pattern engine with declarative, state-parameterised patterns.
//!
//! The device has two indicators: an RGB LED that shows red, orange or
//! green, and a blue LED that mirrors the valve.  Every RGB animation is a
//! [`Pattern`]: a list of `(colour, hold)` steps that either plays once and
//! rests on its last step, or repeats forever.  One [`PatternPlayer`]
//! interprets any pattern against the [`Scheduler`]; the same player type
//! drives the blocking transition animations in [`crate::sequencer`].
//!
//! ## RGB patterns by state
//!
//! | State                 | Pattern                                               |
//! |-----------------------|-------------------------------------------------------|
//! | OFF, SLEEP            | off                                                   |
//! | SLEEP (by timeout)    | 2 red blinks, 76 ms per toggle, then off              |
//! | BATTERY               | red → orange → green (765 ms), settles by level       |
//! | SELECT_THRESHOLD      | green, 103 ms per toggle, forever                     |
//! | SELECT_MULTIPLICATOR  | orange, 103 ms per toggle, forever                    |
//! | CHANGE_THRESHOLD      | `threshold` green blinks (230 ms), 1843 ms pause      |
//! | CHANGE_MULTIPLICATOR  | `multiplicator` orange blinks (240 ms), 1900 ms pause |
//! | SHOW_SOIL_MOISTURE    | `soil moisture` green blinks (240 ms), 1900 ms pause  |
//! | MANUAL                | off (blue LED on, blink-flagged)                      |
//! | ERROR                 | red, 103 ms per toggle, forever (local choice)        |
//! | TRANSITION            | off (owned by the sequencer)                          |
//!
//! ## Blue LED
//!
//! Solid while the valve is open, off while closed.  Always off in OFF,
//! SLEEP and TRANSITION; on and blink-flagged in MANUAL.
//!
//! ## Re-arming
//!
//! [`LedPatternEngine::sync`] is called after every input or timer.  If
//! the state or the pattern it implies changed, the running pattern's
//! timers are cancelled and its generation bumped before the new pattern
//! starts, so no step of an old pattern can land on the new one.

use heapless::Vec;
use log::debug;
use serde::Serialize;

use crate::error::TimerError;
use crate::fsm::StateId;
use crate::fsm::context::BatteryLevel;
use crate::scheduler::{Expired, Scheduler, TimerOwner};
use crate::valve::ValveState;

/// Colours the indicators can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Colour {
    Red,
    Orange,
    Green,
}

// ── Timing (ms) ───────────────────────────────────────────────

pub const BATTERY_HOLD_MS: u32 = 765;
pub const SELECT_TOGGLE_MS: u32 = 103;
pub const THRESHOLD_TOGGLE_MS: u32 = 230;
pub const THRESHOLD_PAUSE_MS: u32 = 1843;
pub const COUNT_TOGGLE_MS: u32 = 240;
pub const COUNT_PAUSE_MS: u32 = 1900;
pub const TIMEOUT_TOGGLE_MS: u32 = 76;

// ═══════════════════════════════════════════════════════════════
//  Pattern description
// ═══════════════════════════════════════════════════════════════

/// Maximum steps in one pattern (9 blinks = 18 toggles + pause fits).
pub const MAX_STEPS: usize = 24;

/// One step: show `colour` (`None` = dark) for `hold_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub colour: Option<Colour>,
    pub hold_ms: u32,
}

/// What happens after the last step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// Play once.  A final step with `hold_ms == 0` is a resting state;
    /// otherwise the pattern finishes when the final hold elapses.
    Once,
    /// Start over from the first step.
    Forever,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    steps: Vec<Step, MAX_STEPS>,
    cycle: Cycle,
}

impl Pattern {
    pub fn new(cycle: Cycle) -> Self {
        Self {
            steps: Vec::new(),
            cycle,
        }
    }

    /// Append a step.
    pub fn then(mut self, colour: Option<Colour>, hold_ms: u32) -> Self {
        let pushed = self.steps.push(Step { colour, hold_ms }).is_ok();
        debug_assert!(pushed, "pattern exceeds {MAX_STEPS} steps");
        self
    }

    /// Append `toggles` alternating steps starting dark: off, on, off, on...
    pub fn toggles(mut self, colour: Colour, toggles: u8, toggle_ms: u32) -> Self {
        for i in 0..toggles {
            let lit = if i % 2 == 1 { Some(colour) } else { None };
            self = self.then(lit, toggle_ms);
        }
        self
    }

    /// Both dark, nothing scheduled.
    pub fn off() -> Self {
        Self::new(Cycle::Once).then(None, 0)
    }

    /// Continuous blink at `toggle_ms` per toggle.
    pub fn blink(colour: Colour, toggle_ms: u32) -> Self {
        Self::new(Cycle::Forever).toggles(colour, 2, toggle_ms)
    }

    /// `count` blinks, a dark pause, repeat.
    pub fn count_blink(colour: Colour, count: u8, toggle_ms: u32, pause_ms: u32) -> Self {
        let max_count = ((MAX_STEPS - 1) / 2) as u8;
        Self::new(Cycle::Forever)
            .toggles(colour, count.min(max_count) * 2, toggle_ms)
            .then(None, pause_ms)
    }

    /// Battery gauge: red → orange → green, then settle on the level colour.
    pub fn battery(level: BatteryLevel) -> Self {
        let sweep = Self::new(Cycle::Once)
            .then(Some(Colour::Red), BATTERY_HOLD_MS)
            .then(Some(Colour::Orange), BATTERY_HOLD_MS);
        match level {
            BatteryLevel::Full => sweep.then(Some(Colour::Green), 0),
            BatteryLevel::Moderate => sweep
                .then(Some(Colour::Green), BATTERY_HOLD_MS)
                .then(Some(Colour::Orange), 0),
            BatteryLevel::Empty => sweep
                .then(Some(Colour::Green), BATTERY_HOLD_MS)
                .then(Some(Colour::Orange), BATTERY_HOLD_MS)
                .then(Some(Colour::Red), 0),
        }
    }

    /// Two quick red blinks marking an automatic sleep.
    pub fn timeout_sleep() -> Self {
        Self::new(Cycle::Once)
            .toggles(Colour::Red, 4, TIMEOUT_TOGGLE_MS)
            .then(None, 0)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn cycle(&self) -> Cycle {
        self.cycle
    }
}

// ═══════════════════════════════════════════════════════════════
//  Pattern player
// ═══════════════════════════════════════════════════════════════

/// Result of starting a pattern or handling one of its timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    /// A step is showing and its hold timer is pending.
    Running,
    /// A `Once` pattern reached its end.
    Finished,
    /// The timer belonged to an earlier pattern and was ignored.
    Stale,
}

/// Generic interpreter for [`Pattern`]s.  Owns exactly the timers tagged
/// with its [`TimerOwner`].
pub struct PatternPlayer {
    owner: TimerOwner,
    pattern: Pattern,
    index: usize,
    generation: u32,
    output: Option<Colour>,
    finished: bool,
}

impl PatternPlayer {
    pub fn new(owner: TimerOwner) -> Self {
        Self {
            owner,
            pattern: Pattern::off(),
            index: 0,
            generation: 0,
            output: None,
            finished: true,
        }
    }

    /// Replace whatever is playing with `pattern`, starting at `now_ms`.
    pub fn start(
        &mut self,
        pattern: Pattern,
        now_ms: u64,
        sched: &mut Scheduler,
    ) -> Result<PlayerStatus, TimerError> {
        self.stop(sched);
        self.pattern = pattern;
        self.index = 0;
        self.finished = false;
        self.enter_step(now_ms, sched)
    }

    /// Cancel pending steps and go dark.
    pub fn stop(&mut self, sched: &mut Scheduler) {
        sched.cancel_owner(self.owner);
        self.generation = self.generation.wrapping_add(1);
        self.output = None;
        self.finished = true;
    }

    /// Advance on one of this player's timers.
    pub fn on_timer(
        &mut self,
        expired: &Expired,
        sched: &mut Scheduler,
    ) -> Result<PlayerStatus, TimerError> {
        if expired.owner != self.owner || expired.generation != self.generation || self.finished
        {
            return Ok(PlayerStatus::Stale);
        }

        self.index += 1;
        if self.index >= self.pattern.steps.len() {
            match self.pattern.cycle {
                Cycle::Forever => self.index = 0,
                Cycle::Once => {
                    self.finished = true;
                    return Ok(PlayerStatus::Finished);
                }
            }
        }
        self.enter_step(expired.due_ms, sched)
    }

    pub fn output(&self) -> Option<Colour> {
        self.output
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn enter_step(&mut self, at_ms: u64, sched: &mut Scheduler) -> Result<PlayerStatus, TimerError> {
        let Some(step) = self.pattern.steps.get(self.index).copied() else {
            self.output = None;
            self.finished = true;
            return Ok(PlayerStatus::Finished);
        };
        self.output = step.colour;

        let last = self.index + 1 == self.pattern.steps.len();
        if self.pattern.cycle == Cycle::Once && last && step.hold_ms == 0 {
            self.finished = true;
            return Ok(PlayerStatus::Finished);
        }

        sched.schedule_once(self.owner, self.generation, at_ms, step.hold_ms)?;
        Ok(PlayerStatus::Running)
    }
}

// ═══════════════════════════════════════════════════════════════
//  LED animation engine
// ═══════════════════════════════════════════════════════════════

/// What the indicators show right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LedOutput {
    /// RGB LED colour, `None` = dark.
    pub rgb: Option<Colour>,
    /// RGB blink flag.  Blinking is rendered as discrete steps, so this
    /// stays `false`; it exists for renderers that animate on their own.
    pub rgb_blink: bool,
    /// Blue LED lit.
    pub blue: bool,
    /// Blue blink flag (manual mode).
    pub blue_blink: bool,
}

impl LedOutput {
    pub const DARK: Self = Self {
        rgb: None,
        rgb_blink: false,
        blue: false,
        blue_blink: false,
    };
}

/// Everything the per-state pattern can depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternInputs {
    pub state: StateId,
    pub opening_threshold: u8,
    pub multiplicator: u8,
    pub soil_moisture: u8,
    pub battery: BatteryLevel,
    pub entered_by_timeout: bool,
}

/// The RGB pattern table.
pub fn rgb_pattern_for(inputs: &PatternInputs) -> Pattern {
    match inputs.state {
        StateId::Off | StateId::Manual | StateId::Transition => Pattern::off(),
        StateId::Sleep if inputs.entered_by_timeout => Pattern::timeout_sleep(),
        StateId::Sleep => Pattern::off(),
        StateId::Battery => Pattern::battery(inputs.battery),
        StateId::SelectThreshold => Pattern::blink(Colour::Green, SELECT_TOGGLE_MS),
        StateId::SelectMultiplicator => Pattern::blink(Colour::Orange, SELECT_TOGGLE_MS),
        StateId::ChangeThreshold => Pattern::count_blink(
            Colour::Green,
            inputs.opening_threshold,
            THRESHOLD_TOGGLE_MS,
            THRESHOLD_PAUSE_MS,
        ),
        StateId::ChangeMultiplicator => Pattern::count_blink(
            Colour::Orange,
            inputs.multiplicator,
            COUNT_TOGGLE_MS,
            COUNT_PAUSE_MS,
        ),
        StateId::ShowSoilMoisture => Pattern::count_blink(
            Colour::Green,
            inputs.soil_moisture,
            COUNT_TOGGLE_MS,
            COUNT_PAUSE_MS,
        ),
        StateId::Error => Pattern::blink(Colour::Red, SELECT_TOGGLE_MS),
    }
}

/// How the blue LED behaves in a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlueMode {
    Dark,
    FollowValve,
    ManualBlink,
}

pub fn blue_mode_for(state: StateId) -> BlueMode {
    match state {
        StateId::Off | StateId::Sleep | StateId::Transition => BlueMode::Dark,
        StateId::Manual => BlueMode::ManualBlink,
        _ => BlueMode::FollowValve,
    }
}

/// Drives the RGB LED from the state table and derives the blue LED.
pub struct LedPatternEngine {
    player: PatternPlayer,
    armed_for: Option<(StateId, Pattern)>,
}

impl Default for LedPatternEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LedPatternEngine {
    pub fn new() -> Self {
        Self {
            player: PatternPlayer::new(TimerOwner::Pattern),
            armed_for: None,
        }
    }

    /// Re-arm if the state or the pattern it implies changed.
    /// Returns `true` if a new pattern was started.
    pub fn sync(
        &mut self,
        inputs: &PatternInputs,
        now_ms: u64,
        sched: &mut Scheduler,
    ) -> Result<bool, TimerError> {
        let pattern = rgb_pattern_for(inputs);
        if let Some((state, armed)) = &self.armed_for {
            if *state == inputs.state && *armed == pattern {
                return Ok(false);
            }
        }
        self.rearm(inputs.state, pattern, now_ms, sched)?;
        Ok(true)
    }

    /// Unconditionally restart for `state` with `pattern`.
    pub fn rearm(
        &mut self,
        state: StateId,
        pattern: Pattern,
        now_ms: u64,
        sched: &mut Scheduler,
    ) -> Result<(), TimerError> {
        debug!(
            "LED: arming {:?} pattern ({} steps, {:?})",
            state,
            pattern.steps().len(),
            pattern.cycle()
        );
        self.armed_for = Some((state, pattern.clone()));
        self.player.start(pattern, now_ms, sched)?;
        Ok(())
    }

    /// Advance the running pattern.
    pub fn on_timer(
        &mut self,
        expired: &Expired,
        sched: &mut Scheduler,
    ) -> Result<PlayerStatus, TimerError> {
        self.player.on_timer(expired, sched)
    }

    /// Stop everything (process teardown).
    pub fn halt(&mut self, sched: &mut Scheduler) {
        self.player.stop(sched);
        self.armed_for = None;
    }

    /// Compose the indicator output for `state` with the valve position.
    pub fn output(&self, state: StateId, valve: ValveState) -> LedOutput {
        let (blue, blue_blink) = match blue_mode_for(state) {
            BlueMode::Dark => (false, false),
            BlueMode::FollowValve => (valve.is_open(), false),
            BlueMode::ManualBlink => (true, true),
        };
        LedOutput {
            rgb: self.player.output(),
            rgb_blink: false,
            blue,
            blue_blink,
        }
    }

    pub fn player(&self) -> &PatternPlayer {
        &self.player
    }
}
