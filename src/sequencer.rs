//! Transition animation sequencer.
//!
//! Some transitions are gated by a short, blocking LED animation.  The
//! state machine has already parked itself in `TRANSITION` (which accepts
//! no presses) when [`Sequencer::begin`] is called; the sequencer plays
//! its pattern on the RGB LED and, when the last hold elapses, hands back
//! the target state exactly once.
//!
//! ```text
//!  DoubleGreen  ░░200░░ ░76░ ▓76▓ ░76░ ▓76▓ ░░200░░ ─▶ commit
//!  TripleRed    ░300░ ▓300▓ ░300░ ▓300▓ ░300░ ▓300▓ ░120░ ─▶ commit
//! ```
//!
//! An aborted sequence (inactivity timeout, fault) never commits: its
//! timers are cancelled and its generation is retired.

use log::{debug, warn};
use serde::Serialize;

use crate::drivers::led_patterns::{Colour, Cycle, Pattern, PatternPlayer, PlayerStatus};
use crate::error::TimerError;
use crate::fsm::StateId;
use crate::scheduler::{Expired, Scheduler, TimerOwner};

pub const DOUBLE_GREEN_LEAD_IN_MS: u32 = 200;
pub const DOUBLE_GREEN_TOGGLE_MS: u32 = 76;
pub const DOUBLE_GREEN_TRAILING_MS: u32 = 200;

pub const TRIPLE_RED_TOGGLE_MS: u32 = 300;
pub const TRIPLE_RED_TRAILING_MS: u32 = 120;

/// The two blocking animations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Animation {
    /// Menu entry and setting save.
    DoubleGreen,
    /// Shutdown.
    TripleRed,
}

impl Animation {
    pub fn pattern(self) -> Pattern {
        match self {
            Self::DoubleGreen => Pattern::new(Cycle::Once)
                .then(None, DOUBLE_GREEN_LEAD_IN_MS)
                .toggles(Colour::Green, 4, DOUBLE_GREEN_TOGGLE_MS)
                .then(None, DOUBLE_GREEN_TRAILING_MS),
            Self::TripleRed => Pattern::new(Cycle::Once)
                .toggles(Colour::Red, 6, TRIPLE_RED_TOGGLE_MS)
                .then(None, TRIPLE_RED_TRAILING_MS),
        }
    }
}

pub struct Sequencer {
    player: PatternPlayer,
    pending: Option<(Animation, StateId)>,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            player: PatternPlayer::new(TimerOwner::Sequencer),
            pending: None,
        }
    }

    /// Start `animation`; `target` is committed when it finishes.
    pub fn begin(
        &mut self,
        animation: Animation,
        target: StateId,
        now_ms: u64,
        sched: &mut Scheduler,
    ) -> Result<(), TimerError> {
        if let Some((running, dropped)) = self.pending.take() {
            warn!("Sequencer: {:?} -> {:?} replaced before commit", running, dropped);
        }
        debug!("Sequencer: {:?} towards {:?}", animation, target);
        self.pending = Some((animation, target));
        match self.player.start(animation.pattern(), now_ms, sched) {
            Ok(_) => Ok(()),
            Err(e) => {
                self.pending = None;
                Err(e)
            }
        }
    }

    /// Advance on a sequencer timer.  Returns the target when the
    /// animation completes.
    pub fn on_timer(
        &mut self,
        expired: &Expired,
        sched: &mut Scheduler,
    ) -> Result<Option<StateId>, TimerError> {
        match self.player.on_timer(expired, sched)? {
            PlayerStatus::Finished => Ok(self.pending.take().map(|(_, target)| target)),
            PlayerStatus::Running | PlayerStatus::Stale => Ok(None),
        }
    }

    /// Cancel without committing.  Returns the target that was dropped.
    pub fn abort(&mut self, sched: &mut Scheduler) -> Option<StateId> {
        self.player.stop(sched);
        let dropped = self.pending.take().map(|(_, target)| target);
        if let Some(target) = dropped {
            debug!("Sequencer: aborted before commit to {:?}", target);
        }
        dropped
    }

    pub fn is_active(&self) -> bool {
        self.pending.is_some()
    }

    pub fn animation(&self) -> Option<Animation> {
        self.pending.map(|(animation, _)| animation)
    }

    /// RGB colour while the animation plays.
    pub fn output(&self) -> Option<Colour> {
        self.player.output()
    }
}
