//! Inactivity supervisor.
//!
//! Counts down an inactivity budget once per second while the device is
//! awake (anything but OFF and SLEEP).  Every press edge resets the budget.
//! When it reaches zero the controller forces SLEEP directly, bypassing the
//! transition table and any running sequence.
//!
//! ## Lifecycle
//!
//! 1. Entering an awake state arms the supervisor: budget refilled, a
//!    repeating 1 s [`TimerOwner::Inactivity`] tick scheduled.
//! 2. Each tick decrements the budget.  The tick that reaches zero
//!    reports expiry and disarms.
//! 3. Entering OFF or SLEEP by any path disarms and refills the budget.
//!
//! Ticks from an earlier arming carry an old generation and are ignored.

use log::{debug, info};

use crate::config::SystemConfig;
use crate::error::TimerError;
use crate::scheduler::{Expired, Scheduler, TimerOwner};

pub const TICK_MS: u32 = 1000;

pub struct InactivitySupervisor {
    budget_secs: u32,
    remaining_secs: u32,
    armed: bool,
    generation: u32,
}

impl InactivitySupervisor {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            budget_secs: config.inactivity_timeout_secs,
            remaining_secs: config.inactivity_timeout_secs,
            armed: false,
            generation: 0,
        }
    }

    /// Refill the budget and (re)start the one-second countdown.
    pub fn arm(&mut self, now_ms: u64, sched: &mut Scheduler) -> Result<(), TimerError> {
        self.retire(sched);
        self.armed = true;
        sched.schedule_repeating(TimerOwner::Inactivity, self.generation, now_ms, TICK_MS)?;
        debug!("SUPERVISOR: armed, {}s budget", self.budget_secs);
        Ok(())
    }

    /// Stop counting and refill the budget.
    pub fn disarm(&mut self, sched: &mut Scheduler) {
        self.retire(sched);
        self.armed = false;
    }

    /// A press happened.  Refills the budget; restarts the countdown if armed.
    pub fn reset(&mut self, now_ms: u64, sched: &mut Scheduler) -> Result<(), TimerError> {
        if self.armed {
            self.arm(now_ms, sched)
        } else {
            self.remaining_secs = self.budget_secs;
            Ok(())
        }
    }

    /// Handle one tick.  Returns `true` when the budget ran out.
    pub fn on_tick(&mut self, expired: &Expired, sched: &mut Scheduler) -> bool {
        if !self.armed || expired.generation != self.generation {
            return false;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return false;
        }
        info!("SUPERVISOR: {}s without input, forcing sleep", self.budget_secs);
        self.disarm(sched);
        true
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    fn retire(&mut self, sched: &mut Scheduler) {
        sched.cancel_owner(TimerOwner::Inactivity);
        self.generation = self.generation.wrapping_add(1);
        self.remaining_secs = self.budget_secs;
    }
}
