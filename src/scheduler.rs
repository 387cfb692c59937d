//! Timer scheduler — the clock/timer source for every timed behaviour.
//!
//! All timed work in the controller (LED pattern steps, transition
//! animations, the inactivity countdown, the valve notice expiry and the
//! live press sample) is expressed as entries in one [`Scheduler`].  The
//! scheduler never calls back into anyone: the owner of the queue asks
//! for the next expired entry with [`Scheduler::pop_due`] and dispatches it
//! itself, so expiry is processed one entry at a time on a single queue.
//!
//! ```text
//!   schedule_once / schedule_repeating        pop_due(now)
//!   ───────────────────────────────▶  ┌──────────────┐ ──────────▶ Expired
//!   cancel / cancel_owner             │  TimerEntry  │   (earliest due,
//!   ───────────────────────────────▶  │  × MAX       │    FIFO on ties)
//!                                     └──────────────┘
//! ```
//!
//! Time is virtual: callers pass `now_ms` (monotonic milliseconds).  The
//! runtime feeds wall-clock time; tests feed exact values.
//!
//! Every entry carries the `generation` its owner was on when it was
//! scheduled.  Owners bump their generation whenever they restart, and
//! ignore expiries whose generation no longer matches, so a stale timer
//! that slipped past cancellation has no effect.

use heapless::Vec;
use log::debug;

use crate::error::TimerError;

/// Maximum number of pending timers (stack-allocated).
pub const MAX_TIMERS: usize = 16;

/// Opaque handle returned by the schedule calls.
pub type TimerId = u32;

/// Which component a timer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerOwner {
    /// LED animation engine step timer.
    Pattern,
    /// Transition animation sequencer step timer.
    Sequencer,
    /// One-second inactivity countdown tick.
    Inactivity,
    /// Valve notice auto-clear.
    Notification,
    /// Live held-duration sample while the button is down.
    PressSample,
}

/// An entry that reached its due time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expired {
    pub id: TimerId,
    pub owner: TimerOwner,
    pub generation: u32,
    /// The instant the entry was due (not the instant it was popped).
    pub due_ms: u64,
}

#[derive(Debug, Clone)]
struct TimerEntry {
    id: TimerId,
    owner: TimerOwner,
    generation: u32,
    due_ms: u64,
    period_ms: Option<u32>,
    /// Insertion order, used to keep equal-deadline entries FIFO.
    seq: u64,
}

/// Fixed-capacity virtual-time timer queue.
pub struct Scheduler {
    entries: Vec<TimerEntry, MAX_TIMERS>,
    next_id: TimerId,
    next_seq: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
            next_seq: 0,
        }
    }

    /// Fire once, `delay_ms` after `now_ms`.
    pub fn schedule_once(
        &mut self,
        owner: TimerOwner,
        generation: u32,
        now_ms: u64,
        delay_ms: u32,
    ) -> Result<TimerId, TimerError> {
        self.insert(owner, generation, now_ms + delay_ms as u64, None)
    }

    /// Fire every `period_ms`, first at `now_ms + period_ms`.
    pub fn schedule_repeating(
        &mut self,
        owner: TimerOwner,
        generation: u32,
        now_ms: u64,
        period_ms: u32,
    ) -> Result<TimerId, TimerError> {
        if period_ms == 0 {
            return Err(TimerError::ZeroPeriod);
        }
        self.insert(owner, generation, now_ms + period_ms as u64, Some(period_ms))
    }

    /// Remove every timer belonging to `owner`.  Returns how many were removed.
    pub fn cancel_owner(&mut self, owner: TimerOwner) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.owner != owner);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("Scheduler: cancelled {} {:?} timer(s)", removed, owner);
        }
        removed
    }

    /// Drop everything (process teardown).
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of pending timers owned by `owner`.
    pub fn pending(&self, owner: TimerOwner) -> usize {
        self.entries.iter().filter(|e| e.owner == owner).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Earliest pending deadline, if any.
    pub fn next_due(&self) -> Option<u64> {
        self.entries.iter().map(|e| e.due_ms).min()
    }

    /// Take the earliest entry due at or before `now_ms`.
    ///
    /// One-shot entries are removed; repeating entries are re-armed at
    /// `due + period` so a late poll does not drift the cadence.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<Expired> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due_ms <= now_ms)
            .min_by_key(|(_, e)| (e.due_ms, e.seq))
            .map(|(i, _)| i)?;

        let entry = &self.entries[idx];
        let expired = Expired {
            id: entry.id,
            owner: entry.owner,
            generation: entry.generation,
            due_ms: entry.due_ms,
        };

        match entry.period_ms {
            Some(period) => {
                let seq = self.bump_seq();
                let entry = &mut self.entries[idx];
                entry.due_ms += period as u64;
                entry.seq = seq;
            }
            None => {
                self.entries.swap_remove(idx);
            }
        }

        Some(expired)
    }

    // ── Internal ──────────────────────────────────────────────────

    fn insert(
        &mut self,
        owner: TimerOwner,
        generation: u32,
        due_ms: u64,
        period_ms: Option<u32>,
    ) -> Result<TimerId, TimerError> {
        let id = self.next_id;
        let seq = self.bump_seq();
        self.entries
            .push(TimerEntry {
                id,
                owner,
                generation,
                due_ms,
                period_ms,
                seq,
            })
            .map_err(|_| TimerError::QueueFull)?;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        Ok(id)
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
