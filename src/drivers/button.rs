//! Push-button press classifier.
//!
//! The valve has a single button.  Every interaction is one press: the
//! button goes down (`press_start`), comes back up (`press_end`), and the
//! held duration decides what the press means.
//!
//! ## Classification
//!
//! | Held duration        | Event      |
//! |----------------------|------------|
//! | `d < 1s`             | `Short`    |
//! | `1s <= d < 2s`       | `Long`     |
//! | `d >= 2s`            | `VeryLong` |
//!
//! Boundaries belong to the longer class.  The thresholds come from
//! [`SystemConfig`] so the simulator can be tuned.
//!
//! ## Anomalies
//!
//! A second `press_start` while held is ignored (the original start time
//! stands).  A `press_end` without a start emits nothing.  A `cancel`
//! (finger slides off the button) drops the press without emitting.

use serde::Serialize;

use crate::config::SystemConfig;

/// Classified press events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PressKind {
    Short,
    Long,
    VeryLong,
}

impl PressKind {
    /// Human-readable label shown next to the button while held.
    pub fn label(self) -> &'static str {
        match self {
            Self::Short => "Short Press",
            Self::Long => "Long Press",
            Self::VeryLong => "Very Long Press",
        }
    }
}

/// Live feedback while the button is held.  Not used for classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PressProgress {
    /// Milliseconds since the press started.
    pub held_ms: u64,
    /// What the press would be classified as if released now.
    pub kind: PressKind,
    /// Held duration relative to the progress ring's full scale, 0.0-1.0.
    pub fraction: f32,
}

pub struct PressClassifier {
    long_press_ms: u32,
    very_long_press_ms: u32,
    progress_full_ms: u32,
    pressed_since: Option<u64>,
    ever_pressed: bool,
}

impl PressClassifier {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            long_press_ms: config.long_press_ms,
            very_long_press_ms: config.very_long_press_ms,
            progress_full_ms: config.press_progress_full_ms,
            pressed_since: None,
            ever_pressed: false,
        }
    }

    /// Map a held duration onto a press class.
    pub fn classify(&self, held_ms: u64) -> PressKind {
        if held_ms < self.long_press_ms as u64 {
            PressKind::Short
        } else if held_ms < self.very_long_press_ms as u64 {
            PressKind::Long
        } else {
            PressKind::VeryLong
        }
    }

    /// Button went down.  Returns `false` (and changes nothing) if it was
    /// already down.
    pub fn press_start(&mut self, now_ms: u64) -> bool {
        if self.pressed_since.is_some() {
            return false;
        }
        self.pressed_since = Some(now_ms);
        self.ever_pressed = true;
        true
    }

    /// Button came up.  Returns the classified press, or `None` if there
    /// was no matching `press_start`.
    pub fn press_end(&mut self, now_ms: u64) -> Option<PressKind> {
        let since = self.pressed_since.take()?;
        Some(self.classify(now_ms.saturating_sub(since)))
    }

    /// Abandon the current press without emitting.  Returns `true` if a
    /// press was in progress.
    pub fn cancel(&mut self) -> bool {
        self.pressed_since.take().is_some()
    }

    /// Whether the button has been pressed at least once since power-up.
    pub fn ever_pressed(&self) -> bool {
        self.ever_pressed
    }

    /// Live held-duration sample, `None` while released.
    pub fn progress(&self, now_ms: u64) -> Option<PressProgress> {
        let since = self.pressed_since?;
        let held_ms = now_ms.saturating_sub(since);
        let fraction = (held_ms as f32 / self.progress_full_ms as f32).min(1.0);
        Some(PressProgress {
            held_ms,
            kind: self.classify(held_ms),
            fraction,
        })
    }
}
