//! Mock adapters for integration tests.
//!
//! Records every event and every indicator frame so tests can assert on
//! the full history, and provides GPIO pins that remember their level
//! after being moved into a driver.

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};

use openvalve::app::events::AppEvent;
use openvalve::app::ports::{EventSink, IndicatorPort};
use openvalve::drivers::led_patterns::{Colour, LedOutput};
use openvalve::fsm::StateId;

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Every `(from, to)` state change, in order.
    pub fn transitions(&self) -> Vec<(StateId, StateId)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::StateChanged { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    /// RGB colour of every published indicator frame, in order.
    pub fn rgb_trace(&self) -> Vec<Option<Colour>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::Indicators(leds) => Some(leds.rgb),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── MockIndicators ────────────────────────────────────────────

#[derive(Default)]
pub struct MockIndicators {
    pub frames: Vec<LedOutput>,
    pub all_off_calls: u32,
}

#[allow(dead_code)]
impl MockIndicators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&LedOutput> {
        self.frames.last()
    }
}

impl IndicatorPort for MockIndicators {
    fn show(&mut self, leds: &LedOutput) {
        self.frames.push(*leds);
    }

    fn all_off(&mut self) {
        self.all_off_calls += 1;
        self.frames.push(LedOutput::DARK);
    }
}

// ── GPIO pins ─────────────────────────────────────────────────

/// Output pin whose level and write count stay observable after the pin
/// has been handed to a driver.
#[derive(Clone, Default)]
pub struct MockPin {
    level: Rc<Cell<bool>>,
    writes: Rc<Cell<u32>>,
}

#[allow(dead_code)]
impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.level.get()
    }

    pub fn writes(&self) -> u32 {
        self.writes.get()
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.level.set(false);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.level.set(true);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

#[derive(Debug)]
pub struct PinFault;

impl embedded_hal::digital::Error for PinFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// A pin whose every write fails.
pub struct BrokenPin;

impl ErrorType for BrokenPin {
    type Error = PinFault;
}

impl OutputPin for BrokenPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Err(PinFault)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Err(PinFault)
    }
}
