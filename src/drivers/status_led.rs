//! Indicator LED driver.
//!
//! Three digital outputs: the red and green dies of the status LED plus
//! the separate blue valve LED.  Orange is red and green together.
//!
//! ## Dual-target design
//!
//! Generic over [`embedded_hal::digital::OutputPin`]: on a board the HAL's
//! GPIO drivers plug in directly; on host/test any mock pin does.
//!
//! Blink flags are not rendered here; a blinking output is already a
//! sequence of steady frames by the time it reaches the driver.

use embedded_hal::digital::{OutputPin, PinState};
use log::warn;

use crate::app::ports::IndicatorPort;
use crate::drivers::led_patterns::{Colour, LedOutput};

pub struct StatusLed<R, G, V> {
    red: R,
    green: G,
    valve: V,
    current: LedOutput,
}

/// (red, green) die states for a status colour.
fn dies(colour: Option<Colour>) -> (bool, bool) {
    match colour {
        None => (false, false),
        Some(Colour::Red) => (true, false),
        Some(Colour::Orange) => (true, true),
        Some(Colour::Green) => (false, true),
    }
}

impl<R, G, V> StatusLed<R, G, V>
where
    R: OutputPin,
    G: OutputPin,
    V: OutputPin,
{
    /// Take ownership of the pins and drive them all low.
    pub fn new(red: R, green: G, valve: V) -> Self {
        let mut led = Self {
            red,
            green,
            valve,
            current: LedOutput::DARK,
        };
        led.write(&LedOutput::DARK);
        led
    }

    pub fn current(&self) -> LedOutput {
        self.current
    }

    /// Give the pins back.
    pub fn release(self) -> (R, G, V) {
        (self.red, self.green, self.valve)
    }

    fn write(&mut self, leds: &LedOutput) {
        let (r, g) = dies(leds.rgb);
        drive(&mut self.red, r, "red");
        drive(&mut self.green, g, "green");
        drive(&mut self.valve, leds.blue, "valve");
        self.current = *leds;
    }
}

fn drive(pin: &mut impl OutputPin, on: bool, name: &str) {
    if let Err(err) = pin.set_state(PinState::from(on)) {
        warn!("failed to drive {name} LED: {err:?}");
    }
}

impl<R, G, V> IndicatorPort for StatusLed<R, G, V>
where
    R: OutputPin,
    G: OutputPin,
    V: OutputPin,
{
    fn show(&mut self, leds: &LedOutput) {
        if *leds != self.current {
            self.write(leds);
        }
    }
}
