//! Indicator driver against mock GPIO pins.

use super::mock_hw::{BrokenPin, MockPin};

use openvalve::app::ports::IndicatorPort;
use openvalve::drivers::led_patterns::{Colour, LedOutput};
use openvalve::drivers::status_led::StatusLed;

fn pins() -> [MockPin; 3] {
    [MockPin::new(), MockPin::new(), MockPin::new()]
}

fn levels(pins: &[MockPin; 3]) -> [bool; 3] {
    [pins[0].is_high(), pins[1].is_high(), pins[2].is_high()]
}

#[test]
fn starts_with_every_pin_low() {
    let p = pins();
    let led = StatusLed::new(p[0].clone(), p[1].clone(), p[2].clone());
    assert_eq!(levels(&p), [false; 3]);
    assert!(p.iter().all(|pin| pin.writes() == 1));
    assert_eq!(led.current(), LedOutput::DARK);
}

#[test]
fn orange_lights_red_and_green_dies() {
    let p = pins();
    let mut led = StatusLed::new(p[0].clone(), p[1].clone(), p[2].clone());
    led.show(&LedOutput {
        rgb: Some(Colour::Orange),
        ..LedOutput::DARK
    });
    assert_eq!(levels(&p), [true, true, false]);

    led.show(&LedOutput {
        rgb: Some(Colour::Green),
        blue: true,
        ..LedOutput::DARK
    });
    assert_eq!(levels(&p), [false, true, true]);
}

#[test]
fn repeated_frame_is_not_rewritten() {
    let p = pins();
    let mut led = StatusLed::new(p[0].clone(), p[1].clone(), p[2].clone());
    let frame = LedOutput {
        rgb: Some(Colour::Red),
        ..LedOutput::DARK
    };
    led.show(&frame);
    led.show(&frame);
    assert_eq!(p[0].writes(), 2);
}

#[test]
fn all_off_clears_every_pin() {
    let p = pins();
    let mut led = StatusLed::new(p[0].clone(), p[1].clone(), p[2].clone());
    led.show(&LedOutput {
        rgb: Some(Colour::Red),
        rgb_blink: true,
        blue: true,
        blue_blink: true,
    });
    assert_eq!(levels(&p), [true, false, true]);

    led.all_off();
    assert_eq!(levels(&p), [false; 3]);
    let (red, ..) = led.release();
    assert!(!red.is_high());
}

#[test]
fn pin_failures_are_tolerated() {
    let mut led = StatusLed::new(BrokenPin, BrokenPin, BrokenPin);
    let frame = LedOutput {
        rgb: Some(Colour::Red),
        ..LedOutput::DARK
    };
    led.show(&frame);
    assert_eq!(led.current(), frame);
}
