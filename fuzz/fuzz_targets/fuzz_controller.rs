//! Fuzz target: `Controller` command streams
//!
//! Decodes the input as a sequence of two-byte instructions (opcode,
//! argument) driving the controller through virtual time, and asserts
//! that it never panics, never leaks timers and never leaves TRANSITION
//! without a running sequence.
//!
//! cargo fuzz run fuzz_controller

#![no_main]

use libfuzzer_sys::fuzz_target;
use openvalve::app::events::AppEvent;
use openvalve::app::ports::EventSink;
use openvalve::app::service::Controller;
use openvalve::config::SystemConfig;
use openvalve::fsm::StateId;
use openvalve::fsm::context::BatteryLevel;
use openvalve::scheduler::TimerOwner;

struct Discard;

impl EventSink for Discard {
    fn emit(&mut self, _event: &AppEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let config = SystemConfig {
        inactivity_timeout_secs: 20,
        ..SystemConfig::default()
    };
    let mut app = Controller::new(config).unwrap();
    let mut sink = Discard;
    let mut now = 0u64;
    app.start(now, &mut sink).unwrap();

    for pair in data.chunks_exact(2) {
        let (op, arg) = (pair[0], u64::from(pair[1]));
        // Errors are acceptable (out-of-range soil); panics are not.
        let _ = match op % 8 {
            0 => app.press_start(now, &mut sink),
            1 => app.press_end(now, &mut sink).map(|_| ()),
            2 => app.press_cancel(now, &mut sink),
            3 => app.set_soil_moisture(pair[1] % 12, now, &mut sink),
            4 => {
                let level = match arg % 3 {
                    0 => BatteryLevel::Full,
                    1 => BatteryLevel::Moderate,
                    _ => BatteryLevel::Empty,
                };
                app.set_battery_level(level, now, &mut sink)
            }
            5 if arg == 0 => app.raise_fault(now, &mut sink),
            _ => {
                now += arg * 20;
                app.advance(now, &mut sink)
            }
        };

        assert_eq!(app.state() == StateId::Transition, app.is_sequence_running());
        assert!(app.pending_timers(TimerOwner::Sequencer) <= 1);
        assert!(app.pending_timers(TimerOwner::Pattern) <= 1);
        assert!(app.pending_timers(TimerOwner::Inactivity) <= 1);
    }
});
