//! Integration tests for the button → FSM → sequencer → indicators chain.
//!
//! Everything runs against virtual time: the rig owns the clock and only
//! moves it through `wait`, so every timing assertion is exact.

use super::mock_hw::{MockIndicators, RecordingSink};

use openvalve::app::commands::AppCommand;
use openvalve::app::events::AppEvent;
use openvalve::app::service::Controller;
use openvalve::config::SystemConfig;
use openvalve::drivers::button::PressKind;
use openvalve::drivers::led_patterns::{Colour, LedOutput};
use openvalve::fsm::StateId;
use openvalve::fsm::context::{BatteryLevel, Setting};
use openvalve::scheduler::TimerOwner;
use openvalve::sequencer::Animation;
use openvalve::valve::ValveState;

const DOUBLE_GREEN_MS: u64 = 704;
const TRIPLE_RED_MS: u64 = 1920;

struct Rig {
    app: Controller,
    sink: RecordingSink,
    now: u64,
}

impl Rig {
    fn new(config: SystemConfig) -> Self {
        let mut app = Controller::new(config).unwrap();
        let mut sink = RecordingSink::new();
        app.start(0, &mut sink).unwrap();
        Self { app, sink, now: 0 }
    }

    fn default() -> Self {
        Self::new(SystemConfig::default())
    }

    fn wait(&mut self, ms: u64) {
        self.now += ms;
        self.app.advance(self.now, &mut self.sink).unwrap();
    }

    fn press(&mut self, held_ms: u64) -> Option<PressKind> {
        self.app.press_start(self.now, &mut self.sink).unwrap();
        self.wait(held_ms);
        self.app.press_end(self.now, &mut self.sink).unwrap()
    }

    fn short(&mut self) {
        assert_eq!(self.press(200), Some(PressKind::Short));
    }

    fn long(&mut self) {
        assert_eq!(self.press(1500), Some(PressKind::Long));
    }

    fn very_long(&mut self) {
        assert_eq!(self.press(2500), Some(PressKind::VeryLong));
    }

    fn soil(&mut self, value: u8) {
        self.app
            .set_soil_moisture(value, self.now, &mut self.sink)
            .unwrap();
    }

    fn state(&self) -> StateId {
        self.app.state()
    }

    /// SLEEP → BATTERY.
    fn wake(&mut self) {
        assert_eq!(self.state(), StateId::Sleep);
        self.short();
        assert_eq!(self.state(), StateId::Battery);
    }

    /// SLEEP → BATTERY → SELECT_THRESHOLD → CHANGE_THRESHOLD.
    fn into_change_threshold(&mut self) {
        self.wake();
        self.long();
        self.wait(DOUBLE_GREEN_MS);
        assert_eq!(self.state(), StateId::SelectThreshold);
        self.long();
        self.wait(DOUBLE_GREEN_MS);
        assert_eq!(self.state(), StateId::ChangeThreshold);
    }

    /// SLEEP → ... → CHANGE_MULTIPLICATOR.
    fn into_change_multiplicator(&mut self) {
        self.wake();
        self.long();
        self.wait(DOUBLE_GREEN_MS);
        self.short();
        assert_eq!(self.state(), StateId::SelectMultiplicator);
        self.long();
        self.wait(DOUBLE_GREEN_MS);
        assert_eq!(self.state(), StateId::ChangeMultiplicator);
    }
}

// ── Walkthroughs ──────────────────────────────────────────────

#[test]
fn long_press_on_soil_display_opens_valve_manually() {
    let mut rig = Rig::default();
    rig.wake();
    rig.short();
    assert_eq!(rig.state(), StateId::ShowSoilMoisture);
    assert_eq!(rig.app.valve_state(), ValveState::Closed);

    rig.sink.clear();
    rig.long();

    assert_eq!(rig.state(), StateId::Manual);
    assert_eq!(rig.app.valve_state(), ValveState::Open);
    assert!(!rig.app.is_sequence_running());
    assert_eq!(rig.app.pending_timers(TimerOwner::Sequencer), 0);
    assert_eq!(
        rig.sink.transitions(),
        [(StateId::ShowSoilMoisture, StateId::Manual)]
    );
    assert!(rig.sink.contains(&AppEvent::ValveChanged(ValveState::Open)));

    let leds = rig.app.led_output();
    assert_eq!(leds.rgb, None);
    assert!(leds.blue);
    assert!(leds.blue_blink);
}

#[test]
fn very_long_press_in_battery_plays_triple_red_then_turns_off() {
    let mut rig = Rig::default();
    rig.wake();
    rig.soil(2);
    assert_eq!(rig.app.valve_state(), ValveState::Open);

    rig.very_long();
    assert_eq!(rig.state(), StateId::Transition);
    assert!(rig.sink.contains(&AppEvent::SequenceStarted {
        animation: Animation::TripleRed,
        target: StateId::Off,
    }));

    rig.sink.clear();
    rig.wait(TRIPLE_RED_MS - 1);
    assert_eq!(rig.state(), StateId::Transition);
    rig.wait(1);
    assert_eq!(rig.state(), StateId::Off);

    let reds = rig
        .sink
        .rgb_trace()
        .iter()
        .filter(|c| **c == Some(Colour::Red))
        .count();
    assert_eq!(reds, 3);
    assert_eq!(rig.app.valve_state(), ValveState::Closed);
    assert!(rig.sink.contains(&AppEvent::ValveChanged(ValveState::Closed)));
    assert_eq!(rig.app.led_output().rgb, None);
}

#[test]
fn threshold_wraps_from_eight_to_one() {
    let mut rig = Rig::new(SystemConfig {
        initial_opening_threshold: 8,
        ..SystemConfig::default()
    });
    rig.into_change_threshold();
    assert_eq!(rig.app.valve_state(), ValveState::Open);

    rig.sink.clear();
    rig.short();

    assert_eq!(rig.app.settings().opening_threshold, 1);
    assert_eq!(rig.state(), StateId::ChangeThreshold);
    assert!(rig.sink.transitions().is_empty());
    assert!(rig.sink.contains(&AppEvent::SettingChanged {
        setting: Setting::OpeningThreshold,
        value: 1,
    }));
    // Soil 5 is now above the threshold.
    assert_eq!(rig.app.valve_state(), ValveState::Closed);
}

#[test]
fn idle_battery_times_out_to_sleep_with_two_red_blinks() {
    let mut rig = Rig::default();
    rig.wake();
    let entered_at = rig.now;

    rig.wait(3_000_000 - 1);
    assert_eq!(rig.state(), StateId::Battery);
    assert_eq!(rig.app.inactivity_remaining_secs(), 1);

    rig.wait(1);
    assert_eq!(rig.now, entered_at + 3_000_000);
    assert_eq!(rig.state(), StateId::Sleep);
    assert!(rig.app.entered_by_timeout());
    assert!(rig.sink.contains(&AppEvent::InactivityTimeout));
    assert_eq!(rig.app.pending_timers(TimerOwner::Inactivity), 0);

    rig.sink.clear();
    rig.wait(1000);
    assert_eq!(
        rig.sink.rgb_trace(),
        [Some(Colour::Red), None, Some(Colour::Red), None]
    );
    assert_eq!(rig.app.pending_timers(TimerOwner::Pattern), 0);
}

#[test]
fn saving_multiplicator_clears_timeout_flag_and_sleeps_quietly() {
    let mut rig = Rig::new(SystemConfig {
        inactivity_timeout_secs: 5,
        ..SystemConfig::default()
    });
    rig.wake();
    rig.wait(5000);
    assert_eq!(rig.state(), StateId::Sleep);
    assert!(rig.app.entered_by_timeout());
    rig.wait(1000);

    rig.into_change_multiplicator();
    rig.short();
    rig.short();
    assert_eq!(rig.app.settings().multiplicator, 3);
    assert!(rig.app.entered_by_timeout());

    rig.sink.clear();
    rig.long();
    assert_eq!(rig.state(), StateId::Transition);
    assert!(!rig.app.entered_by_timeout());
    rig.wait(DOUBLE_GREEN_MS);
    assert_eq!(rig.state(), StateId::Sleep);
    rig.wait(1000);

    let trace = rig.sink.rgb_trace();
    assert_eq!(
        trace.iter().filter(|c| **c == Some(Colour::Green)).count(),
        2
    );
    assert!(!trace.contains(&Some(Colour::Red)));
    assert_eq!(rig.app.led_output(), LedOutput::DARK);
    assert_eq!(rig.app.pending_timers(TimerOwner::Pattern), 0);
}

// ── Sequencer ─────────────────────────────────────────────────

#[test]
fn double_green_commits_after_704_ms() {
    let mut rig = Rig::default();
    rig.wake();
    rig.long();
    assert_eq!(rig.state(), StateId::Transition);
    assert_eq!(rig.app.snapshot(rig.now).sequence, Some(Animation::DoubleGreen));

    rig.wait(DOUBLE_GREEN_MS - 1);
    assert_eq!(rig.state(), StateId::Transition);
    rig.wait(1);
    assert_eq!(rig.state(), StateId::SelectThreshold);
    assert_eq!(rig.app.pending_timers(TimerOwner::Sequencer), 0);
    assert_eq!(rig.app.pending_timers(TimerOwner::Pattern), 1);
}

#[test]
fn no_timers_left_after_shutdown_sequence() {
    let mut rig = Rig::default();
    rig.wake();
    rig.very_long();
    rig.wait(TRIPLE_RED_MS);
    assert_eq!(rig.state(), StateId::Off);
    for owner in [
        TimerOwner::Pattern,
        TimerOwner::Sequencer,
        TimerOwner::Inactivity,
        TimerOwner::Notification,
        TimerOwner::PressSample,
    ] {
        assert_eq!(rig.app.pending_timers(owner), 0, "{owner:?}");
    }
    assert_eq!(rig.app.next_deadline(), None);
}

#[test]
fn presses_during_transition_are_discarded() {
    let mut rig = Rig::default();
    rig.wake();
    rig.long();
    assert_eq!(rig.state(), StateId::Transition);

    rig.short();
    assert_eq!(rig.state(), StateId::Transition);

    rig.wait(DOUBLE_GREEN_MS - 200);
    assert_eq!(rig.state(), StateId::SelectThreshold);
}

#[test]
fn fault_during_sequence_aborts_without_commit() {
    let mut rig = Rig::default();
    rig.wake();
    rig.very_long();
    rig.wait(500);

    rig.app.raise_fault(rig.now, &mut rig.sink).unwrap();
    assert_eq!(rig.state(), StateId::Error);
    assert!(rig.sink.contains(&AppEvent::SequenceAborted {
        target: StateId::Off
    }));
    assert!(!rig.app.is_sequence_running());
    assert_eq!(rig.app.pending_timers(TimerOwner::Sequencer), 0);

    rig.wait(TRIPLE_RED_MS);
    assert_eq!(rig.state(), StateId::Error);
}

// ── ERROR ─────────────────────────────────────────────────────

#[test]
fn error_blinks_red_and_only_resets_to_off() {
    let mut rig = Rig::default();
    rig.wake();
    rig.soil(1);
    rig.app.raise_fault(rig.now, &mut rig.sink).unwrap();
    assert_eq!(rig.state(), StateId::Error);
    assert_eq!(rig.app.pending_timers(TimerOwner::Inactivity), 1);
    assert!(rig.sink.contains(&AppEvent::FaultRaised));

    rig.wait(103);
    assert_eq!(rig.app.led_output().rgb, Some(Colour::Red));
    rig.wait(103);
    assert_eq!(rig.app.led_output().rgb, None);

    rig.short();
    rig.long();
    assert_eq!(rig.state(), StateId::Error);

    rig.very_long();
    assert_eq!(rig.state(), StateId::Off);
    assert_eq!(rig.app.valve_state(), ValveState::Closed);
}

#[test]
fn idle_error_times_out_to_sleep() {
    let mut rig = Rig::new(SystemConfig {
        inactivity_timeout_secs: 5,
        ..SystemConfig::default()
    });
    rig.wake();
    rig.app.raise_fault(rig.now, &mut rig.sink).unwrap();
    assert_eq!(rig.state(), StateId::Error);

    rig.wait(4999);
    assert_eq!(rig.state(), StateId::Error);
    assert!(!rig.app.entered_by_timeout());

    rig.wait(1);
    assert_eq!(rig.state(), StateId::Sleep);
    assert!(rig.app.entered_by_timeout());
    assert!(rig.sink.contains(&AppEvent::InactivityTimeout));
    assert_eq!(
        rig.sink.transitions().last(),
        Some(&(StateId::Error, StateId::Sleep))
    );
    assert_eq!(rig.app.pending_timers(TimerOwner::Inactivity), 0);

    rig.sink.clear();
    rig.wait(1000);
    assert_eq!(
        rig.sink.rgb_trace(),
        [Some(Colour::Red), None, Some(Colour::Red), None]
    );
}

// ── Valve & notice ────────────────────────────────────────────

#[test]
fn soil_change_rederives_valve_without_state_change() {
    let mut rig = Rig::default();
    rig.wake();
    rig.sink.clear();

    rig.soil(3);
    assert_eq!(rig.app.valve_state(), ValveState::Open);
    assert_eq!(rig.state(), StateId::Battery);
    assert!(rig.sink.transitions().is_empty());
    assert!(rig.sink.contains(&AppEvent::SoilMoistureChanged(3)));
    assert!(rig.app.led_output().blue);

    rig.sink.clear();
    rig.soil(3);
    assert!(rig.sink.events.is_empty());

    assert!(rig.app.set_soil_moisture(10, rig.now, &mut rig.sink).is_err());
    assert_eq!(rig.app.soil_moisture(), 3);
}

#[test]
fn manual_valve_stands_until_next_soil_reading() {
    let mut rig = Rig::default();
    rig.wake();
    rig.short();
    rig.long();
    assert_eq!(rig.state(), StateId::Manual);

    rig.wait(10_000);
    assert_eq!(rig.app.valve_state(), ValveState::Open);

    rig.soil(6);
    assert_eq!(rig.state(), StateId::Manual);
    assert_eq!(rig.app.valve_state(), ValveState::Closed);
}

#[test]
fn manual_short_press_closes_valve() {
    let mut rig = Rig::default();
    rig.wake();
    rig.short();
    rig.long();
    rig.sink.clear();

    rig.short();
    assert_eq!(rig.state(), StateId::ShowSoilMoisture);
    assert_eq!(rig.app.valve_state(), ValveState::Closed);
    assert_eq!(rig.app.notice().text, "Valve closed");
}

#[test]
fn notice_clears_after_notification_period() {
    let mut rig = Rig::default();
    rig.wake();
    rig.soil(2);
    let notice = rig.app.notice();
    assert!(notice.visible);
    assert_eq!(notice.text, "Valve opened");

    rig.wait(2199);
    assert!(rig.app.notice().visible);
    rig.wait(1);
    assert!(!rig.app.notice().visible);
    assert_eq!(rig.app.pending_timers(TimerOwner::Notification), 0);
}

#[test]
fn newer_notice_restarts_the_clock() {
    let mut rig = Rig::default();
    rig.wake();
    rig.soil(2);
    rig.wait(2000);
    rig.soil(7);
    assert_eq!(rig.app.notice().text, "Valve closed");

    rig.wait(1000);
    assert!(rig.app.notice().visible);
    rig.wait(1200);
    assert!(!rig.app.notice().visible);
}

// ── Button ────────────────────────────────────────────────────

#[test]
fn press_progress_is_sampled_while_held() {
    let mut rig = Rig::default();
    rig.app.press_start(0, &mut rig.sink).unwrap();
    rig.wait(500);

    let samples: Vec<_> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::PressProgress(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(samples.len(), 26);
    assert_eq!(samples[0].held_ms, 0);
    let last = samples[samples.len() - 1];
    assert_eq!(last.held_ms, 500);
    assert_eq!(last.kind, PressKind::Short);

    let progress = rig.app.snapshot(1250).press.unwrap();
    assert_eq!(progress.kind, PressKind::Long);
    assert!((progress.fraction - 0.5).abs() < 1e-6);

    let capped = rig.app.snapshot(4000).press.unwrap();
    assert_eq!(capped.kind, PressKind::VeryLong);
    assert_eq!(capped.fraction, 1.0);

    rig.app.press_end(500, &mut rig.sink).unwrap();
    assert_eq!(rig.app.pending_timers(TimerOwner::PressSample), 0);
    assert!(rig.app.snapshot(600).press.is_none());
}

#[test]
fn cancelled_press_is_not_classified() {
    let mut rig = Rig::default();
    rig.app.press_start(0, &mut rig.sink).unwrap();
    rig.wait(1500);
    rig.app.press_cancel(rig.now, &mut rig.sink).unwrap();

    assert_eq!(rig.state(), StateId::Sleep);
    assert_eq!(rig.app.pending_timers(TimerOwner::PressSample), 0);
    assert!(rig.sink.contains(&AppEvent::PressEnded));
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::PressClassified(_))),
        0
    );
    assert_eq!(rig.app.press_end(rig.now, &mut rig.sink).unwrap(), None);
}

#[test]
fn second_press_start_while_held_is_ignored() {
    let mut rig = Rig::default();
    rig.app.press_start(0, &mut rig.sink).unwrap();
    rig.wait(1500);
    rig.app.press_start(rig.now, &mut rig.sink).unwrap();
    assert_eq!(rig.app.pending_timers(TimerOwner::PressSample), 1);
    assert_eq!(rig.app.snapshot(rig.now).press.map(|p| p.held_ms), Some(1500));

    rig.wait(100);
    // Held since 0, so 1600 ms is a long press.
    assert_eq!(
        rig.app.press_end(rig.now, &mut rig.sink).unwrap(),
        Some(PressKind::Long)
    );
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::PressClassified(_))),
        1
    );
    assert_eq!(rig.app.pending_timers(TimerOwner::PressSample), 0);
}

#[test]
fn release_without_press_is_ignored() {
    let mut rig = Rig::default();
    assert_eq!(rig.app.press_end(100, &mut rig.sink).unwrap(), None);
    assert_eq!(rig.state(), StateId::Sleep);
}

// ── LEDs ──────────────────────────────────────────────────────

#[test]
fn battery_gauge_restarts_when_level_changes() {
    let mut rig = Rig::default();
    rig.wake();
    assert_eq!(rig.app.led_output().rgb, Some(Colour::Red));
    rig.wait(3000);
    assert_eq!(rig.app.led_output().rgb, Some(Colour::Orange));

    rig.app
        .set_battery_level(BatteryLevel::Full, rig.now, &mut rig.sink)
        .unwrap();
    assert_eq!(rig.app.led_output().rgb, Some(Colour::Red));
    rig.wait(2000);
    assert_eq!(rig.app.led_output().rgb, Some(Colour::Green));
    assert!(rig.sink.contains(&AppEvent::BatteryLevelChanged(BatteryLevel::Full)));
}

#[test]
fn indicators_reach_the_port() {
    let mut rig = Rig::default();
    let mut port = MockIndicators::new();
    rig.wake();
    rig.soil(2);
    rig.app.apply_indicators(&mut port);
    let frame = port.last().copied().unwrap();
    assert_eq!(frame.rgb, Some(Colour::Red));
    assert!(frame.blue);
}

// ── Lifecycle ─────────────────────────────────────────────────

#[test]
fn shutdown_command_stops_everything() {
    let mut rig = Rig::default();
    rig.wake();
    rig.app
        .handle_command(AppCommand::Shutdown, rig.now, &mut rig.sink)
        .unwrap();
    assert!(!rig.app.is_running());
    assert_eq!(rig.app.next_deadline(), None);
    assert_eq!(rig.app.led_output(), LedOutput::DARK);
    assert_eq!(rig.sink.events.last(), Some(&AppEvent::Stopped));
}

#[test]
fn snapshot_serialises_current_row() {
    let mut rig = Rig::default();
    rig.wake();
    let json = serde_json::to_string(&rig.app.snapshot(rig.now)).unwrap();
    assert!(json.contains("\"state\":\"Battery\""));
    assert!(json.contains("Display Battery Level"));
    assert!(json.contains("Change irrigation settings"));
}
