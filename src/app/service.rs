//! Controller — the hexagonal core.
//!
//! [`Controller`] owns every piece of mutable device state: the FSM and its
//! context, the press classifier, the LED engine, the transition
//! sequencer, the inactivity supervisor, the valve notice and the one
//! timer queue they all share.  It is the single writer; the outside
//! world feeds it inputs and timestamps and receives [`AppEvent`]s.
//!
//! ```text
//!  AppCommand ──▶ ┌──────────────────────────────────┐ ──▶ EventSink
//!                 │            Controller            │
//!  advance(now) ─▶│ FSM · Button · LEDs · Sequencer  │ ──▶ IndicatorPort
//!                 │ Supervisor · Valve · Scheduler   │
//!                 └──────────────────────────────────┘
//! ```
//!
//! Every entry point takes `now_ms`.  Timers are only fired from
//! [`Controller::advance`], one at a time in deadline order, each handled
//! at its own due time, so the controller behaves identically under a
//! real clock and under a test driving virtual time.

use log::{debug, info, warn};

use crate::config::{SOIL_MOISTURE_MAX, SOIL_MOISTURE_MIN, SystemConfig};
use crate::drivers::button::{PressClassifier, PressKind};
use crate::drivers::led_patterns::{LedOutput, LedPatternEngine, PatternInputs};
use crate::error::{InputError, Result};
use crate::fsm::context::{BatteryLevel, FsmContext, Settings};
use crate::fsm::states::build_state_table;
use crate::fsm::{Action, Fsm, StateId};
use crate::scheduler::{Expired, Scheduler, TimerOwner};
use crate::sequencer::Sequencer;
use crate::supervisor::InactivitySupervisor;
use crate::valve::{Notice, ValveState};

use super::commands::AppCommand;
use super::events::{AppEvent, Snapshot};
use super::ports::{EventSink, IndicatorPort};

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

pub struct Controller {
    fsm: Fsm,
    ctx: FsmContext,
    sched: Scheduler,
    button: PressClassifier,
    leds: LedPatternEngine,
    sequencer: Sequencer,
    supervisor: InactivitySupervisor,
    notice: Notice,
    notice_generation: u32,
    press_generation: u32,
    output: LedOutput,
    running: bool,
}

impl Controller {
    /// Construct the controller from configuration.  Fails with
    /// [`Error::Config`](crate::error::Error::Config) if the configuration
    /// does not validate.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(config: SystemConfig) -> Result<Self> {
        config.validate()?;
        let button = PressClassifier::new(&config);
        let supervisor = InactivitySupervisor::new(&config);
        let ctx = FsmContext::new(config);
        Ok(Self {
            fsm: Fsm::new(build_state_table(), StateId::Sleep),
            ctx,
            sched: Scheduler::new(),
            button,
            leds: LedPatternEngine::new(),
            sequencer: Sequencer::new(),
            supervisor,
            notice: Notice::default(),
            notice_generation: 0,
            press_generation: 0,
            output: LedOutput::DARK,
            running: false,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start in SLEEP.  The initial valve derivation is not announced.
    pub fn start(&mut self, now_ms: u64, sink: &mut impl EventSink) -> Result<()> {
        self.fsm.start(&mut self.ctx);
        self.ctx.take_effects();
        self.running = true;
        sink.emit(&AppEvent::Started(self.state()));
        info!(
            "Controller started in {:?}, valve {:?}",
            self.state(),
            self.ctx.valve_state()
        );
        self.refresh_indicators(now_ms, sink)
    }

    /// Cancel every timer and go dark.
    pub fn teardown(&mut self, sink: &mut impl EventSink) {
        if !self.running {
            return;
        }
        self.leds.halt(&mut self.sched);
        self.sequencer.abort(&mut self.sched);
        self.supervisor.disarm(&mut self.sched);
        self.button.cancel();
        self.sched.clear();
        self.running = false;
        self.output = LedOutput::DARK;
        sink.emit(&AppEvent::Indicators(self.output));
        sink.emit(&AppEvent::Stopped);
        info!(
            "Controller stopped after {} transitions",
            self.fsm.transition_count()
        );
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command stamped with `now_ms`.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        if !self.running {
            debug!("Controller stopped, dropping {:?}", cmd);
            return Ok(());
        }
        match cmd {
            AppCommand::PressStart => self.press_start(now_ms, sink),
            AppCommand::PressEnd => self.press_end(now_ms, sink).map(|_| ()),
            AppCommand::PressCancel => self.press_cancel(now_ms, sink),
            AppCommand::SetSoilMoisture(value) => self.set_soil_moisture(value, now_ms, sink),
            AppCommand::SetBatteryLevel(level) => self.set_battery_level(level, now_ms, sink),
            AppCommand::RaiseFault => self.raise_fault(now_ms, sink),
            AppCommand::Shutdown => {
                self.teardown(sink);
                Ok(())
            }
        }
    }

    // ── Button ────────────────────────────────────────────────

    /// Button went down.  A second start while held is ignored.
    pub fn press_start(&mut self, now_ms: u64, sink: &mut impl EventSink) -> Result<()> {
        if !self.button.press_start(now_ms) {
            debug!("BUTTON: already pressed, start ignored");
            return Ok(());
        }
        self.supervisor.reset(now_ms, &mut self.sched)?;

        self.press_generation = self.press_generation.wrapping_add(1);
        self.sched.cancel_owner(TimerOwner::PressSample);
        self.sched.schedule_repeating(
            TimerOwner::PressSample,
            self.press_generation,
            now_ms,
            self.ctx.config.press_sample_interval_ms,
        )?;
        if let Some(progress) = self.button.progress(now_ms) {
            sink.emit(&AppEvent::PressProgress(progress));
        }
        Ok(())
    }

    /// Button came up.  Returns the classified press, or `None` if there
    /// was no press to end.
    pub fn press_end(
        &mut self,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> Result<Option<PressKind>> {
        let Some(press) = self.button.press_end(now_ms) else {
            debug!("BUTTON: release without press ignored");
            return Ok(None);
        };
        self.stop_press_sampling(sink);
        self.supervisor.reset(now_ms, &mut self.sched)?;
        sink.emit(&AppEvent::PressClassified(press));
        info!("BUTTON: {} in {:?}", press.label(), self.state());

        let from = self.state();
        match self.fsm.handle_press(press, &mut self.ctx) {
            None => {
                if from == StateId::Transition {
                    debug!("BUTTON: press discarded during transition");
                }
                self.publish_effects(now_ms, sink)?;
            }
            Some(Action::Goto(_)) => {
                self.publish_effects(now_ms, sink)?;
                self.state_entered(from, now_ms, sink)?;
            }
            Some(Action::Sequence { animation, target }) => {
                self.publish_effects(now_ms, sink)?;
                self.state_entered(from, now_ms, sink)?;
                self.sequencer
                    .begin(animation, target, now_ms, &mut self.sched)?;
                sink.emit(&AppEvent::SequenceStarted { animation, target });
            }
        }
        self.refresh_indicators(now_ms, sink)?;
        Ok(Some(press))
    }

    /// Abandon the current press without classifying it.
    pub fn press_cancel(&mut self, now_ms: u64, sink: &mut impl EventSink) -> Result<()> {
        if self.button.cancel() {
            debug!("BUTTON: press cancelled");
            self.stop_press_sampling(sink);
        }
        self.refresh_indicators(now_ms, sink)
    }

    // ── External inputs ───────────────────────────────────────

    pub fn set_soil_moisture(
        &mut self,
        value: u8,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        if !(SOIL_MOISTURE_MIN..=SOIL_MOISTURE_MAX).contains(&value) {
            warn!("SOIL: rejected reading {}", value);
            return Err(InputError::SoilMoistureOutOfRange(value).into());
        }
        if value == self.ctx.soil_moisture {
            return Ok(());
        }
        self.ctx.set_soil_moisture(value);
        sink.emit(&AppEvent::SoilMoistureChanged(value));
        self.publish_effects(now_ms, sink)?;
        self.refresh_indicators(now_ms, sink)
    }

    pub fn set_battery_level(
        &mut self,
        level: BatteryLevel,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        if level == self.ctx.battery_level {
            return Ok(());
        }
        self.ctx.battery_level = level;
        sink.emit(&AppEvent::BatteryLevelChanged(level));
        self.refresh_indicators(now_ms, sink)
    }

    /// Move to ERROR from any state, abandoning a running sequence.
    pub fn raise_fault(&mut self, now_ms: u64, sink: &mut impl EventSink) -> Result<()> {
        warn!("Fault raised in {:?}", self.state());
        sink.emit(&AppEvent::FaultRaised);
        self.abort_sequence(sink);
        let from = self.state();
        self.fsm.force_transition(StateId::Error, &mut self.ctx);
        self.publish_effects(now_ms, sink)?;
        self.state_entered(from, now_ms, sink)?;
        self.refresh_indicators(now_ms, sink)
    }

    // ── Time ──────────────────────────────────────────────────

    /// Fire every timer due at or before `now_ms`, in deadline order.
    pub fn advance(&mut self, now_ms: u64, sink: &mut impl EventSink) -> Result<()> {
        while let Some(expired) = self.sched.pop_due(now_ms) {
            self.dispatch(expired, sink)?;
        }
        Ok(())
    }

    /// Earliest pending deadline, for runtimes that sleep until it.
    pub fn next_deadline(&self) -> Option<u64> {
        self.sched.next_due()
    }

    // ── Outputs ───────────────────────────────────────────────

    /// Push the current indicator output to a driver.
    pub fn apply_indicators(&self, port: &mut impl IndicatorPort) {
        port.show(&self.output);
    }

    pub fn snapshot(&self, now_ms: u64) -> Snapshot {
        let desc = self.fsm.current_descriptor();
        Snapshot {
            state: desc.id,
            label: desc.label,
            description: desc.description,
            actions: desc.actions,
            leds: self.output,
            valve: self.ctx.valve_state(),
            notice: self.notice,
            settings: self.ctx.settings,
            soil_moisture: self.ctx.soil_moisture,
            battery_level: self.ctx.battery_level,
            entered_by_timeout: self.ctx.entered_by_timeout,
            inactivity_remaining_secs: self.supervisor.remaining_secs(),
            press: self.button.progress(now_ms),
            button_ever_pressed: self.button.ever_pressed(),
            sequence: self.sequencer.animation(),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn settings(&self) -> Settings {
        self.ctx.settings
    }

    pub fn soil_moisture(&self) -> u8 {
        self.ctx.soil_moisture
    }

    pub fn valve_state(&self) -> ValveState {
        self.ctx.valve_state()
    }

    pub fn led_output(&self) -> LedOutput {
        self.output
    }

    pub fn notice(&self) -> Notice {
        self.notice
    }

    pub fn entered_by_timeout(&self) -> bool {
        self.ctx.entered_by_timeout
    }

    pub fn inactivity_remaining_secs(&self) -> u32 {
        self.supervisor.remaining_secs()
    }

    pub fn is_sequence_running(&self) -> bool {
        self.sequencer.is_active()
    }

    /// Pending timers held by `owner`.
    pub fn pending_timers(&self, owner: TimerOwner) -> usize {
        self.sched.pending(owner)
    }

    // ── Internal ──────────────────────────────────────────────

    fn dispatch(&mut self, expired: Expired, sink: &mut impl EventSink) -> Result<()> {
        let now_ms = expired.due_ms;
        match expired.owner {
            TimerOwner::Pattern => {
                self.leds.on_timer(&expired, &mut self.sched)?;
            }
            TimerOwner::Sequencer => {
                if let Some(target) = self.sequencer.on_timer(&expired, &mut self.sched)? {
                    let from = self.state();
                    self.fsm.force_transition(target, &mut self.ctx);
                    self.publish_effects(now_ms, sink)?;
                    self.state_entered(from, now_ms, sink)?;
                }
            }
            TimerOwner::Inactivity => {
                if self.supervisor.on_tick(&expired, &mut self.sched) {
                    self.timeout_to_sleep(now_ms, sink)?;
                }
            }
            TimerOwner::Notification => {
                if expired.generation == self.notice_generation && self.notice.visible {
                    self.notice.visible = false;
                    sink.emit(&AppEvent::Notice(self.notice));
                }
            }
            TimerOwner::PressSample => {
                if expired.generation == self.press_generation {
                    if let Some(progress) = self.button.progress(now_ms) {
                        sink.emit(&AppEvent::PressProgress(progress));
                    }
                }
            }
        }
        self.refresh_indicators(now_ms, sink)
    }

    /// Emergency path: straight to SLEEP, no table, no sequence.
    fn timeout_to_sleep(&mut self, now_ms: u64, sink: &mut impl EventSink) -> Result<()> {
        sink.emit(&AppEvent::InactivityTimeout);
        self.abort_sequence(sink);
        let from = self.state();
        self.ctx.entered_by_timeout = true;
        self.fsm.force_transition(StateId::Sleep, &mut self.ctx);
        self.publish_effects(now_ms, sink)?;
        self.state_entered(from, now_ms, sink)
    }

    fn abort_sequence(&mut self, sink: &mut impl EventSink) {
        if let Some(target) = self.sequencer.abort(&mut self.sched) {
            sink.emit(&AppEvent::SequenceAborted { target });
        }
    }

    /// Common tail of every state change: announce it and re-arm the
    /// supervisor.  The LEDs follow in [`refresh_indicators`](Self::refresh_indicators).
    fn state_entered(&mut self, from: StateId, now_ms: u64, sink: &mut impl EventSink) -> Result<()> {
        let to = self.state();
        if to == from {
            return Ok(());
        }
        sink.emit(&AppEvent::StateChanged { from, to });
        if to.is_dormant() {
            self.supervisor.disarm(&mut self.sched);
        } else {
            self.supervisor.arm(now_ms, &mut self.sched)?;
        }
        Ok(())
    }

    /// Announce what the last handler changed.
    fn publish_effects(&mut self, now_ms: u64, sink: &mut impl EventSink) -> Result<()> {
        let effects = self.ctx.take_effects();
        if let Some((setting, value)) = effects.setting_changed {
            sink.emit(&AppEvent::SettingChanged { setting, value });
        }
        if let Some(valve) = effects.valve_changed {
            info!("VALVE: {:?}", valve);
            sink.emit(&AppEvent::ValveChanged(valve));
            self.show_notice(valve, now_ms, sink)?;
        }
        Ok(())
    }

    fn show_notice(
        &mut self,
        valve: ValveState,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        self.notice = Notice {
            text: valve.notice_text(),
            visible: true,
        };
        self.notice_generation = self.notice_generation.wrapping_add(1);
        self.sched.cancel_owner(TimerOwner::Notification);
        self.sched.schedule_once(
            TimerOwner::Notification,
            self.notice_generation,
            now_ms,
            self.ctx.config.notification_ms,
        )?;
        sink.emit(&AppEvent::Notice(self.notice));
        Ok(())
    }

    fn stop_press_sampling(&mut self, sink: &mut impl EventSink) {
        self.sched.cancel_owner(TimerOwner::PressSample);
        self.press_generation = self.press_generation.wrapping_add(1);
        sink.emit(&AppEvent::PressEnded);
    }

    /// Re-arm the LED engine if its inputs moved, then publish the
    /// composed output if it differs from what was last shown.
    fn refresh_indicators(&mut self, now_ms: u64, sink: &mut impl EventSink) -> Result<()> {
        let state = self.state();
        let inputs = PatternInputs {
            state,
            opening_threshold: self.ctx.settings.opening_threshold,
            multiplicator: self.ctx.settings.multiplicator,
            soil_moisture: self.ctx.soil_moisture,
            battery: self.ctx.battery_level,
            entered_by_timeout: self.ctx.entered_by_timeout,
        };
        self.leds.sync(&inputs, now_ms, &mut self.sched)?;

        let mut output = self.leds.output(state, self.ctx.valve_state());
        if state == StateId::Transition {
            output.rgb = self.sequencer.output();
        }
        if output != self.output {
            self.output = output;
            sink.emit(&AppEvent::Indicators(output));
        }
        Ok(())
    }
}
