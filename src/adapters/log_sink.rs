//! Log-based adapters.
//!
//! [`LogEventSink`] implements [`EventSink`] by writing every application
//! event as one structured log line; [`LogIndicators`] implements
//! [`IndicatorPort`] by logging the LED frame whenever it changes.  Both
//! go wherever the installed `log` backend sends them (stderr under
//! `env_logger`).

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, IndicatorPort};
use crate::drivers::led_patterns::{Colour, LedOutput};

/// Adapter that logs every [`AppEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::PressClassified(kind) => {
                info!("PRESS | {}", kind.label());
            }
            AppEvent::PressProgress(p) => {
                debug!(
                    "PRESS | held={}ms ({}) {:.0}%",
                    p.held_ms,
                    p.kind.label(),
                    p.fraction * 100.0
                );
            }
            AppEvent::PressEnded => {
                debug!("PRESS | released");
            }
            AppEvent::SettingChanged { setting, value } => {
                info!("SETTING | {:?}={}", setting, value);
            }
            AppEvent::SoilMoistureChanged(v) => {
                info!("SOIL | moisture={}", v);
            }
            AppEvent::BatteryLevelChanged(level) => {
                info!("BATTERY | level={:?}", level);
            }
            AppEvent::ValveChanged(valve) => {
                info!("VALVE | {:?}", valve);
            }
            AppEvent::Notice(n) if n.visible => {
                info!("NOTICE | {}", n.text);
            }
            AppEvent::Notice(_) => {
                debug!("NOTICE | cleared");
            }
            AppEvent::Indicators(leds) => {
                debug!("LED | {}", render(leds));
            }
            AppEvent::SequenceStarted { animation, target } => {
                info!("SEQUENCE | {:?} towards {:?}", animation, target);
            }
            AppEvent::SequenceAborted { target } => {
                warn!("SEQUENCE | aborted, {:?} not committed", target);
            }
            AppEvent::InactivityTimeout => {
                info!("TIMEOUT | inactivity budget spent");
            }
            AppEvent::FaultRaised => {
                warn!("FAULT | raised");
            }
            AppEvent::Stopped => {
                info!("STOP | controller stopped");
            }
        }
    }
}

/// Indicator port that logs each distinct frame.
#[derive(Default)]
pub struct LogIndicators {
    last: LedOutput,
}

impl LogIndicators {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndicatorPort for LogIndicators {
    fn show(&mut self, leds: &LedOutput) {
        if *leds != self.last {
            self.last = *leds;
            info!("LED | {}", render(leds));
        }
    }
}

fn colour_name(colour: Option<Colour>) -> &'static str {
    match colour {
        None => "off",
        Some(Colour::Red) => "red",
        Some(Colour::Orange) => "orange",
        Some(Colour::Green) => "green",
    }
}

/// `rgb=green blue=on(blink)` style one-liner.
fn render(leds: &LedOutput) -> String {
    format!(
        "rgb={}{} blue={}{}",
        colour_name(leds.rgb),
        if leds.rgb_blink { "(blink)" } else { "" },
        if leds.blue { "on" } else { "off" },
        if leds.blue_blink { "(blink)" } else { "" },
    )
}
