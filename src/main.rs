//! OpenValve simulator — Main Entry Point
//!
//! Runs the controller core on the host with log-backed adapters.  The
//! button, the soil-moisture sensor and the battery gauge are driven from
//! stdin, one command per line.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SystemClock     LogEventSink     LogIndicators   stdin thread │
//! │  (ClockPort)     (EventSink)      (IndicatorPort) (commands)   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Controller (pure logic)                   │    │
//! │  │  FSM · LED patterns · Sequencer · Supervisor · Valve   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Runtime (edge-executor · async-io-mini timers)                │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `openvalve-sim [config.json]`
#![deny(unused_must_use)]

use std::io::BufRead;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use openvalve::adapters::log_sink::{LogEventSink, LogIndicators};
use openvalve::adapters::time::SystemClock;
use openvalve::app::commands::AppCommand;
use openvalve::config::SystemConfig;
use openvalve::events;
use openvalve::fsm::context::BatteryLevel;
use openvalve::runtime;

// ── Console input ─────────────────────────────────────────────

/// One parsed stdin line.
#[derive(Debug, PartialEq)]
enum Line {
    Command(AppCommand),
    /// Press and hold for the given milliseconds, then release.
    Hold(u64),
    Help,
}

const HELP: &str = "commands: down | up | cancel | hold <ms> | soil <1-9> | \
                    battery <full|moderate|empty> | fault | quit";

fn parse_line(line: &str) -> Option<Line> {
    let mut words = line.split_whitespace();
    let verb = words.next()?;
    let arg = words.next();
    let line = match (verb, arg) {
        ("down", None) => Line::Command(AppCommand::PressStart),
        ("up", None) => Line::Command(AppCommand::PressEnd),
        ("cancel", None) => Line::Command(AppCommand::PressCancel),
        ("hold", Some(ms)) => Line::Hold(ms.parse().ok()?),
        ("soil", Some(v)) => Line::Command(AppCommand::SetSoilMoisture(v.parse().ok()?)),
        ("battery", Some(level)) => Line::Command(AppCommand::SetBatteryLevel(match level {
            "full" => BatteryLevel::Full,
            "moderate" => BatteryLevel::Moderate,
            "empty" => BatteryLevel::Empty,
            _ => return None,
        })),
        ("fault", None) => Line::Command(AppCommand::RaiseFault),
        ("quit" | "exit", None) => Line::Command(AppCommand::Shutdown),
        ("help" | "?", None) => Line::Help,
        _ => return None,
    };
    Some(line)
}

/// Reads stdin until EOF or `quit`, forwarding commands to the runtime.
fn console_reader() {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Some(Line::Command(cmd)) => {
                events::send_blocking(cmd);
                if cmd == AppCommand::Shutdown {
                    return;
                }
            }
            Some(Line::Hold(ms)) => {
                events::send_blocking(AppCommand::PressStart);
                std::thread::sleep(Duration::from_millis(ms));
                events::send_blocking(AppCommand::PressEnd);
            }
            Some(Line::Help) => info!("{}", HELP),
            None => warn!("unrecognised input '{}' ({})", line.trim(), HELP),
        }
    }
    events::send_blocking(AppCommand::Shutdown);
}

fn load_config(path: Option<String>) -> Result<SystemConfig> {
    let Some(path) = path else {
        return Ok(SystemConfig::default());
    };
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config file {path}"))?;
    let config: SystemConfig =
        serde_json::from_str(&text).with_context(|| format!("parsing config file {path}"))?;
    info!("Config loaded from {}", path);
    Ok(config)
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("╔══════════════════════════════════════╗");
    info!("║  OpenValve simulator v{}          ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = load_config(std::env::args().nth(1))?;
    info!(
        "Inactivity timeout {} s, long press {} ms, very long press {} ms",
        config.inactivity_timeout_secs, config.long_press_ms, config.very_long_press_ms
    );
    info!("{}", HELP);

    std::thread::Builder::new()
        .name("console".into())
        .spawn(console_reader)
        .context("spawning console thread")?;

    let snapshot = runtime::run(
        config,
        SystemClock::new(),
        LogEventSink::new(),
        LogIndicators::new(),
    )?;

    info!(
        "Final snapshot: {}",
        serde_json::to_string(&snapshot).context("serialising snapshot")?
    );
    Ok(())
}
