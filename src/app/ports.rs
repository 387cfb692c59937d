//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (indicators, event sinks, clocks) implement these
//! traits.  The [`Controller`](super::service::Controller) consumes them
//! via generics, so the domain core never touches hardware directly.

use crate::drivers::led_patterns::LedOutput;

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / UI)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Indicator port (driven adapter: domain → LEDs)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the two indicator LEDs.
pub trait IndicatorPort {
    /// Show `leds` until the next call.
    fn show(&mut self, leds: &LedOutput);

    /// Both LEDs dark (process teardown).
    fn all_off(&mut self) {
        self.show(&LedOutput::DARK);
    }
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: hardware timer → domain)
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.  The controller itself only ever sees
/// the `now_ms` values its caller passes in; the runtime reads them here.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}
