//! Single-threaded cooperative runtime.
//!
//! Runs the controller on an `edge-executor` with `async-io-mini`
//! reactor timers.  Two tasks share the controller; neither holds it
//! across an `.await`, so every mutation is serialised on the one
//! executor thread.
//!
//! 1. **Input**: truly async via `INPUT_CHANNEL.receive().await`
//!    (wakes as soon as a producer pushes a command)
//! 2. **Timers**: fires due controller timers every `runtime_tick_ms`
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────┐
//!  │  futures_lite::block_on                              │
//!  │  ┌────────────────────────────────────────────────┐  │
//!  │  │  edge_executor::LocalExecutor                  │  │
//!  │  │   ┌───────────────┐      ┌────────────────┐    │  │
//!  │  │   │ Input (async) │      │ Timers  10ms ⏱ │    │  │
//!  │  │   │ wake-on-send  │      │                │    │  │
//!  │  │   └───────┬───────┘      └───────┬────────┘    │  │
//!  │  │           └──── Rc<RefCell<Station>> ───┘      │  │
//!  │  └────────────────────────────────────────────────┘  │
//!  └──────────────────────────────────────────────────────┘
//! ```
//!
//! The run ends when an [`AppCommand::Shutdown`](crate::app::commands::AppCommand::Shutdown)
//! has been handled.

use core::cell::RefCell;
use core::time::Duration;
use std::rc::Rc;

use log::{info, warn};

use crate::app::events::Snapshot;
use crate::app::ports::{ClockPort, EventSink, IndicatorPort};
use crate::app::service::Controller;
use crate::config::SystemConfig;
use crate::error::Result;
use crate::events;

/// Everything the two tasks share.
struct Station<K, S, I> {
    controller: Controller,
    clock: K,
    sink: S,
    indicators: I,
}

impl<K: ClockPort, S: EventSink, I: IndicatorPort> Station<K, S, I> {
    /// Catch up on timers, then mirror the LEDs.
    fn catch_up(&mut self) -> u64 {
        let now = self.clock.now_ms();
        if let Err(e) = self.controller.advance(now, &mut self.sink) {
            warn!("RUNTIME: timer dispatch failed: {}", e);
        }
        self.controller.apply_indicators(&mut self.indicators);
        now
    }
}

type Shared<K, S, I> = Rc<RefCell<Station<K, S, I>>>;

async fn input_loop<K: ClockPort, S: EventSink, I: IndicatorPort>(shared: Shared<K, S, I>) {
    loop {
        let cmd = events::recv_command().await;
        let mut station = shared.borrow_mut();
        let st = &mut *station;
        let now = st.catch_up();
        if let Err(e) = st.controller.handle_command(cmd, now, &mut st.sink) {
            warn!("RUNTIME: {:?} rejected: {}", cmd, e);
        }
        st.controller.apply_indicators(&mut st.indicators);
        if !st.controller.is_running() {
            st.indicators.all_off();
            return;
        }
    }
}

async fn timer_loop<K: ClockPort, S: EventSink, I: IndicatorPort>(
    shared: Shared<K, S, I>,
    tick: Duration,
) {
    loop {
        {
            let mut station = shared.borrow_mut();
            if station.controller.is_running() {
                station.catch_up();
            }
        }
        async_io_mini::Timer::after(tick).await;
    }
}

/// Start the controller and run it until shutdown.  Returns a snapshot
/// of the stopped controller.
pub fn run<K, S, I>(config: SystemConfig, clock: K, mut sink: S, indicators: I) -> Result<Snapshot>
where
    K: ClockPort,
    S: EventSink,
    I: IndicatorPort,
{
    let tick = Duration::from_millis(u64::from(config.runtime_tick_ms));

    let mut controller = Controller::new(config)?;
    controller.start(clock.now_ms(), &mut sink)?;

    let shared: Shared<K, S, I> = Rc::new(RefCell::new(Station {
        controller,
        clock,
        sink,
        indicators,
    }));
    shared.borrow_mut().catch_up();

    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
    executor.spawn(timer_loop(shared.clone(), tick)).detach();

    info!("RUNTIME: started (tick {:?})", tick);
    futures_lite::future::block_on(executor.run(input_loop(shared.clone())));
    info!("RUNTIME: stopped");

    let station = shared.borrow();
    Ok(station.controller.snapshot(station.clock.now_ms()))
}
