//! Inbound command queue.
//!
//! Commands are produced by:
//! - The input thread (button edges, soil/battery simulation, shutdown)
//! - Tests and fuzzers feeding command streams
//!
//! and consumed by the runtime, which stamps each with the current time
//! and hands it to the controller, one at a time in arrival order.
//!
//! ```text
//! ┌─────────────┐     ┌───────────────┐     ┌──────────────┐
//! │ stdin       │────▶│ INPUT_CHANNEL │────▶│ input task   │
//! │ tests       │────▶│  (bounded)    │     │ (executor)   │
//! └─────────────┘     └───────────────┘     └──────────────┘
//! ```
//!
//! The channel is an `embassy-sync` bounded MPMC queue behind a
//! critical-section mutex, so producers on other threads can push while
//! the single executor consumes.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::commands::AppCommand;
use crate::error::InputError;

/// Maximum number of queued commands.
pub const INPUT_DEPTH: usize = 16;

/// Producers → runtime.
pub static INPUT_CHANNEL: Channel<CriticalSectionRawMutex, AppCommand, INPUT_DEPTH> =
    Channel::new();

/// Queue a command without waiting.  Fails when the queue is full.
pub fn push_command(cmd: AppCommand) -> Result<(), InputError> {
    INPUT_CHANNEL.try_send(cmd).map_err(|_| {
        warn!("INPUT: queue full, dropping {:?}", cmd);
        InputError::QueueFull
    })
}

/// Queue a command, parking the calling thread until there is room.
/// For producer threads outside the executor.
pub fn send_blocking(cmd: AppCommand) {
    futures_lite::future::block_on(INPUT_CHANNEL.send(cmd));
}

/// Await the next command.
pub async fn recv_command() -> AppCommand {
    INPUT_CHANNEL.receive().await
}

pub fn try_recv_command() -> Option<AppCommand> {
    INPUT_CHANNEL.try_receive().ok()
}

/// Discard everything queued.  Returns how many commands were dropped.
pub fn drain_commands() -> usize {
    let mut dropped = 0;
    while INPUT_CHANNEL.try_receive().is_ok() {
        dropped += 1;
    }
    dropped
}
