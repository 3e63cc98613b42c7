//! # Playback commands.
//!
//! Commands are already validated when they reach the loop: a [`Command::SetSpeed`]
//! always carries a supported [`Speed`]. Parsing of external names/values lives
//! in [`ControlApi`](crate::ControlApi).

use tokio::sync::oneshot;

use crate::error::ControlError;
use crate::playback::Speed;

/// A transition request for the playback loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// STOPPED/RUNNING → RUNNING (idempotent).
    Start,
    /// any → STOPPED (idempotent).
    Pause,
    /// any → STOPPED, cursor and counters back to zero. Data is not reloaded.
    Reset,
    /// Emit exactly one record; only while STOPPED with records left.
    Step,
    /// Change the speed multiplier; valid in any mode.
    SetSpeed(Speed),
}

impl Command {
    /// Lower-case echo used in status notices.
    pub fn echo(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Pause => "pause",
            Command::Reset => "reset",
            Command::Step => "step",
            Command::SetSpeed(_) => "speed",
        }
    }
}

/// Outcome of one command as seen by the caller.
pub type Reply = Result<String, ControlError>;

/// Command plus its reply slot, as carried over the command channel.
pub(crate) struct Envelope {
    pub(crate) command: Command,
    pub(crate) reply: oneshot::Sender<Reply>,
}
