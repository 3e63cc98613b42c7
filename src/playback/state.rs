//! # Playback state.
//!
//! [`PlaybackState`] is owned by the playback loop and mutated only there.
//! Everything outside the loop sees it through [`PlaybackSnapshot`] copies.
//!
//! ## Invariants
//! - `0 <= cursor <= total`
//! - `cursor == total` ⇒ `mode == Stopped` (outside a single command step)

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::error::ControlError;
use crate::playback::stats::Counters;

/// Run mode of the playback loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    Stopped,
    Running,
}

/// Playback speed multiplier. Only 1×, 2× and 4× exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Speed {
    #[default]
    X1,
    X2,
    X4,
}

impl Speed {
    /// Integer multiplier (1, 2 or 4).
    pub fn multiplier(self) -> u32 {
        match self {
            Speed::X1 => 1,
            Speed::X2 => 2,
            Speed::X4 => 4,
        }
    }

    /// Delay between two emissions at this speed.
    pub fn interval(self, base: Duration) -> Duration {
        base / self.multiplier()
    }
}

impl TryFrom<i64> for Speed {
    type Error = ControlError;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Speed::X1),
            2 => Ok(Speed::X2),
            4 => Ok(Speed::X4),
            _ => Err(ControlError::argument("Invalid speed value.")),
        }
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.multiplier())
    }
}

impl Serialize for Speed {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u32(self.multiplier())
    }
}

/// Mutable playback state (loop-owned).
#[derive(Debug, Clone)]
pub struct PlaybackState {
    pub mode: Mode,
    pub speed: Speed,
    pub cursor: usize,
    pub total: usize,
    /// Poison records skipped since the last reset.
    pub skipped: usize,
}

impl PlaybackState {
    pub fn new(total: usize, speed: Speed) -> Self {
        Self {
            mode: Mode::Stopped,
            speed,
            cursor: 0,
            total,
            skipped: 0,
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.mode == Mode::Running
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.cursor >= self.total
    }
}

/// Read-only copy of loop state plus counters, published after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub mode: Mode,
    pub speed: Speed,
    pub cursor: usize,
    pub total: usize,
    pub skipped: usize,
    pub counters: Counters,
}

impl PlaybackSnapshot {
    pub(crate) fn capture(state: &PlaybackState, counters: Counters) -> Self {
        Self {
            mode: state.mode,
            speed: state.speed,
            cursor: state.cursor,
            total: state.total,
            skipped: state.skipped,
            counters,
        }
    }

    /// Status view: `{running, speed, cursor, total}`.
    pub fn status(&self) -> StatusView {
        StatusView {
            running: self.mode == Mode::Running,
            speed: self.speed,
            cursor: self.cursor,
            total: self.total,
            skipped: self.skipped,
        }
    }
}

/// Pull-based status query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub running: bool,
    pub speed: Speed,
    pub cursor: usize,
    pub total: usize,
    pub skipped: usize,
}
