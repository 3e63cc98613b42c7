//! Playback: the state machine that paces emission and applies control commands.
//!
//! ## Contents
//! - [`PlaybackActor`] the single-writer loop (owns state and counters)
//! - [`PlaybackHandle`] command sender + snapshot reader
//! - [`Command`] validated transitions (START / PAUSE / RESET / STEP / SET_SPEED)
//! - [`PlaybackState`], [`Mode`], [`Speed`], [`PlaybackSnapshot`], [`StatusView`]
//! - [`StatsAggregator`], [`Counters`]
//!
//! ## State machine
//! ```text
//!            START                      cursor == total
//!   STOPPED ───────► RUNNING ──────────────────────────► STOPPED  (+ "finished")
//!      ▲  ▲             │
//!      │  └── PAUSE ────┤
//!      └───── RESET ────┘   (cursor = 0, counters = 0)
//!
//!   STEP:      STOPPED && cursor < total ─► emit one, stay STOPPED
//!   SET_SPEED: any mode, {1, 2, 4}
//! ```

mod actor;
mod command;
mod handle;
mod state;
mod stats;

pub use actor::{PlaybackActor, PlaybackParams};
pub use command::{Command, Reply};
pub use handle::PlaybackHandle;
pub use state::{Mode, PlaybackSnapshot, PlaybackState, Speed, StatusView};
pub use stats::{Counters, StatsAggregator};

#[cfg(test)]
mod tests;
