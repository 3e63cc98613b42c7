//! # Engine configuration.
//!
//! Provides [`Config`], centralized settings for the engine runtime.
//!
//! ## Sentinel values
//! - `base_interval = 0s` → clamped to 1ms (no busy emission)
//! - `command_capacity = 0`, `queue_capacity = 0` → clamped to 1
//! - `data_path = None` → empty source (idle engine)

use std::path::PathBuf;
use std::time::Duration;

use crate::playback::{PlaybackParams, Speed};

/// Global configuration for the engine.
///
/// ## Field semantics
/// - `base_interval`: delay between emissions at 1× speed
/// - `speed`: initial speed multiplier
/// - `autostart`: start playback on spawn instead of waiting for START
/// - `command_capacity`: control channel size
/// - `queue_capacity`: default inbox size for pull subscribers
/// - `grace`: how long shutdown waits for the playback loop to exit
/// - `data_path`: CSV record source
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Nominal delay between two emissions at 1×.
    pub base_interval: Duration,

    /// Speed the engine starts with.
    pub speed: Speed,

    /// Enter RUNNING as soon as the loop is spawned.
    ///
    /// Subscriber attachment never starts playback; this flag is the only
    /// automatic trigger. Ignored when the source is empty.
    pub autostart: bool,

    /// Capacity of the command channel into the playback loop.
    pub command_capacity: usize,

    /// Inbox capacity for subscribers created with `Engine::subscribe`.
    ///
    /// When a subscriber falls this far behind, new events are dropped for it.
    pub queue_capacity: usize,

    /// Maximum time to wait for the playback loop on shutdown.
    pub grace: Duration,

    /// Location of the record source.
    pub data_path: Option<PathBuf>,
}

impl Config {
    /// Base interval clamped to at least 1ms.
    #[inline]
    pub fn base_interval_clamped(&self) -> Duration {
        self.base_interval.max(Duration::from_millis(1))
    }

    /// Command channel capacity clamped to a minimum of 1.
    #[inline]
    pub fn command_capacity_clamped(&self) -> usize {
        self.command_capacity.max(1)
    }

    /// Subscriber inbox capacity clamped to a minimum of 1.
    #[inline]
    pub fn queue_capacity_clamped(&self) -> usize {
        self.queue_capacity.max(1)
    }

    /// Parameters for the playback loop.
    pub fn playback_params(&self) -> PlaybackParams {
        PlaybackParams {
            base_interval: self.base_interval_clamped(),
            speed: self.speed,
            autostart: self.autostart,
            command_capacity: self.command_capacity_clamped(),
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `base_interval = 1s`
    /// - `speed = 1x`
    /// - `autostart = false` (wait for START)
    /// - `command_capacity = 64`
    /// - `queue_capacity = 1024`
    /// - `grace = 5s`
    /// - `data_path = None`
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(1),
            speed: Speed::X1,
            autostart: false,
            command_capacity: 64,
            queue_capacity: 1024,
            grace: Duration::from_secs(5),
            data_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sentinels_are_clamped() {
        let cfg = Config {
            base_interval: Duration::ZERO,
            command_capacity: 0,
            queue_capacity: 0,
            ..Config::default()
        };
        let p = cfg.playback_params();
        assert_eq!(p.base_interval, Duration::from_millis(1));
        assert_eq!(p.command_capacity, 1);
        assert_eq!(cfg.queue_capacity_clamped(), 1);
    }
}
