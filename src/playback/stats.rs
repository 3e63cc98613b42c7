//! # Cumulative alert counters.
//!
//! [`StatsAggregator`] is a plain struct with `&mut self` updates. It is owned
//! by the playback loop, which is the only writer, so it carries no lock.

use serde::Serialize;

use crate::classify::Alert;

/// Point-in-time counter values.
///
/// `GREEN` has no dedicated counter; it only contributes to `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub red: u64,
    pub orange: u64,
    pub yellow: u64,
    pub blue: u64,
    pub total: u64,
}

/// Single-writer counter set keyed by alert severity.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    counters: Counters,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one classified event.
    pub fn record(&mut self, alert: Alert) {
        let c = &mut self.counters;
        match alert {
            Alert::Red => c.red += 1,
            Alert::Orange => c.orange += 1,
            Alert::Yellow => c.yellow += 1,
            Alert::Blue => c.blue += 1,
            Alert::Green => {}
        }
        c.total += 1;
    }

    /// Consistent copy of all counters.
    pub fn snapshot(&self) -> Counters {
        self.counters
    }

    /// Zeroes every counter.
    pub fn reset(&mut self) {
        self.counters = Counters::default();
    }
}
