//! # Notifications pushed to subscribers.
//!
//! Every broadcast is an [`Event`]: a global sequence number, a wall-clock
//! timestamp and one [`Payload`]. Three kinds exist:
//!
//! - **Classified record** (`realtime_event`): `{alert, action, icon, event}`
//! - **Location summary** (`counters_update`): `{ground, nusuk, time}`
//! - **Status notice** (`simulation_status`): `{status, running, speed}`
//!
//! ## Ordering guarantees
//! `seq` increases monotonically across the process. The broadcaster keeps
//! per-subscriber FIFO order, so a subscriber always observes increasing `seq`.
//!
//! ## Example
//! ```rust
//! use crowdwatch::{Event, EventKind, Speed, StatusNotice};
//!
//! let ev = Event::status(StatusNotice::new("pause", false, Speed::X2));
//! assert_eq!(ev.kind(), EventKind::Status);
//! assert_eq!(ev.kind().channel(), "simulation_status");
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classify::ClassifiedEvent;
use crate::playback::Speed;
use crate::records::Record;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// One record was classified.
    RecordClassified,
    /// Location summary derived from the record just classified.
    LocationSummary,
    /// Playback status changed (command accepted, completion, greeting).
    Status,
}

impl EventKind {
    /// Channel name used on the wire.
    pub fn channel(&self) -> &'static str {
        match self {
            EventKind::RecordClassified => "realtime_event",
            EventKind::LocationSummary => "counters_update",
            EventKind::Status => "simulation_status",
        }
    }
}

/// Location summary for the most recent record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationSummary {
    pub ground: String,
    pub nusuk: String,
    /// Record timestamp as `HH:MM:SS`.
    pub time: String,
}

impl From<&Record> for LocationSummary {
    fn from(r: &Record) -> Self {
        Self {
            ground: r.actual_location.clone(),
            nusuk: r.permitted_location.clone(),
            time: r.clock_time(),
        }
    }
}

/// Status notice: `{status, running, speed}`.
///
/// `status` echoes the accepted command in lower case (`start`, `pause`,
/// `reset`, `step`, `speed`), or is `finished` / `connected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusNotice {
    pub status: &'static str,
    pub running: bool,
    pub speed: Speed,
}

impl StatusNotice {
    pub fn new(status: &'static str, running: bool, speed: Speed) -> Self {
        Self {
            status,
            running,
            speed,
        }
    }
}

/// Notification body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    #[serde(rename = "realtime_event")]
    Classified(ClassifiedEvent),
    #[serde(rename = "counters_update")]
    Summary(LocationSummary),
    #[serde(rename = "simulation_status")]
    Status(StatusNotice),
}

/// Broadcast notification.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp of creation.
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: Payload,
}

impl Event {
    /// Creates a new event with the current timestamp and next sequence number.
    pub fn new(payload: Payload) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: Utc::now(),
            payload,
        }
    }

    #[inline]
    pub fn classified(ev: ClassifiedEvent) -> Self {
        Self::new(Payload::Classified(ev))
    }

    #[inline]
    pub fn summary(s: LocationSummary) -> Self {
        Self::new(Payload::Summary(s))
    }

    #[inline]
    pub fn status(n: StatusNotice) -> Self {
        Self::new(Payload::Status(n))
    }

    pub fn kind(&self) -> EventKind {
        match self.payload {
            Payload::Classified(_) => EventKind::RecordClassified,
            Payload::Summary(_) => EventKind::LocationSummary,
            Payload::Status(_) => EventKind::Status,
        }
    }

    /// Classified record, if this is a `RecordClassified` event.
    pub fn as_classified(&self) -> Option<&ClassifiedEvent> {
        match &self.payload {
            Payload::Classified(c) => Some(c),
            _ => None,
        }
    }

    /// Status notice, if this is a `Status` event.
    pub fn as_status(&self) -> Option<&StatusNotice> {
        match &self.payload {
            Payload::Status(s) => Some(s),
            _ => None,
        }
    }

    /// JSON rendering (`{seq, at, type, data}`).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::status(StatusNotice::new("start", true, Speed::X1));
        let b = Event::status(StatusNotice::new("pause", false, Speed::X1));
        assert!(b.seq > a.seq);
    }

    #[test]
    fn status_wire_shape() {
        let ev = Event::status(StatusNotice::new("finished", false, Speed::X2));
        let v: serde_json::Value = serde_json::from_str(&ev.to_json().unwrap()).unwrap();
        assert_eq!(v["type"], "simulation_status");
        assert_eq!(v["data"]["status"], "finished");
        assert_eq!(v["data"]["running"], false);
        assert_eq!(v["data"]["speed"], 2);
        assert!(v["seq"].is_u64());
    }
}
