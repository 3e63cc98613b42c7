//! Notifications: data model for everything pushed to subscribers.
//!
//! ## Contents
//! - [`Event`] envelope (`seq`, `at`, [`Payload`])
//! - [`EventKind`] classification and wire channel names
//! - [`LocationSummary`], [`StatusNotice`] payload bodies
//!
//! ## Quick reference
//! - **Publisher**: the playback loop (`playback::actor`), plus the engine
//!   for the per-subscriber `connected` greeting.
//! - **Consumers**: [`Broadcaster`](crate::Broadcaster) fans events out to
//!   subscriber queues.

mod event;

pub use event::{Event, EventKind, LocationSummary, Payload, StatusNotice};
