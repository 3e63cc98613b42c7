//! # crowdwatch
//!
//! **crowdwatch** replays a recorded stream of crowd telemetry as if it were
//! live. Each record is classified into an alert level with a recommended
//! action, tallied into cumulative counters and pushed to every connected
//! subscriber. Playback is paced in real time and driven by control commands
//! (start, pause, reset, single step, speed 1×/2×/4×).
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐          ┌──────────────────────────┐
//!     │  CSV file    │          │ ControlApi               │
//!     │ (records)    │          │ {action, value?}         │
//!     └──────┬───────┘          └────────────┬─────────────┘
//!            ▼                               │ Command (mpsc + oneshot reply)
//!     ┌──────────────┐                       ▼
//!     │ EventSource  │◄── get(i) ──┌──────────────────────────┐
//!     │ (read-only)  │             │ PlaybackActor            │
//!     └──────────────┘             │ - PlaybackState (mode,   │
//!                                  │   speed, cursor)         │
//!                                  │ - StatsAggregator        │──► watch: PlaybackSnapshot
//!                                  │ - classify(record)       │    (status / stats queries)
//!                                  └────────────┬─────────────┘
//!                                               │ Event (classified, summary, status)
//!                                               ▼
//!                                  ┌──────────────────────────┐
//!                                  │ Broadcaster              │
//!                                  │ (per-subscriber queues)  │
//!                                  └───┬─────────┬─────────┬──┘
//!                                      ▼         ▼         ▼
//!                                  worker1   worker2   Subscription
//!                                      ▼         ▼      (pull, recv())
//!                                 sub1.on   sub2.on
//!                                  _event()  _event()
//! ```
//!
//! ### Emission
//! ```text
//! RUNNING:
//!   select! {
//!     token.cancelled()         ─► exit (no draining)
//!     command                   ─► apply, echo status, reply, re-pace
//!     sleep_until(next_due)     ─► emit record[cursor]:
//!                                    ├─ decode ok  ─► classify ─► counters ─► publish event + summary
//!                                    └─ decode err ─► skip (warn), cursor still advances
//!                                  cursor == total ─► STOPPED, publish "finished"
//!   }
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Records**       | Load and decode stored telemetry.                            | [`EventSource`], [`Record`]                 |
//! | **Classification**| Pure, ordered rule set from record to alert.                 | [`classify()`], [`Alert`], [`ClassifiedEvent`]|
//! | **Playback**      | Paced, interruptible, single-writer state machine.           | [`PlaybackHandle`], [`Command`], [`Speed`]  |
//! | **Fan-out**       | Non-blocking delivery to many subscribers.                   | [`Broadcaster`], [`Subscribe`]              |
//! | **Control**       | Request/response surface with validation.                    | [`ControlApi`], [`ControlResponse`]         |
//! | **Errors**        | Typed errors for loading, decoding, control and runtime.     | [`ControlError`], [`RuntimeError`]          |
//! | **Configuration** | Centralize runtime settings.                                 | [`Config`]                                  |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use crowdwatch::{Config, Engine, EventSource, LogWriter, Subscribe};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.base_interval = Duration::from_millis(10);
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let engine = Engine::builder(cfg)
//!         .with_source(EventSource::empty())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let resp = engine.control().execute(&crowdwatch::ControlRequest::new("STATUS_CHECK", None)).await;
//!     assert!(!resp.accepted());
//!
//!     engine.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod classify;
mod config;
mod control;
mod core;
mod error;
mod events;
mod playback;
mod records;
mod subscribers;

// ---- Public re-exports ----

pub use classify::{classify, Alert, Classification, ClassifiedEvent, HEAT_STRESS_THRESHOLD};
pub use config::Config;
pub use control::{ControlApi, ControlRequest, ControlResponse, ResponseStatus};
pub use core::{Engine, EngineBuilder};
pub use error::{ControlError, LoadError, RecordError, RuntimeError};
pub use events::{Event, EventKind, LocationSummary, Payload, StatusNotice};
pub use playback::{
    Command, Counters, Mode, PlaybackActor, PlaybackHandle, PlaybackParams, PlaybackSnapshot,
    PlaybackState, Reply, Speed, StatsAggregator, StatusView,
};
pub use records::{EventSource, RawRecord, Record};
pub use subscribers::{Broadcaster, LogWriter, Subscribe, SubscriberId, Subscription};
