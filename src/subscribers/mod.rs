//! # Subscribers and fan-out delivery.
//!
//! This module provides the [`Subscribe`] trait, the [`Broadcaster`] that fans
//! notifications out to every attached subscriber, and two ready-made
//! consumers.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   PlaybackActor ── publish(Event) ──► Broadcaster ──► per-subscriber queue
//!                                            │
//!                                            ├──► worker ──► Subscribe::on_event(&Event)
//!                                            │                   ├──► LogWriter
//!                                            │                   └──► custom (storage writer, metrics...)
//!                                            │
//!                                            └──► Subscription::recv()  (pull-based consumers)
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use crowdwatch::{Alert, Event, Subscribe};
//! use async_trait::async_trait;
//!
//! struct RedPager;
//!
//! #[async_trait]
//! impl Subscribe for RedPager {
//!     async fn on_event(&self, event: &Event) {
//!         if let Some(c) = event.as_classified() {
//!             if c.alert == Alert::Red {
//!                 // page the patrol desk
//!             }
//!         }
//!     }
//! }
//! ```

mod broadcaster;
mod log;
mod subscribe;
mod subscription;

pub use broadcaster::{Broadcaster, SubscriberId};
pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscription::Subscription;
