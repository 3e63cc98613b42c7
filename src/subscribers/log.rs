//! # LogWriter: notification logger
//!
//! A minimal subscriber that renders incoming [`Event`]s as `tracing` lines
//! under the `crowdwatch::feed` target.
//!
//! ## Example output
//! ```text
//! [status] status="start" running=true speed=2x
//! [event] alert=RED subject="P00017" action="critical route violation — ..."
//! [location] ground="Mina" nusuk="Arafat" time="08:01:12"
//! ```

use crate::events::{Event, Payload};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match &e.payload {
            Payload::Status(s) => {
                tracing::info!(
                    target: "crowdwatch::feed",
                    seq = e.seq,
                    "[status] status={:?} running={} speed={}",
                    s.status,
                    s.running,
                    s.speed
                );
            }
            Payload::Classified(c) => {
                tracing::info!(
                    target: "crowdwatch::feed",
                    seq = e.seq,
                    "[event] alert={} subject={:?} action={:?}",
                    c.alert,
                    c.record.subject_id,
                    c.action
                );
            }
            Payload::Summary(l) => {
                tracing::debug!(
                    target: "crowdwatch::feed",
                    seq = e.seq,
                    "[location] ground={:?} nusuk={:?} time={:?}",
                    l.ground,
                    l.nusuk,
                    l.time
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
