//! # Channel-backed subscriber
//!
//! A [`Subscription`] is the receiving end of one subscriber inbox. It suits
//! consumers that pull (a websocket writer, a test) rather than implement
//! [`Subscribe`](crate::Subscribe). Dropping it detaches the subscriber; the
//! broadcaster notices the closed queue on its next publish.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::events::Event;

use super::SubscriberId;

/// Receiving end of a subscriber inbox.
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Arc<Event>>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriberId, rx: mpsc::Receiver<Arc<Event>>) -> Self {
        Self { id, rx }
    }

    /// Identifier usable with [`Broadcaster::detach`](crate::Broadcaster::detach).
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next event. `None` once detached and drained.
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        self.rx.recv().await
    }

    /// Returns the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<Event>> {
        self.rx.try_recv().ok()
    }
}
