//! # Broadcaster: non-blocking fan-out over a dynamic subscriber set
//!
//! [`Broadcaster`] distributes each [`Event`] to every currently attached
//! subscriber **without awaiting** their processing.
//!
//! ## What it guarantees
//! - `publish(Event)` returns immediately (`try_send` per subscriber).
//! - Per-subscriber FIFO (queue order).
//! - `attach` / `detach` are safe to call while publishes are in flight.
//! - Panics inside subscribers are caught and logged (isolation).
//! - A subscriber whose inbox is closed is dropped from the set silently.
//!
//! ## What it does **not** guarantee
//! - No global ordering across different subscribers.
//! - No retries on per-subscriber queue overflow (events are dropped for that
//!   subscriber only).
//! - No replay: a subscriber only sees events published after it attached.
//!
//! ## Diagram
//! ```text
//!    publish(Event)                (one Arc, cloned per subscriber)
//!        │
//!        ├── read-lock ──► [queue S1] ─► worker S1 ─► on_event()
//!        ├───────────────► [queue S2] ─► Subscription::recv()
//!        └───────────────► [queue SN] ─► worker SN ─► on_event()
//!        │
//!        └── closed queues collected ─► write-lock ─► removed
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::RwLock;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::Event;

use super::{Subscribe, Subscription};

/// Opaque handle identifying one attached subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Per-subscriber channel with metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
    worker: Option<JoinHandle<()>>,
    dropped: u64,
}

/// Fan-out with per-subscriber bounded queues.
pub struct Broadcaster {
    channels: RwLock<HashMap<SubscriberId, SubscriberChannel>>,
    next_id: AtomicU64,
    default_capacity: usize,
}

impl Broadcaster {
    /// Creates an empty broadcaster; `default_capacity` sizes [`subscribe`](Self::subscribe) inboxes.
    #[must_use]
    pub fn new(default_capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            default_capacity: default_capacity.max(1),
        }
    }

    fn next_id(&self) -> SubscriberId {
        SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Attaches a [`Subscribe`] implementation and spawns its worker.
    ///
    /// Must be called within a tokio runtime.
    pub fn attach(&self, sub: Arc<dyn Subscribe>) -> SubscriberId {
        self.attach_inner(sub, None::<fn() -> Event>)
    }

    /// Like [`attach`](Self::attach), but the subscriber first sees the event
    /// built by `greeting`.
    ///
    /// `greeting` runs under the write lock, so no publish can slip in between
    /// building the greeting and registering the subscriber.
    pub fn attach_with_greeting(
        &self,
        sub: Arc<dyn Subscribe>,
        greeting: impl FnOnce() -> Event,
    ) -> SubscriberId {
        self.attach_inner(sub, Some(greeting))
    }

    fn attach_inner<F: FnOnce() -> Event>(&self, sub: Arc<dyn Subscribe>, greeting: Option<F>) -> SubscriberId {
        let cap = sub.queue_capacity().max(1);
        let name = sub.name();
        let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);

        let s = Arc::clone(&sub);
        let worker = tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                let fut = s.on_event(ev.as_ref());
                if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                    let info = if let Some(msg) = panic_err.downcast_ref::<&'static str>() {
                        (*msg).to_string()
                    } else if let Some(msg) = panic_err.downcast_ref::<String>() {
                        msg.clone()
                    } else {
                        "unknown panic".to_string()
                    };
                    tracing::error!(subscriber = s.name(), info = %info, "subscriber panicked");
                }
            }
        });

        self.insert(
            SubscriberChannel {
                name,
                sender: tx,
                worker: Some(worker),
                dropped: 0,
            },
            greeting,
        )
    }

    /// Attaches a channel-backed subscriber and returns its receiving end.
    ///
    /// Dropping the [`Subscription`] detaches it on the next publish.
    pub fn subscribe(&self, capacity: Option<usize>) -> Subscription {
        self.subscribe_inner(capacity, None::<fn() -> Event>)
    }

    /// Like [`subscribe`](Self::subscribe) with a greeting built under the write lock.
    pub fn subscribe_with_greeting(
        &self,
        capacity: Option<usize>,
        greeting: impl FnOnce() -> Event,
    ) -> Subscription {
        self.subscribe_inner(capacity, Some(greeting))
    }

    fn subscribe_inner<F: FnOnce() -> Event>(&self, capacity: Option<usize>, greeting: Option<F>) -> Subscription {
        let cap = capacity.unwrap_or(self.default_capacity).max(1);
        let (tx, rx) = mpsc::channel::<Arc<Event>>(cap);
        let id = self.insert(
            SubscriberChannel {
                name: "subscription",
                sender: tx,
                worker: None,
                dropped: 0,
            },
            greeting,
        );
        Subscription::new(id, rx)
    }

    fn insert<F: FnOnce() -> Event>(&self, channel: SubscriberChannel, greeting: Option<F>) -> SubscriberId {
        let id = self.next_id();
        let mut channels = self.channels.write();
        if let Some(greeting) = greeting {
            let _ = channel.sender.try_send(Arc::new(greeting()));
        }
        tracing::debug!(subscriber = channel.name, %id, "subscriber attached");
        channels.insert(id, channel);
        id
    }

    /// Removes a subscriber. Its worker finishes the events already queued and exits.
    ///
    /// Returns `false` if `id` was not attached. Never waits on the subscriber.
    pub fn detach(&self, id: SubscriberId) -> bool {
        let removed = self.channels.write().remove(&id);
        match removed {
            Some(ch) => {
                tracing::debug!(subscriber = ch.name, %id, dropped = ch.dropped, "subscriber detached");
                true
            }
            None => false,
        }
    }

    /// Fans one event out to all subscribers (non-blocking).
    ///
    /// - Queue **full**: the event is dropped for that subscriber (warn).
    /// - Queue **closed**: the subscriber is removed from the set.
    pub fn publish(&self, event: Event) {
        self.publish_arc(Arc::new(event));
    }

    /// Publishes a pre-allocated `Arc<Event>`.
    pub fn publish_arc(&self, event: Arc<Event>) {
        let mut faults = Vec::new();
        {
            let channels = self.channels.read();
            for (id, channel) in channels.iter() {
                match channel.sender.try_send(Arc::clone(&event)) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(
                            subscriber = channel.name,
                            %id,
                            seq = event.seq,
                            "subscriber dropped event: queue full"
                        );
                        faults.push((*id, false));
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => faults.push((*id, true)),
                }
            }
        }
        if faults.is_empty() {
            return;
        }

        let mut channels = self.channels.write();
        for (id, is_closed) in faults {
            if is_closed {
                if let Some(ch) = channels.remove(&id) {
                    tracing::debug!(subscriber = ch.name, %id, "subscriber disconnected; removed");
                }
            } else if let Some(ch) = channels.get_mut(&id) {
                ch.dropped += 1;
            }
        }
    }

    /// Number of events dropped for `id` because its queue was full.
    pub fn dropped(&self, id: SubscriberId) -> Option<u64> {
        self.channels.read().get(&id).map(|ch| ch.dropped)
    }

    /// True if `id` is currently attached.
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.channels.read().contains_key(&id)
    }

    /// Number of attached subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.read().len()
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.read().is_empty()
    }

    /// Graceful shutdown: close all queues and await worker completion.
    pub async fn shutdown(&self) {
        let drained: Vec<SubscriberChannel> = self.channels.write().drain().map(|(_, ch)| ch).collect();
        let mut workers = Vec::with_capacity(drained.len());
        for ch in drained {
            if let Some(w) = ch.worker {
                workers.push(w);
            }
            // sender dropped here; the worker drains and exits
        }
        for w in workers {
            let _ = w.await;
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::StatusNotice;
    use crate::playback::Speed;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    fn status(s: &'static str) -> Event {
        Event::status(StatusNotice::new(s, false, Speed::X1))
    }

    struct Collect {
        seen: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, ev: &Event) {
            self.seen.lock().push(ev.seq);
        }
        fn name(&self) -> &'static str {
            "collect"
        }
    }

    struct Panicky;

    #[async_trait]
    impl Subscribe for Panicky {
        async fn on_event(&self, _ev: &Event) {
            panic!("boom");
        }
    }

    #[tokio::test]
    async fn per_subscriber_fifo() {
        let b = Broadcaster::new(16);
        let mut s1 = b.subscribe(None);
        let mut s2 = b.subscribe(None);

        let seqs: Vec<u64> = (0..10)
            .map(|_| {
                let ev = status("step");
                let seq = ev.seq;
                b.publish(ev);
                seq
            })
            .collect();

        for sub in [&mut s1, &mut s2] {
            let mut got = Vec::new();
            while let Some(ev) = sub.try_recv() {
                got.push(ev.seq);
            }
            assert_eq!(got, seqs);
        }
    }

    #[tokio::test]
    async fn late_subscriber_sees_only_new_events() {
        let b = Broadcaster::default();
        b.publish(status("start"));
        let mut s = b.subscribe(None);
        assert!(s.try_recv().is_none());
        b.publish(status("pause"));
        assert_eq!(s.try_recv().unwrap().as_status().unwrap().status, "pause");
    }

    #[tokio::test]
    async fn dropped_subscription_is_removed_on_publish() {
        let b = Broadcaster::default();
        let s1 = b.subscribe(None);
        let mut s2 = b.subscribe(None);
        let id1 = s1.id();
        drop(s1);

        b.publish(status("start"));
        assert!(!b.contains(id1));
        assert_eq!(b.len(), 1);
        assert!(s2.try_recv().is_some());
    }

    #[tokio::test]
    async fn detach_does_not_affect_others() {
        let b = Broadcaster::default();
        let s1 = b.subscribe(None);
        let mut s2 = b.subscribe(None);

        b.publish(status("start"));
        assert!(b.detach(s1.id()));
        assert!(!b.detach(s1.id()));
        b.publish(status("pause"));

        assert_eq!(s2.try_recv().unwrap().as_status().unwrap().status, "start");
        assert_eq!(s2.try_recv().unwrap().as_status().unwrap().status, "pause");
    }

    #[tokio::test]
    async fn full_queue_drops_for_that_subscriber_only() {
        let b = Broadcaster::default();
        let mut slow = b.subscribe(Some(1));
        let mut fast = b.subscribe(Some(8));

        b.publish(status("start"));
        b.publish(status("pause"));

        assert_eq!(b.dropped(slow.id()), Some(1));
        assert_eq!(b.dropped(fast.id()), Some(0));
        assert_eq!(slow.try_recv().unwrap().as_status().unwrap().status, "start");
        assert!(slow.try_recv().is_none());
        assert!(fast.try_recv().is_some());
        assert!(fast.try_recv().is_some());
    }

    #[tokio::test]
    async fn greeting_arrives_first() {
        let b = Broadcaster::default();
        let mut s = b.subscribe_with_greeting(None, || status("connected"));
        b.publish(status("start"));
        assert_eq!(s.try_recv().unwrap().as_status().unwrap().status, "connected");
        assert_eq!(s.try_recv().unwrap().as_status().unwrap().status, "start");
    }

    #[tokio::test]
    async fn worker_subscribers_survive_panics_of_others() {
        let b = Broadcaster::default();
        let collect = Arc::new(Collect {
            seen: Mutex::new(Vec::new()),
        });
        b.attach(Arc::new(Panicky));
        b.attach(collect.clone());

        let first = status("start");
        let first_seq = first.seq;
        b.publish(first);
        b.publish(status("pause"));
        b.shutdown().await;

        let seen = collect.seen.lock().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], first_seq);
        assert!(b.is_empty());
    }
}
