//! # Engine: wires the source, playback loop, broadcaster and control surface.
//!
//! The [`Engine`] owns the [`Broadcaster`], the control surface and the
//! playback loop's task. It is built by [`EngineBuilder`](super::EngineBuilder)
//! and lives for the process lifetime.
//!
//! ## High-level architecture
//! ```text
//! Build:
//!   Config ──► EngineBuilder::build()
//!                 ├─► EventSource::open(data_path)          (degrades to empty)
//!                 ├─► Broadcaster + initial subscribers      (before the loop starts)
//!                 └─► PlaybackActor::new() ─► tokio::spawn(actor.run(token))
//!
//! Runtime:
//!   ControlApi ── Command ──► PlaybackActor ── Event ──► Broadcaster ──► subscribers
//!   attach()/subscribe()  ──► Broadcaster (greeting "connected" first)
//!
//! Shutdown path:
//!   shutdown::wait_for_shutdown_signal()  (or a direct shutdown() call)
//!             └─► token.cancel()           → loop exits without draining records
//!             └─► timeout(cfg.grace, join):
//!                    ├─ Ok      → Broadcaster::shutdown() (workers drain and exit)
//!                    └─ Timeout → abort loop, Broadcaster::shutdown(), RuntimeError::GraceExceeded
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::control::ControlApi;
use crate::core::shutdown;
use crate::error::RuntimeError;
use crate::events::{Event, StatusNotice};
use crate::playback::PlaybackHandle;
use crate::records::EventSource;
use crate::subscribers::{Broadcaster, Subscribe, SubscriberId, Subscription};

use super::EngineBuilder;

/// Running replay engine.
pub struct Engine {
    cfg: Config,
    source: Arc<EventSource>,
    broadcaster: Arc<Broadcaster>,
    control: ControlApi,
    token: CancellationToken,
    playback: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    /// Starts building an engine from `cfg`.
    pub fn builder(cfg: Config) -> EngineBuilder {
        EngineBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        source: Arc<EventSource>,
        broadcaster: Arc<Broadcaster>,
        control: ControlApi,
        token: CancellationToken,
        playback: JoinHandle<()>,
    ) -> Self {
        Self {
            cfg,
            source,
            broadcaster,
            control,
            token,
            playback: Mutex::new(Some(playback)),
        }
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Control surface (commands, status and stats queries).
    pub fn control(&self) -> &ControlApi {
        &self.control
    }

    /// Direct handle to the playback loop.
    pub fn handle(&self) -> &PlaybackHandle {
        self.control.handle()
    }

    /// Fan-out used for every notification.
    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    /// Number of loaded records.
    pub fn total(&self) -> usize {
        self.source.total()
    }

    /// Attaches a subscriber; its first event is a `connected` status notice.
    pub fn attach(&self, sub: Arc<dyn Subscribe>) -> SubscriberId {
        let id = self.broadcaster.attach_with_greeting(sub, || self.greeting());
        tracing::info!(%id, subscribers = self.broadcaster.len(), "subscriber connected");
        id
    }

    /// Opens a pull subscription; its first event is a `connected` status notice.
    pub fn subscribe(&self) -> Subscription {
        let sub = self
            .broadcaster
            .subscribe_with_greeting(Some(self.cfg.queue_capacity_clamped()), || self.greeting());
        tracing::info!(id = %sub.id(), subscribers = self.broadcaster.len(), "subscriber connected");
        sub
    }

    /// Detaches a subscriber. Never waits on it.
    pub fn detach(&self, id: SubscriberId) -> bool {
        let removed = self.broadcaster.detach(id);
        if removed {
            tracing::info!(%id, "subscriber disconnected");
        }
        removed
    }

    /// Built under the broadcaster's write lock. The loop publishes its snapshot
    /// before the matching status notice, so a greeting that reads a stale
    /// snapshot is always followed by that notice.
    fn greeting(&self) -> Event {
        let status = self.control.status();
        Event::status(StatusNotice::new("connected", status.running, status.speed))
    }

    /// Runs until a termination signal arrives or the playback loop exits, then shuts down.
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        tokio::select! {
            res = shutdown::wait_for_shutdown_signal() => {
                match res {
                    Ok(sig) => tracing::info!(signal = sig, "shutdown requested"),
                    Err(e) => tracing::warn!(error = %e, "signal registration failed; shutting down"),
                }
            }
            _ = self.token.cancelled() => {}
        }
        self.shutdown().await
    }

    /// Cancels the playback loop and waits up to [`Config::grace`] for it.
    ///
    /// Idempotent: later calls return `Ok(())` immediately.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.token.cancel();
        let Some(mut join) = self.playback.lock().take() else {
            return Ok(());
        };

        let grace = self.cfg.grace;
        match tokio::time::timeout(grace, &mut join).await {
            Ok(_) => {
                self.broadcaster.shutdown().await;
                tracing::info!("engine stopped");
                Ok(())
            }
            Err(_) => {
                tracing::warn!(?grace, "playback loop did not stop within grace; aborting");
                join.abort();
                self.broadcaster.shutdown().await;
                Err(RuntimeError::GraceExceeded { grace })
            }
        }
    }

    /// Token cancelled on shutdown; embedders can tie their own tasks to it.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{PlaybackActor, PlaybackParams, Speed};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Count(AtomicUsize);

    #[async_trait]
    impl Subscribe for Count {
        async fn on_event(&self, _ev: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn grace_exceeded_still_stops_subscribers() {
        let source = Arc::new(EventSource::empty());
        let broadcaster = Arc::new(Broadcaster::default());
        let (_actor, handle) = PlaybackActor::new(
            Arc::clone(&source),
            Arc::clone(&broadcaster),
            PlaybackParams {
                base_interval: Duration::from_secs(1),
                speed: Speed::X1,
                autostart: false,
                command_capacity: 1,
            },
        );
        let stuck = tokio::spawn(std::future::pending::<()>());
        let cfg = Config {
            grace: Duration::from_millis(50),
            ..Config::default()
        };
        let engine = Engine::new_internal(
            cfg,
            source,
            Arc::clone(&broadcaster),
            ControlApi::new(handle),
            CancellationToken::new(),
            stuck,
        );

        let count = Arc::new(Count(AtomicUsize::new(0)));
        engine.attach(count.clone());

        let err = engine.shutdown().await.unwrap_err();
        assert!(matches!(err, RuntimeError::GraceExceeded { .. }));
        assert!(broadcaster.is_empty());
        // The greeting was drained before the worker exited.
        assert_eq!(count.0.load(Ordering::SeqCst), 1);
        assert!(engine.shutdown().await.is_ok());
    }
}
