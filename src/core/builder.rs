use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    control::ControlApi,
    playback::PlaybackActor,
    records::EventSource,
    subscribers::{Broadcaster, Subscribe},
};

use super::engine::Engine;

/// Builder for constructing an [`Engine`].
pub struct EngineBuilder {
    cfg: Config,
    source: Option<EventSource>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl EngineBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            source: None,
            subscribers: Vec::new(),
        }
    }

    /// Uses `source` instead of loading [`Config::data_path`].
    pub fn with_source(mut self, source: EventSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Subscribers attached before the playback loop starts.
    ///
    /// They see every event from the first one on (including autostart output),
    /// without a `connected` greeting.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the engine and spawns the playback loop.
    ///
    /// Must be called within a tokio runtime. A missing or malformed source is
    /// logged and replaced by an empty one.
    pub fn build(self) -> Arc<Engine> {
        let source = Arc::new(match (self.source, &self.cfg.data_path) {
            (Some(source), _) => source,
            (None, Some(path)) => EventSource::open(path),
            (None, None) => {
                tracing::warn!("no record source configured; serving an empty source");
                EventSource::empty()
            }
        });

        let broadcaster = Arc::new(Broadcaster::new(self.cfg.queue_capacity_clamped()));
        for sub in self.subscribers {
            broadcaster.attach(sub);
        }

        let (actor, handle) = PlaybackActor::new(
            Arc::clone(&source),
            Arc::clone(&broadcaster),
            self.cfg.playback_params(),
        );
        let token = CancellationToken::new();
        let join = tokio::spawn(actor.run(token.child_token()));

        Arc::new(Engine::new_internal(
            self.cfg,
            source,
            broadcaster,
            ControlApi::new(handle),
            token,
            join,
        ))
    }
}
