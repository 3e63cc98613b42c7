//! # PlaybackActor: the single-writer playback loop.
//!
//! Owns [`PlaybackState`] and [`StatsAggregator`] exclusively. Nothing else
//! mutates cursor, mode, speed or counters; callers marshal [`Command`]s over
//! one mpsc channel and read [`PlaybackSnapshot`]s from a watch channel.
//!
//! ## Architecture
//! ```text
//! PlaybackHandle ── Envelope{Command, reply} ──► mpsc ──┐
//!                                                       ▼
//! loop {                                         PlaybackActor::run()
//!   select! {
//!     token.cancelled()          ─► exit (remaining records are not drained)
//!     commands.recv()            ─► apply ─► snapshot ─► publish status ─► reply
//!     sleep_until(next_due)      ─► (only while RUNNING)
//!         ├─► source.get(cursor) ─► classify ─► stats.record()
//!         ├─► publish realtime_event + counters_update
//!         ├─► cursor += 1
//!         └─► cursor == total ? finish() : next_due = now + base/speed
//!   }
//!   snapshot.send_replace(...)
//! }
//! ```
//!
//! ## Rules
//! - The only suspension points are the pacing deadline and the idle wait for
//!   a command; both are `select!` branches, so a command or cancellation is
//!   observed at once (PAUSE does not wait out the remaining delay).
//! - While STOPPED there is no deadline: the loop sleeps until a command arrives.
//! - A record that fails to decode is logged and skipped; the cursor still advances.
//! - Every accepted command publishes a status notice **after** its effect.
//! - The snapshot is published before the status notice that announces it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::classify::ClassifiedEvent;
use crate::error::ControlError;
use crate::events::{Event, LocationSummary, StatusNotice};
use crate::records::EventSource;
use crate::subscribers::Broadcaster;

use super::command::{Command, Envelope, Reply};
use super::handle::PlaybackHandle;
use super::state::{Mode, PlaybackSnapshot, PlaybackState, Speed};
use super::stats::StatsAggregator;

/// Construction parameters for a [`PlaybackActor`].
#[derive(Clone)]
pub struct PlaybackParams {
    /// Delay between emissions at 1×.
    pub base_interval: Duration,
    /// Initial speed.
    pub speed: Speed,
    /// Enter RUNNING right away (only if the source is not empty).
    pub autostart: bool,
    /// Capacity of the command channel.
    pub command_capacity: usize,
}

/// The playback loop. Build with [`PlaybackActor::new`], drive with [`PlaybackActor::run`].
pub struct PlaybackActor {
    source: Arc<EventSource>,
    broadcaster: Arc<Broadcaster>,
    params: PlaybackParams,

    state: PlaybackState,
    stats: StatsAggregator,

    commands: mpsc::Receiver<Envelope>,
    snapshot: watch::Sender<PlaybackSnapshot>,

    /// Deadline of the next emission; `None` while stopped.
    next_due: Option<Instant>,
    /// Instant of the last emission (pacing reference for resume/speed changes).
    last_emit: Option<Instant>,
}

impl PlaybackActor {
    /// Creates the actor and the handle used to control it.
    pub fn new(
        source: Arc<EventSource>,
        broadcaster: Arc<Broadcaster>,
        params: PlaybackParams,
    ) -> (Self, PlaybackHandle) {
        let state = PlaybackState::new(source.total(), params.speed);
        let stats = StatsAggregator::new();
        let (tx, rx) = mpsc::channel(params.command_capacity.max(1));
        let (snap_tx, snap_rx) = watch::channel(PlaybackSnapshot::capture(&state, stats.snapshot()));

        let actor = Self {
            source,
            broadcaster,
            params,
            state,
            stats,
            commands: rx,
            snapshot: snap_tx,
            next_due: None,
            last_emit: None,
        };
        (actor, PlaybackHandle::new(tx, snap_rx))
    }

    /// Runs until `token` is cancelled, or until every handle is dropped while stopped.
    pub async fn run(mut self, token: CancellationToken) {
        tracing::info!(
            total = self.state.total,
            speed = %self.state.speed,
            autostart = self.params.autostart,
            "playback loop started"
        );
        if self.params.autostart && self.state.total > 0 {
            self.start();
            self.publish_snapshot();
            self.publish_status(Command::Start.echo());
        }

        let mut commands_open = true;
        loop {
            if !commands_open && !self.state.is_running() {
                break;
            }
            let due = self.next_due;

            tokio::select! {
                biased;

                _ = token.cancelled() => break,

                msg = self.commands.recv(), if commands_open => match msg {
                    Some(env) => self.handle(env),
                    None => commands_open = false,
                },

                _ = time::sleep_until(due.unwrap_or_else(Instant::now)), if due.is_some() => {
                    self.tick();
                }
            }
        }

        tracing::info!(
            cursor = self.state.cursor,
            total = self.state.total,
            "playback loop stopped"
        );
    }

    /// Applies one command, publishes its status notice and replies.
    fn handle(&mut self, env: Envelope) {
        let Envelope { command, reply } = env;
        let result = self.apply(command);

        match &result {
            Ok(message) => {
                tracing::info!(command = command.echo(), %message, "command accepted");
                self.publish_snapshot();
                self.publish_status(command.echo());
                if command == Command::Start && self.state.at_end() {
                    self.finish();
                }
            }
            Err(e) => {
                tracing::info!(command = command.echo(), error = %e, label = e.as_label(), "command rejected");
            }
        }

        let _ = reply.send(result);
    }

    fn apply(&mut self, command: Command) -> Reply {
        match command {
            Command::Start => {
                self.start();
                Ok("Simulation started.".to_string())
            }
            Command::Pause => {
                self.stop();
                Ok("Simulation paused.".to_string())
            }
            Command::Reset => {
                self.stop();
                self.state.cursor = 0;
                self.state.skipped = 0;
                self.stats.reset();
                self.last_emit = None;
                Ok("Simulation reset.".to_string())
            }
            Command::Step => {
                if self.state.is_running() {
                    return Err(ControlError::transition("Cannot step while running."));
                }
                if self.state.at_end() {
                    return Err(ControlError::transition("No records left to step."));
                }
                let index = self.state.cursor;
                let emitted = self.emit_next();
                if emitted {
                    Ok(format!("Stepped to record {}/{}.", index + 1, self.state.total))
                } else {
                    Ok(format!("Record {}/{} skipped.", index + 1, self.state.total))
                }
            }
            Command::SetSpeed(speed) => {
                self.state.speed = speed;
                if self.state.is_running() {
                    if let Some(last) = self.last_emit {
                        self.next_due = Some(last + self.interval());
                    }
                }
                Ok(format!("Playback speed set to {speed}."))
            }
        }
    }

    /// Enters RUNNING. No effect on pacing if already running.
    fn start(&mut self) {
        if self.state.is_running() {
            return;
        }
        self.state.mode = Mode::Running;
        let now = Instant::now();
        self.next_due = Some(match self.last_emit {
            Some(last) if last + self.interval() > now => last + self.interval(),
            _ => now,
        });
    }

    fn stop(&mut self) {
        self.state.mode = Mode::Stopped;
        self.next_due = None;
    }

    /// Natural completion: STOPPED plus a `finished` notice.
    fn finish(&mut self) {
        self.stop();
        tracing::info!(total = self.state.total, skipped = self.state.skipped, "playback finished");
        self.publish_snapshot();
        self.publish_status("finished");
    }

    /// Pacing deadline reached while RUNNING.
    fn tick(&mut self) {
        if !self.state.is_running() {
            self.next_due = None;
            return;
        }
        if !self.state.at_end() {
            self.emit_next();
        }
        if self.state.at_end() {
            self.finish();
        } else {
            self.next_due = Some(Instant::now() + self.interval());
        }
        self.publish_snapshot();
    }

    /// Classifies and publishes the record under the cursor, then advances it.
    ///
    /// Returns `false` if the record could not be decoded and was skipped.
    fn emit_next(&mut self) -> bool {
        let index = self.state.cursor;
        self.state.cursor += 1;
        self.last_emit = Some(Instant::now());

        match self.source.get(index) {
            Ok(record) => {
                let classified = ClassifiedEvent::new(record);
                self.stats.record(classified.alert);
                tracing::debug!(
                    index,
                    alert = %classified.alert,
                    subject = %classified.record.subject_id,
                    "record classified"
                );
                let summary = LocationSummary::from(&classified.record);
                self.broadcaster.publish(Event::classified(classified));
                self.broadcaster.publish(Event::summary(summary));
                true
            }
            Err(e) => {
                self.state.skipped += 1;
                tracing::warn!(index, error = %e, label = e.as_label(), "skipping undecodable record");
                false
            }
        }
    }

    fn interval(&self) -> Duration {
        self.state.speed.interval(self.params.base_interval)
    }

    fn publish_status(&self, status: &'static str) {
        self.broadcaster.publish(Event::status(StatusNotice::new(
            status,
            self.state.is_running(),
            self.state.speed,
        )));
    }

    fn publish_snapshot(&self) {
        self.snapshot
            .send_replace(PlaybackSnapshot::capture(&self.state, self.stats.snapshot()));
    }
}
