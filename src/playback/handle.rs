use tokio::sync::{mpsc, oneshot, watch};

use crate::error::ControlError;

use super::command::{Command, Envelope, Reply};
use super::state::{PlaybackSnapshot, StatusView};
use super::stats::Counters;

/// Handle for sending commands to the playback loop and reading its state.
///
/// Cheap to clone. Reads never touch loop-owned state: they borrow the last
/// snapshot the loop published.
#[derive(Clone)]
pub struct PlaybackHandle {
    tx: mpsc::Sender<Envelope>,
    snapshot: watch::Receiver<PlaybackSnapshot>,
}

impl PlaybackHandle {
    pub(crate) fn new(tx: mpsc::Sender<Envelope>, snapshot: watch::Receiver<PlaybackSnapshot>) -> Self {
        Self { tx, snapshot }
    }

    /// Sends a command and waits for the loop to apply it.
    pub async fn send(&self, command: Command) -> Reply {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                command,
                reply,
            })
            .await
            .map_err(|_| ControlError::Closed)?;
        rx.await.map_err(|_| ControlError::Closed)?
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshot.borrow().clone()
    }

    /// `{running, speed, cursor, total}`.
    pub fn status(&self) -> StatusView {
        self.snapshot.borrow().status()
    }

    /// Cumulative counters.
    pub fn stats(&self) -> Counters {
        self.snapshot.borrow().counters
    }

    /// Waits until a published snapshot satisfies `pred`.
    ///
    /// Fails with [`ControlError::Closed`] if the loop exits first.
    pub async fn wait_for(
        &self,
        mut pred: impl FnMut(&PlaybackSnapshot) -> bool,
    ) -> Result<PlaybackSnapshot, ControlError> {
        let mut rx = self.snapshot.clone();
        let snap = rx.wait_for(|s| pred(s)).await.map_err(|_| ControlError::Closed)?;
        Ok(snap.clone())
    }
}
