//! # ControlApi: request/response surface over the playback loop.
//!
//! Translates `{action, value?}` requests into [`Command`]s, forwards them to
//! the loop and turns the outcome into `{status: ok|error, message}`. Parsing
//! and validation happen here, before anything reaches the loop, so a rejected
//! request never changes state.
//!
//! ```text
//! {action:"SPEED", value:2} ─► parse ─► Command::SetSpeed(X2) ─► PlaybackHandle::send
//!                                 │                                    │
//!                                 └─ Err ─► {status:error}             └─► {status:ok, message}
//! ```
//!
//! Transport bindings (HTTP, websocket, stdin) are up to the embedder; the
//! `crowdwatch` binary reads requests as text lines.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ControlError;
use crate::playback::{Command, Counters, PlaybackHandle, Speed, StatusView};

/// Incoming command request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ControlRequest {
    pub action: String,
    #[serde(default)]
    pub value: Option<Value>,
}

impl ControlRequest {
    pub fn new(action: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            action: action.into(),
            value,
        }
    }
}

/// `ok` / `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// Command response: `{status, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlResponse {
    pub status: ResponseStatus,
    pub message: String,
}

impl ControlResponse {
    /// True if the command was applied.
    pub fn accepted(&self) -> bool {
        self.status == ResponseStatus::Ok
    }
}

impl From<Result<String, ControlError>> for ControlResponse {
    fn from(res: Result<String, ControlError>) -> Self {
        match res {
            Ok(message) => Self {
                status: ResponseStatus::Ok,
                message,
            },
            Err(e) => Self {
                status: ResponseStatus::Error,
                message: e.as_message(),
            },
        }
    }
}

/// Request/response front of the playback loop.
#[derive(Clone)]
pub struct ControlApi {
    handle: PlaybackHandle,
}

impl ControlApi {
    pub fn new(handle: PlaybackHandle) -> Self {
        Self { handle }
    }

    /// Parses an action name (case-insensitive) and optional value into a [`Command`].
    pub fn parse(action: &str, value: Option<&Value>) -> Result<Command, ControlError> {
        match action.trim().to_ascii_uppercase().as_str() {
            "START" => Ok(Command::Start),
            "PAUSE" => Ok(Command::Pause),
            "RESET" => Ok(Command::Reset),
            "STEP" => Ok(Command::Step),
            "SPEED" | "SET_SPEED" => parse_speed(value).map(Command::SetSpeed),
            _ => Err(ControlError::UnknownCommand {
                name: action.to_string(),
            }),
        }
    }

    /// Executes one request and returns the structured response.
    pub async fn execute(&self, req: &ControlRequest) -> ControlResponse {
        let res = self.command(&req.action, req.value.as_ref()).await;
        if let Err(e) = &res {
            tracing::debug!(action = %req.action, label = e.as_label(), "control request refused");
        }
        res.into()
    }

    /// Parses and sends one command.
    pub async fn command(&self, action: &str, value: Option<&Value>) -> Result<String, ControlError> {
        let command = Self::parse(action, value)?;
        self.handle.send(command).await
    }

    /// `{running, speed, cursor, total}`.
    pub fn status(&self) -> StatusView {
        self.handle.status()
    }

    /// Cumulative counters.
    pub fn stats(&self) -> Counters {
        self.handle.stats()
    }

    /// Underlying loop handle.
    pub fn handle(&self) -> &PlaybackHandle {
        &self.handle
    }
}

fn parse_speed(value: Option<&Value>) -> Result<Speed, ControlError> {
    let format_err = || ControlError::argument("Invalid speed format.");
    let n = match value {
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => i,
            None => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() <= i64::MAX as f64)
                .map(|f| f as i64)
                .ok_or_else(format_err)?,
        },
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| format_err())?,
        _ => return Err(format_err()),
    };
    Speed::try_from(n)
}
