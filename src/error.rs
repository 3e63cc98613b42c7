//! Error types used by the crowdwatch engine.
//!
//! - [`LoadError`]: the record source could not be read (the engine degrades to an empty source).
//! - [`RecordError`]: a single stored record could not be decoded (the record is skipped).
//! - [`ControlError`]: a control command was rejected (state is left unchanged).
//! - [`RuntimeError`]: the runtime itself failed (shutdown grace exceeded).
//!
//! All of them provide `as_label` (stable snake_case label for logs) and `as_message`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// # Errors produced while loading the record source.
///
/// None of these are fatal: the engine logs them and keeps serving an idle,
/// empty source.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LoadError {
    /// The source file does not exist.
    #[error("record source not found: {path:?}")]
    NotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// The source file exists but could not be read.
    #[error("failed to read record source {path:?}: {source}")]
    Io {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The source is not well-formed CSV (bad header, ragged rows, bad encoding).
    #[error("malformed record source {path:?}: {source}")]
    Csv {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying parser failure.
        #[source]
        source: csv::Error,
    },

    /// A required column is missing from the header row.
    #[error("record source {path:?} has no `{column}` column")]
    MissingColumn {
        /// Path that was requested.
        path: PathBuf,
        /// Name of the missing column.
        column: &'static str,
    },
}

impl LoadError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            LoadError::NotFound { .. } => "load_not_found",
            LoadError::Io { .. } => "load_io",
            LoadError::Csv { .. } => "load_malformed",
            LoadError::MissingColumn { .. } => "load_missing_column",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

/// # Errors produced while decoding one stored record.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// Index is outside `0..total`.
    #[error("record index {index} out of range (total {total})")]
    OutOfRange {
        /// Requested index.
        index: usize,
        /// Number of stored records.
        total: usize,
    },

    /// A field holds a value that cannot be converted to its typed form.
    #[error("invalid `{field}` value {value:?}: {reason}")]
    InvalidField {
        /// Column name as stored.
        field: &'static str,
        /// Raw stored value.
        value: String,
        /// Parser complaint.
        reason: String,
    },
}

impl RecordError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RecordError::OutOfRange { .. } => "record_out_of_range",
            RecordError::InvalidField { .. } => "record_invalid_field",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RecordError::OutOfRange { index, total } => {
                format!("index {index} >= total {total}")
            }
            RecordError::InvalidField { field, value, .. } => {
                format!("bad {field}: {value:?}")
            }
        }
    }
}

/// # Errors returned to callers of the control surface.
///
/// A rejected command never changes playback state.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// The command is not allowed in the current state (e.g. STEP while running).
    #[error("invalid transition: {reason}")]
    InvalidTransition {
        /// Why the transition was refused.
        reason: String,
    },

    /// The command value is malformed or unsupported.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// User-facing reason.
        reason: String,
    },

    /// The command name is not recognised.
    #[error("unknown command: {name:?}")]
    UnknownCommand {
        /// Name as received.
        name: String,
    },

    /// The playback loop is no longer running (engine shut down).
    #[error("playback loop closed")]
    Closed,
}

impl ControlError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ControlError::InvalidTransition { .. } => "control_invalid_transition",
            ControlError::InvalidArgument { .. } => "control_invalid_argument",
            ControlError::UnknownCommand { .. } => "control_unknown_command",
            ControlError::Closed => "control_closed",
        }
    }

    /// Returns the message shown to the caller in a control response.
    pub fn as_message(&self) -> String {
        match self {
            ControlError::InvalidTransition { reason } => reason.clone(),
            ControlError::InvalidArgument { reason } => reason.clone(),
            ControlError::UnknownCommand { .. } => "Invalid action.".to_string(),
            ControlError::Closed => "Playback engine is shut down.".to_string(),
        }
    }

    pub(crate) fn transition(reason: impl Into<String>) -> Self {
        ControlError::InvalidTransition {
            reason: reason.into(),
        }
    }

    pub(crate) fn argument(reason: impl Into<String>) -> Self {
        ControlError::InvalidArgument {
            reason: reason.into(),
        }
    }
}

/// # Errors produced by the engine runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The playback loop did not stop within the grace period.
    #[error("shutdown timeout {grace:?} exceeded; playback loop still running")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use crowdwatch::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5) };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace } => {
                format!("grace exceeded after {grace:?}")
            }
        }
    }
}
