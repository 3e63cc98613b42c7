//! # EventSource: the ordered, read-only record sequence.
//!
//! Loaded once (CSV with a header row) and never mutated afterwards. Order is
//! the file order; the source trusts the producer to have sorted rows by
//! timestamp and never re-sorts.
//!
//! ## Rules
//! - A missing or malformed source leaves the sequence **empty** (`total = 0`);
//!   [`EventSource::open`] logs the [`LoadError`] and carries on.
//! - Rows are decoded on [`EventSource::get`], so one bad row is a per-record
//!   fault, not a load failure.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::{LoadError, RecordError};

use super::record::{RawRecord, Record, REQUIRED_COLUMNS};

/// Ordered, 0-indexed, immutable record sequence.
#[derive(Debug, Clone, Default)]
pub struct EventSource {
    rows: Vec<RawRecord>,
}

impl EventSource {
    /// An empty source (`total = 0`).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a source from already-decoded records (tests, embedding).
    #[must_use]
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        Self {
            rows: records.into_iter().map(RawRecord::from).collect(),
        }
    }

    /// Builds a source from stored rows as-is.
    #[must_use]
    pub fn from_raw(rows: Vec<RawRecord>) -> Self {
        Self { rows }
    }

    /// Loads `path`, degrading to an empty source on failure (logged at `warn`).
    pub fn open(path: impl AsRef<Path>) -> Self {
        let mut source = Self::empty();
        if let Err(e) = source.load(path.as_ref()) {
            tracing::warn!(error = %e, label = e.as_label(), "record source unavailable; serving an empty source");
        }
        source
    }

    /// Replaces the content with the rows stored at `path`.
    ///
    /// On error the source is left empty.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let path = path.as_ref();
        self.rows.clear();

        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound {
                path: path.to_path_buf(),
            },
            _ => LoadError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        self.rows = read_rows(file, path)?;
        tracing::info!(path = %path.display(), total = self.rows.len(), "record source loaded");
        Ok(())
    }

    /// Number of stored records.
    #[must_use]
    pub fn total(&self) -> usize {
        self.rows.len()
    }

    /// True if there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Decodes the record at `index`.
    ///
    /// Callers must check `index < total()`; out-of-range yields
    /// [`RecordError::OutOfRange`].
    pub fn get(&self, index: usize) -> Result<Record, RecordError> {
        let raw = self.rows.get(index).ok_or(RecordError::OutOfRange {
            index,
            total: self.rows.len(),
        })?;
        Record::try_from(raw)
    }
}

fn read_rows<R: Read>(input: R, path: &Path) -> Result<Vec<RawRecord>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(input);

    let headers = reader.headers().map_err(csv_err)?.clone();
    let has = |name: &str| headers.iter().any(|h| h == name);
    if !has("subject_id") && !has("pilgrim_id") {
        return Err(LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: "subject_id",
        });
    }
    if let Some(column) = REQUIRED_COLUMNS.into_iter().find(|c| !has(*c)) {
        return Err(LoadError::MissingColumn {
            path: path.to_path_buf(),
            column,
        });
    }

    // `pilgrim_id` is only an alias; when both columns exist `subject_id` wins.
    if has("subject_id") && has("pilgrim_id") {
        tracing::debug!(path = %path.display(), "both subject_id and pilgrim_id present; using subject_id");
        let renamed: csv::StringRecord = headers
            .iter()
            .map(|h| if h == "pilgrim_id" { "pilgrim_id.ignored" } else { h })
            .collect();
        reader.set_headers(renamed);
    }

    reader
        .deserialize::<RawRecord>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_err)
}
