//! # Telemetry records.
//!
//! A [`RawRecord`] is one row exactly as stored in the persisted source: every
//! column is kept as text. Decoding into a typed [`Record`] happens lazily, at
//! emission time, so a single malformed row is a per-record fault (skipped)
//! rather than a failure of the whole source.
//!
//! ## Stored columns
//! ```text
//! timestamp   ISO-8601 (with or without offset)
//! subject_id  string          (alias: pilgrim_id)
//! temp        decimal
//! ground      string          actual location
//! nusuk       string          permitted location
//! sos         True/False/true/false/1/0
//! lost_id     string or empty
//! ```

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// Columns that must be present in the header row.
pub(crate) const REQUIRED_COLUMNS: [&str; 6] = ["timestamp", "temp", "ground", "nusuk", "sos", "lost_id"];

/// One stored row, untyped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawRecord {
    pub timestamp: String,
    #[serde(alias = "pilgrim_id")]
    pub subject_id: String,
    pub temp: String,
    pub ground: String,
    pub nusuk: String,
    pub sos: String,
    #[serde(default)]
    pub lost_id: Option<String>,
}

/// One decoded telemetry record. Immutable once built.
///
/// Serializes with the stored column names so subscribers see the same
/// vocabulary as the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: NaiveDateTime,
    pub subject_id: String,
    #[serde(rename = "temp")]
    pub temperature: f64,
    #[serde(rename = "ground")]
    pub actual_location: String,
    #[serde(rename = "nusuk")]
    pub permitted_location: String,
    #[serde(rename = "sos")]
    pub distress_flag: bool,
    #[serde(rename = "lost_id")]
    pub separated_from_id: Option<String>,
}

impl Record {
    /// `timestamp` rendered as `HH:MM:SS` (used by the location summary).
    pub fn clock_time(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

impl TryFrom<&RawRecord> for Record {
    type Error = RecordError;

    fn try_from(raw: &RawRecord) -> Result<Self, Self::Error> {
        Ok(Record {
            timestamp: parse_timestamp(&raw.timestamp)?,
            subject_id: raw.subject_id.trim().to_string(),
            temperature: parse_temperature(&raw.temp)?,
            actual_location: raw.ground.trim().to_string(),
            permitted_location: raw.nusuk.trim().to_string(),
            distress_flag: parse_flag(&raw.sos)?,
            separated_from_id: raw
                .lost_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        })
    }
}

impl From<&Record> for RawRecord {
    fn from(r: &Record) -> Self {
        RawRecord {
            timestamp: r.timestamp.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            subject_id: r.subject_id.clone(),
            temp: r.temperature.to_string(),
            ground: r.actual_location.clone(),
            nusuk: r.permitted_location.clone(),
            sos: if r.distress_flag { "True" } else { "False" }.to_string(),
            lost_id: r.separated_from_id.clone(),
        }
    }
}

fn invalid(field: &'static str, value: &str, reason: impl ToString) -> RecordError {
    RecordError::InvalidField {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Accepts RFC 3339 (offset is dropped, local wall time kept) or a naive ISO-8601 datetime.
fn parse_timestamp(value: &str) -> Result<NaiveDateTime, RecordError> {
    let v = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
        return Ok(dt.naive_local());
    }
    NaiveDateTime::parse_from_str(v, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(v, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|e| invalid("timestamp", value, e))
}

fn parse_temperature(value: &str) -> Result<f64, RecordError> {
    let t: f64 = value.trim().parse().map_err(|e| invalid("temp", value, e))?;
    if t.is_finite() {
        Ok(t)
    } else {
        Err(invalid("temp", value, "not a finite number"))
    }
}

fn parse_flag(value: &str) -> Result<bool, RecordError> {
    match value.trim() {
        "True" | "true" | "TRUE" | "1" => Ok(true),
        "False" | "false" | "FALSE" | "0" | "" => Ok(false),
        other => Err(invalid("sos", other, "expected a boolean literal")),
    }
}
