//! Telemetry records and the ordered source they are replayed from.
//!
//! ## Contents
//! - [`RawRecord`] one stored row, untyped
//! - [`Record`] decoded, immutable telemetry record
//! - [`EventSource`] ordered read-by-index sequence loaded from CSV

mod record;
mod source;

pub use record::{RawRecord, Record};
pub use source::EventSource;
