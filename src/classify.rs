//! # Alert classification.
//!
//! [`classify`] maps a [`Record`] to an [`Alert`] severity plus an action text
//! and an icon. The rules are checked in fixed priority order; the first one
//! that holds wins:
//!
//! ```text
//! ground != nusuk        ─► RED     🚨  route violation
//! sos                    ─► ORANGE  🚑  distress
//! temp >= 40.0           ─► YELLOW  ☀️  heat stress
//! lost_id present        ─► BLUE    👤  separated / lost
//! otherwise              ─► GREEN   ✅  safe
//! ```
//!
//! The function is pure and allocation-light; it is safe to call from any
//! thread without synchronization.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::records::Record;

/// Temperature at or above which a record is a heat-stress alert.
pub const HEAT_STRESS_THRESHOLD: f64 = 40.0;

/// Alert severity. Ordering follows priority: `Green < Blue < Yellow < Orange < Red`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Alert {
    Green,
    Blue,
    Yellow,
    Orange,
    Red,
}

impl Alert {
    /// Upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Alert::Green => "GREEN",
            Alert::Blue => "BLUE",
            Alert::Yellow => "YELLOW",
            Alert::Orange => "ORANGE",
            Alert::Red => "RED",
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub alert: Alert,
    pub action: String,
    pub icon: &'static str,
}

/// A classified record as pushed to subscribers.
///
/// Wire shape: `{alert, action, icon, event: {..record fields..}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedEvent {
    pub alert: Alert,
    pub action: String,
    pub icon: &'static str,
    #[serde(rename = "event")]
    pub record: Record,
}

impl ClassifiedEvent {
    /// Classifies `record` and takes ownership of it.
    pub fn new(record: Record) -> Self {
        let Classification {
            alert,
            action,
            icon,
        } = classify(&record);
        Self {
            alert,
            action,
            icon,
            record,
        }
    }
}

/// Classifies a record by the fixed priority rules.
pub fn classify(r: &Record) -> Classification {
    let (alert, action, icon) = if r.actual_location != r.permitted_location {
        (
            Alert::Red,
            "critical route violation — identify violators and dispatch patrol".to_string(),
            "🚨",
        )
    } else if r.distress_flag {
        (
            Alert::Orange,
            "distress signal — dispatch immediate medical aid".to_string(),
            "🚑",
        )
    } else if r.temperature >= HEAT_STRESS_THRESHOLD {
        (
            Alert::Yellow,
            "heat-stress risk — dispatch hydration teams".to_string(),
            "☀️",
        )
    } else if let Some(id) = r.separated_from_id.as_deref().filter(|id| !id.is_empty()) {
        (
            Alert::Blue,
            format!("separated/lost — notify contact for {id}"),
            "👤",
        )
    } else {
        (Alert::Green, "safe and on route".to_string(), "✅")
    };

    Classification {
        alert,
        action,
        icon,
    }
}
