//! Timestamp detection and extraction for the temporal policy.

mod detector;
mod formats;

pub use detector::{is_temporal_field_name, DatetimeDetector, DetectedField};
pub use formats::{normalize, parse_timestamp, DATETIME_FORMATS, MIN_TIMESTAMP};

use chrono::NaiveDateTime;
use tracing::warn;

use crate::value::Value;

/// The field and pattern a layer's timestamps are read with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporalKey {
    pub field: String,
    pub field_index: usize,
    pub format: &'static str,
}

impl From<DetectedField> for TemporalKey {
    fn from(d: DetectedField) -> Self {
        Self {
            field: d.field,
            field_index: d.field_index,
            format: d.format,
        }
    }
}

impl TemporalKey {
    /// Reads the timestamp of an attribute row.
    ///
    /// Missing, non-string or unparseable values resolve to `MIN_TIMESTAMP`,
    /// so one bad record can only lose priority, never abort a run.
    #[must_use]
    pub fn timestamp(&self, row: &[Value]) -> NaiveDateTime {
        let Some(raw) = row.get(self.field_index).and_then(Value::as_non_empty_str) else {
            return MIN_TIMESTAMP;
        };
        parse_timestamp(raw, self.format).unwrap_or_else(|| {
            warn!(field = %self.field, value = raw, format = self.format, "unparseable timestamp, using minimum");
            MIN_TIMESTAMP
        })
    }
}
