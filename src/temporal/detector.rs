//! Datetime field detection.
//!
//! Fields whose names look temporal are tried first; if none of them yields a
//! format, every field is scanned in schema order.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::value::Value;

use super::formats::{normalize, parse_normalized, DATETIME_FORMATS};

const FIELD_KEYWORD_PATTERN: &str = r"(?i)date|time|dt|datetime|survey|gps|epoch";

static FIELD_KEYWORDS: OnceLock<Option<Regex>> = OnceLock::new();

/// True if a field name contains a date/time keyword (case-insensitive).
#[must_use]
pub fn is_temporal_field_name(name: &str) -> bool {
    FIELD_KEYWORDS
        .get_or_init(|| Regex::new(FIELD_KEYWORD_PATTERN).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}

/// A field together with the pattern its samples matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedField {
    pub field: String,
    pub field_index: usize,
    pub format: &'static str,
}

/// Infers timestamp formats from sample values.
#[derive(Debug, Clone)]
pub struct DatetimeDetector {
    sample_size: usize,
    threshold: f64,
}

impl Default for DatetimeDetector {
    fn default() -> Self {
        Self::from_config(&ResolverConfig::default())
    }
}

impl DatetimeDetector {
    #[must_use]
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self {
            sample_size: config.datetime_sample_size,
            threshold: config.datetime_match_threshold,
        }
    }

    /// Returns the first pattern, in list order, whose match ratio over
    /// `samples` exceeds the threshold.
    ///
    /// Samples are normalized before matching. Returns `None` for an empty
    /// sample set.
    #[must_use]
    pub fn detect_format<S: AsRef<str>>(&self, samples: &[S]) -> Option<&'static str> {
        if samples.is_empty() {
            return None;
        }
        let normalized: Vec<String> = samples.iter().map(|s| normalize(s.as_ref())).collect();
        let total = normalized.len() as f64;

        DATETIME_FORMATS.iter().copied().find(|format| {
            let matched = normalized
                .iter()
                .filter(|v| parse_normalized(v, format).is_some())
                .count();
            matched as f64 / total > self.threshold
        })
    }

    /// Collects up to `sample_size` non-empty string values of column `index`.
    fn sample<'r, I>(&self, rows: I, index: usize) -> Vec<&'r str>
    where
        I: Iterator<Item = &'r [Value]>,
    {
        rows.filter_map(|row| row.get(index).and_then(Value::as_non_empty_str))
            .take(self.sample_size)
            .collect()
    }

    fn detect_column<'r, I>(&self, fields: &[String], rows: &I, index: usize) -> Option<DetectedField>
    where
        I: Iterator<Item = &'r [Value]> + Clone,
    {
        let samples = self.sample(rows.clone(), index);
        let format = self.detect_format(&samples)?;
        debug!(
            field = %fields[index],
            format,
            samples = samples.len(),
            "detected datetime field"
        );
        Some(DetectedField {
            field: fields[index].clone(),
            field_index: index,
            format,
        })
    }

    /// Detects every timestamp field of a layer, in schema order.
    ///
    /// `rows` yields attribute rows aligned with `fields`, in feature order.
    pub fn detect_fields<'r, I>(&self, fields: &[String], rows: I) -> Vec<DetectedField>
    where
        I: Iterator<Item = &'r [Value]> + Clone,
    {
        let by_name: Vec<DetectedField> = (0..fields.len())
            .filter(|&i| is_temporal_field_name(&fields[i]))
            .filter_map(|i| self.detect_column(fields, &rows, i))
            .collect();
        if !by_name.is_empty() {
            return by_name;
        }

        (0..fields.len())
            .filter_map(|i| self.detect_column(fields, &rows, i))
            .collect()
    }
}
