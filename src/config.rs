//! Resolver configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ResolverResult, ValidationError};

/// Which overlaps cede area to a higher-authority feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapScope {
    /// Only subdivision overlaps (the partner lies almost wholly inside the feature).
    #[default]
    SubdivisionOnly,
    /// Every overlap above the noise threshold.
    AllOverlaps,
}

/// Tunables for a resolution run.
///
/// # Example
/// ```
/// use overlap_resolver::{OverlapScope, ResolverConfig};
///
/// let cfg = ResolverConfig::from_json_str(r#"{ "overlap_scope": "all_overlaps" }"#).unwrap();
/// assert_eq!(cfg.overlap_scope, OverlapScope::AllOverlaps);
/// assert!((cfg.subdivision_ratio - 0.95).abs() < f64::EPSILON);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// An overlap is a subdivision when `intersection_area > ratio * partner_area`.
    pub subdivision_ratio: f64,
    /// Intersections smaller than this are numerical noise, not overlaps.
    pub min_overlap_area: f64,
    /// Maximum number of non-empty string samples inspected per field.
    pub datetime_sample_size: usize,
    /// A timestamp pattern is accepted when its match ratio exceeds this value.
    pub datetime_match_threshold: f64,
    /// Fan candidate search out over a rayon pool.
    pub parallel_detection: bool,
    pub overlap_scope: OverlapScope,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            subdivision_ratio: 0.95,
            min_overlap_area: 1e-9,
            datetime_sample_size: 10,
            datetime_match_threshold: 0.7,
            parallel_detection: true,
            overlap_scope: OverlapScope::SubdivisionOnly,
        }
    }
}

impl ResolverConfig {
    /// Parse a configuration from JSON. Missing keys take their defaults.
    ///
    /// # Errors
    /// Returns an error on malformed JSON or if validation fails.
    pub fn from_json_str(json: &str) -> ResolverResult<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.subdivision_ratio > 0.0 && self.subdivision_ratio <= 1.0) {
            return Err(ValidationError::InvalidConfig {
                reason: format!("subdivision_ratio must be in (0, 1], got {}", self.subdivision_ratio),
            });
        }
        if !self.min_overlap_area.is_finite() || self.min_overlap_area < 0.0 {
            return Err(ValidationError::InvalidConfig {
                reason: format!("min_overlap_area must be finite and >= 0, got {}", self.min_overlap_area),
            });
        }
        if self.datetime_sample_size == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "datetime_sample_size must be > 0".to_string(),
            });
        }
        if !(0.0..1.0).contains(&self.datetime_match_threshold) {
            return Err(ValidationError::InvalidConfig {
                reason: format!(
                    "datetime_match_threshold must be in [0, 1), got {}",
                    self.datetime_match_threshold
                ),
            });
        }
        Ok(())
    }
}
