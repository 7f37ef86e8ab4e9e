//! Error types for the overlap resolver.
//!
//! All errors are strongly typed using thiserror. Precondition failures
//! (`ValidationError`) are reported before a run starts; failures while a run
//! executes are `ExecutionError`s. Cancellation is modelled as an execution
//! error so it can travel through `?`, but callers see it as `RunStatus::Aborted`.

use thiserror::Error;

use crate::layer::{GeometryKind, LayerId};
use crate::progress::Stage;

/// Precondition violations detected before the pipeline starts.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("At least one input layer is required")]
    NoLayers,

    #[error("Layer identifier cannot be empty")]
    EmptyLayerId,

    #[error("Layer '{layer}' is declared as {kind}, expected polygon")]
    NotPolygonLayer {
        layer: LayerId,
        kind: GeometryKind,
    },

    #[error("Layer '{layer}' uses CRS '{actual}', expected '{expected}'")]
    CrsMismatch {
        layer: LayerId,
        expected: String,
        actual: String,
    },

    #[error("Layer '{layer}' was supplied more than once")]
    DuplicateLayer {
        layer: LayerId,
    },

    #[error("Feature {feature} appears more than once in layer '{layer}'")]
    DuplicateFeature {
        layer: LayerId,
        feature: u64,
    },

    #[error("Feature {feature} in layer '{layer}' has {actual} attributes, schema has {expected}")]
    SchemaMismatch {
        layer: LayerId,
        feature: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },

    #[error("Invalid resolution policy: {reason}")]
    InvalidPolicy {
        reason: String,
    },
}

/// Failures that occur while a run executes.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Feature {feature} in layer '{layer}' has unsupported geometry kind '{kind}'")]
    UnexpectedGeometry {
        layer: LayerId,
        feature: u64,
        kind: &'static str,
    },

    #[error("Operation requires run state {expected}, but run is {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Run cancelled during {stage}")]
    Cancelled {
        stage: Stage,
    },
}

/// Top-level error type for the overlap resolver.
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Invalid configuration JSON: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl ResolverError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if the run was cancelled by the caller.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::Cancelled { .. }))
    }
}

/// Result type alias for resolver operations.
pub type ResolverResult<T> = Result<T, ResolverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_crs_mismatch() {
        let err = ValidationError::CrsMismatch {
            layer: LayerId::new("survey_2021"),
            expected: "EPSG:2193".to_string(),
            actual: "EPSG:4326".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("survey_2021"));
        assert!(msg.contains("EPSG:2193"));
        assert!(msg.contains("EPSG:4326"));
    }

    #[test]
    fn test_validation_error_not_polygon() {
        let err = ValidationError::NotPolygonLayer {
            layer: LayerId::new("roads"),
            kind: GeometryKind::LineString,
        };
        let msg = format!("{err}");
        assert!(msg.contains("roads"));
        assert!(msg.contains("line_string"));
    }

    #[test]
    fn test_execution_error_unexpected_geometry() {
        let err = ExecutionError::UnexpectedGeometry {
            layer: LayerId::new("parcels"),
            feature: 7,
            kind: "point",
        };
        let msg = format!("{err}");
        assert!(msg.contains("parcels"));
        assert!(msg.contains('7'));
        assert!(msg.contains("point"));
    }

    #[test]
    fn test_resolver_error_from_validation() {
        let err: ResolverError = ValidationError::NoLayers.into();
        assert!(err.is_validation());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_resolver_error_cancelled() {
        let err: ResolverError = ExecutionError::Cancelled {
            stage: Stage::Detecting,
        }
        .into();
        assert!(err.is_execution());
        assert!(err.is_cancelled());
        assert!(format!("{err}").contains("detecting"));
    }

    #[test]
    fn test_resolver_error_internal() {
        let err = ResolverError::internal("unexpected state");
        assert!(!err.is_validation());
        assert!(format!("{err}").contains("unexpected state"));
    }
}
