use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ResolverResult, ValidationError};
use crate::layer::LayerId;

/// How the temporal policy turns newer overlaps into removals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalMode {
    /// Rank layers by their newest timestamp and cede overlap regions to
    /// features of strictly newer layers.
    #[default]
    RegionAccumulation,

    /// Compare feature timestamps directly: a feature is dropped whole when
    /// any subdivision partner carries a strictly later timestamp.
    WholeFeatureDrop,
}

impl TemporalMode {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegionAccumulation => "region_accumulation",
            Self::WholeFeatureDrop => "whole_feature_drop",
        }
    }
}

/// Policy deciding which of two overlapping features keeps a contested area.
///
/// Exactly one policy governs a run. It is resolved once when the run is
/// created; nothing downstream dispatches on names.
///
/// # Example
/// ```
/// use overlap_resolver::{ResolutionPolicy, TemporalMode};
///
/// let policy: ResolutionPolicy =
///     serde_json::from_str(r#"{"type":"temporal","mode":"whole_feature_drop"}"#).unwrap();
/// assert_eq!(policy, ResolutionPolicy::Temporal { mode: TemporalMode::WholeFeatureDrop });
///
/// let policy = ResolutionPolicy::priority([("parcels", 1), ("legacy", 2)]).unwrap();
/// assert_eq!(policy.rank_of(&"legacy".into()), Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ResolutionPolicy {
    /// Authority follows detected survey timestamps; newer wins.
    Temporal {
        #[serde(default)]
        mode: TemporalMode,
    },

    /// Authority follows explicit layer ranks; lower rank wins.
    ///
    /// Layers missing from `ranks` rank below every ranked layer.
    Priority { ranks: BTreeMap<LayerId, i64> },
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self::Temporal {
            mode: TemporalMode::default(),
        }
    }
}

impl ResolutionPolicy {
    /// Temporal policy with region accumulation.
    #[must_use]
    pub fn temporal() -> Self {
        Self::default()
    }

    /// Create a validated `Priority` policy.
    ///
    /// Later entries for the same layer replace earlier ones.
    pub fn priority<I, L>(ranks: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (L, i64)>,
        L: Into<LayerId>,
    {
        let policy = Self::Priority {
            ranks: ranks.into_iter().map(|(l, r)| (l.into(), r)).collect(),
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Parse a policy from JSON and validate it.
    pub fn from_json_str(json: &str) -> ResolverResult<Self> {
        let policy: Self = serde_json::from_str(json)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Temporal { .. } => Ok(()),
            Self::Priority { ranks } if ranks.is_empty() => Err(ValidationError::InvalidPolicy {
                reason: "priority ranks cannot be empty".to_string(),
            }),
            Self::Priority { .. } => Ok(()),
        }
    }

    /// Explicit rank of a layer, if this is a `Priority` policy that ranks it.
    #[must_use]
    pub fn rank_of(&self, layer: &LayerId) -> Option<i64> {
        match self {
            Self::Priority { ranks } => ranks.get(layer).copied(),
            Self::Temporal { .. } => None,
        }
    }

    #[must_use]
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Temporal { .. })
    }

    /// Returns a short stable identifier suitable for logging/debugging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Temporal { mode } => match mode {
                TemporalMode::RegionAccumulation => "temporal",
                TemporalMode::WholeFeatureDrop => "temporal_whole_feature_drop",
            },
            Self::Priority { .. } => "priority",
        }
    }
}
