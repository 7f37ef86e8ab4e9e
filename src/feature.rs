//! Features and their composite identity.

use std::fmt;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

use crate::layer::LayerId;
use crate::value::Value;

/// Globally unique feature identity within a run: layer id plus local id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureKey {
    pub layer: LayerId,
    pub local: u64,
}

impl FeatureKey {
    #[must_use]
    pub fn new(layer: impl Into<LayerId>, local: u64) -> Self {
        Self {
            layer: layer.into(),
            local,
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.layer, self.local)
    }
}

/// Dense handle into the feature store; valid only within the run that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureRef(pub(crate) usize);

impl FeatureRef {
    /// Position of the feature in store order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A stored polygon feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub key: FeatureKey,
    /// Position of the owning layer in input order.
    pub layer_index: usize,
    pub geometry: MultiPolygon<f64>,
    pub attributes: Vec<Value>,
    /// Unsigned planar area, computed once at ingestion.
    pub area: f64,
}
