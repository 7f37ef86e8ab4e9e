//! Layer identity, schema and caller-supplied input collections.
//!
//! A layer is a named collection of polygon features sharing a coordinate
//! reference identifier and an ordered field schema. Callers hand layers to the
//! resolver as `LayerInput`s; after validation they become `Layer` metadata in
//! the feature store.

use std::fmt;

use geo::Geometry;
use serde::{Deserialize, Serialize};

use crate::temporal::TemporalKey;
use crate::value::Value;

/// Stable, caller-supplied layer identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    /// Creates a layer ID from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for LayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Declared geometry type of a layer.
///
/// Only `Polygon` layers (which may hold polygons and multipolygons) can take
/// part in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    Mixed,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point => write!(f, "point"),
            Self::LineString => write!(f, "line_string"),
            Self::Polygon => write!(f, "polygon"),
            Self::Mixed => write!(f, "mixed"),
        }
    }
}

/// One feature as delivered by the caller: local id, geometry and attribute row.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInput {
    /// Identifier unique within its layer.
    pub id: u64,
    /// Feature geometry. Must be polygonal.
    pub geometry: Geometry<f64>,
    /// Attribute values, positionally aligned with the layer's field schema.
    pub attributes: Vec<Value>,
}

impl FeatureInput {
    /// Creates a feature input.
    pub fn new(id: u64, geometry: impl Into<Geometry<f64>>, attributes: Vec<Value>) -> Self {
        Self {
            id,
            geometry: geometry.into(),
            attributes,
        }
    }
}

/// A caller-supplied layer: identity, CRS, schema and features.
///
/// # Example
/// ```
/// use geo::polygon;
/// use overlap_resolver::{FeatureInput, LayerInput, Value};
///
/// let layer = LayerInput::new("survey_2019", "EPSG:2193")
///     .fields(["parcel", "survey_date"])
///     .feature(FeatureInput::new(
///         1,
///         polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
///         vec![Value::from("A1"), Value::from("2019-03-01")],
///     ));
/// assert_eq!(layer.features.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LayerInput {
    pub id: LayerId,
    pub crs: String,
    pub geometry_kind: GeometryKind,
    pub fields: Vec<String>,
    pub features: Vec<FeatureInput>,
}

impl LayerInput {
    /// Creates an empty polygon layer.
    pub fn new(id: impl Into<LayerId>, crs: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            crs: crs.into(),
            geometry_kind: GeometryKind::Polygon,
            fields: Vec::new(),
            features: Vec::new(),
        }
    }

    /// Override the declared geometry kind.
    #[must_use]
    pub fn geometry_kind(mut self, kind: GeometryKind) -> Self {
        self.geometry_kind = kind;
        self
    }

    /// Set the ordered field schema.
    #[must_use]
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Append a single feature.
    #[must_use]
    pub fn feature(mut self, feature: FeatureInput) -> Self {
        self.features.push(feature);
        self
    }

    /// Append every feature yielded by `features`, in iteration order.
    #[must_use]
    pub fn features(mut self, features: impl IntoIterator<Item = FeatureInput>) -> Self {
        self.features.extend(features);
        self
    }
}

/// Validated layer metadata held by the feature store.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub crs: String,
    pub fields: Vec<String>,
    /// Timestamp field and format used by the temporal policy, if one was detected.
    pub temporal_key: Option<TemporalKey>,
    /// Explicit priority rank (lower is more authoritative), if the policy supplied one.
    pub priority_rank: Option<i64>,
}

impl Layer {
    /// Position of `field` in the schema.
    #[must_use]
    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }
}
