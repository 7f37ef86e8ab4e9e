//! In-memory feature store for a single run.
//!
//! Features of all layers live in one vector in ingestion order (layer by
//! layer, features in iteration order). Each layer owns a contiguous range, so
//! per-layer iteration and `FeatureRef` lookups are both slice accesses.

use std::collections::HashMap;
use std::ops::Range;

use crate::error::{ExecutionError, ResolverResult};
use crate::feature::{Feature, FeatureKey, FeatureRef};
use crate::geometry;
use crate::layer::{Layer, LayerInput};

/// Features and layer metadata of one run.
#[derive(Debug, Clone)]
pub struct FeatureStore {
    crs: String,
    layers: Vec<Layer>,
    ranges: Vec<Range<usize>>,
    features: Vec<Feature>,
    by_key: HashMap<FeatureKey, FeatureRef>,
}

impl FeatureStore {
    /// Ingests validated layers.
    ///
    /// Geometries are normalized to multipolygons and their areas cached.
    ///
    /// # Errors
    /// `ExecutionError::UnexpectedGeometry` if a feature geometry is not polygonal.
    pub fn ingest(inputs: Vec<LayerInput>) -> ResolverResult<Self> {
        let crs = inputs.first().map(|l| l.crs.clone()).unwrap_or_default();
        let capacity = inputs.iter().map(|l| l.features.len()).sum();

        let mut store = Self {
            crs,
            layers: Vec::with_capacity(inputs.len()),
            ranges: Vec::with_capacity(inputs.len()),
            features: Vec::with_capacity(capacity),
            by_key: HashMap::with_capacity(capacity),
        };

        for (layer_index, input) in inputs.into_iter().enumerate() {
            let start = store.features.len();
            for f in input.features {
                let geometry =
                    geometry::to_multipolygon(&f.geometry).map_err(|kind| ExecutionError::UnexpectedGeometry {
                        layer: input.id.clone(),
                        feature: f.id,
                        kind,
                    })?;
                let key = FeatureKey::new(input.id.clone(), f.id);
                store.by_key.insert(key.clone(), FeatureRef(store.features.len()));
                store.features.push(Feature {
                    key,
                    layer_index,
                    area: geometry::area(&geometry),
                    geometry,
                    attributes: f.attributes,
                });
            }
            store.ranges.push(start..store.features.len());
            store.layers.push(Layer {
                id: input.id,
                crs: input.crs,
                fields: input.fields,
                temporal_key: None,
                priority_rank: None,
            });
        }

        Ok(store)
    }

    /// The coordinate reference identifier shared by every layer.
    #[must_use]
    pub fn crs(&self) -> &str {
        &self.crs
    }

    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    /// All features in store order.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Features of the layer at `layer_index`, in ingestion order.
    #[must_use]
    pub fn layer_features(&self, layer_index: usize) -> &[Feature] {
        match self.ranges.get(layer_index) {
            Some(r) => &self.features[r.clone()],
            None => &[],
        }
    }

    /// References to the features of the layer at `layer_index`.
    pub fn layer_refs(&self, layer_index: usize) -> impl Iterator<Item = FeatureRef> {
        self.ranges.get(layer_index).cloned().unwrap_or(0..0).map(FeatureRef)
    }

    #[must_use]
    pub fn feature(&self, r: FeatureRef) -> &Feature {
        &self.features[r.0]
    }

    #[must_use]
    pub fn lookup(&self, key: &FeatureKey) -> Option<FeatureRef> {
        self.by_key.get(key).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
