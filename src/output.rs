//! Output assembly.
//!
//! Survivors are collected into one collection sharing the input CRS. Their
//! attribute rows are copied verbatim; only geometry may differ from the
//! input. No geometric validation happens here.

use geo::{Geometry, MultiPolygon};
use serde::{Deserialize, Serialize};

use crate::difference::DifferenceOutcome;
use crate::feature::FeatureKey;
use crate::layer::{FeatureInput, LayerId, LayerInput};
use crate::store::FeatureStore;
use crate::value::Value;

/// Counts describing what resolution did to the input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub input_features: usize,
    pub untouched: usize,
    pub trimmed: usize,
    pub dropped: usize,
    /// Keys of dropped features, in store order.
    pub dropped_keys: Vec<FeatureKey>,
}

/// A surviving, possibly trimmed, feature.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFeature {
    pub key: FeatureKey,
    pub geometry: MultiPolygon<f64>,
    pub attributes: Vec<Value>,
    pub trimmed: bool,
}

/// Schema of a source layer, kept so output can be regrouped per layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSchema {
    pub id: LayerId,
    pub fields: Vec<String>,
}

/// The non-overlapping result of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputCollection {
    pub crs: String,
    /// Source layer schemas, in input order.
    pub schemas: Vec<LayerSchema>,
    /// Surviving features, in input order.
    pub features: Vec<OutputFeature>,
    pub report: ResolutionReport,
}

impl OutputCollection {
    /// Builds the collection from the differencing outcome.
    #[must_use]
    pub fn assemble(store: &FeatureStore, outcome: DifferenceOutcome) -> Self {
        let features: Vec<OutputFeature> = outcome
            .survivors
            .into_iter()
            .map(|s| {
                let source = store.feature(s.feature);
                OutputFeature {
                    key: source.key.clone(),
                    geometry: s.geometry,
                    attributes: source.attributes.clone(),
                    trimmed: s.trimmed,
                }
            })
            .collect();

        let trimmed = features.iter().filter(|f| f.trimmed).count();
        let report = ResolutionReport {
            input_features: store.len(),
            untouched: features.len() - trimmed,
            trimmed,
            dropped: outcome.dropped.len(),
            dropped_keys: outcome.dropped,
        };

        Self {
            crs: store.crs().to_string(),
            schemas: store
                .layers()
                .iter()
                .map(|l| LayerSchema {
                    id: l.id.clone(),
                    fields: l.fields.clone(),
                })
                .collect(),
            features,
            report,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &FeatureKey) -> Option<&OutputFeature> {
        self.features.iter().find(|f| &f.key == key)
    }

    /// Regroups the output into one polygon layer per source layer.
    ///
    /// Every source layer is returned, even one left without features, with
    /// its original id, schema and the shared CRS.
    #[must_use]
    pub fn into_layers(self) -> Vec<LayerInput> {
        let mut layers: Vec<LayerInput> = self
            .schemas
            .into_iter()
            .map(|s| LayerInput::new(s.id, self.crs.clone()).fields(s.fields))
            .collect();

        for f in self.features {
            if let Some(layer) = layers.iter_mut().find(|l| l.id == f.key.layer) {
                layer
                    .features
                    .push(FeatureInput::new(f.key.local, Geometry::MultiPolygon(f.geometry), f.attributes));
            }
        }
        layers
    }
}

#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;
    use crate::difference::Survivor;
    use crate::feature::FeatureRef;

    fn store() -> FeatureStore {
        let tri = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 0.0, y: 1.0)];
        FeatureStore::ingest(vec![
            LayerInput::new("a", "EPSG:2193")
                .fields(["name"])
                .feature(FeatureInput::new(7, tri.clone(), vec![Value::from("kept")]))
                .feature(FeatureInput::new(8, tri.clone(), vec![Value::from("gone")])),
            LayerInput::new("b", "EPSG:2193")
                .fields(["code", "area"])
                .feature(FeatureInput::new(1, tri, vec![Value::from(3), Value::from(0.5)])),
        ])
        .unwrap()
    }

    fn outcome(store: &FeatureStore) -> DifferenceOutcome {
        DifferenceOutcome {
            survivors: vec![Survivor {
                feature: FeatureRef(0),
                geometry: store.features()[0].geometry.clone(),
                trimmed: true,
            }],
            dropped: vec![FeatureKey::new("a", 8), FeatureKey::new("b", 1)],
        }
    }

    #[test]
    fn assemble_copies_attributes_and_counts() {
        let store = store();
        let out = OutputCollection::assemble(&store, outcome(&store));

        assert_eq!(out.crs, "EPSG:2193");
        assert_eq!(out.len(), 1);
        let kept = out.get(&FeatureKey::new("a", 7)).unwrap();
        assert_eq!(kept.attributes, vec![Value::from("kept")]);
        assert_eq!(
            out.report,
            ResolutionReport {
                input_features: 3,
                untouched: 0,
                trimmed: 1,
                dropped: 2,
                dropped_keys: vec![FeatureKey::new("a", 8), FeatureKey::new("b", 1)],
            }
        );
    }

    #[test]
    fn into_layers_keeps_every_source_layer() {
        let store = store();
        let layers = OutputCollection::assemble(&store, outcome(&store)).into_layers();

        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].id.as_str(), "a");
        assert_eq!(layers[0].features.len(), 1);
        assert_eq!(layers[0].features[0].id, 7);
        assert_eq!(layers[1].fields, vec!["code".to_string(), "area".to_string()]);
        assert!(layers[1].features.is_empty());
        assert!(layers.iter().all(|l| l.crs == "EPSG:2193"));
    }
}
