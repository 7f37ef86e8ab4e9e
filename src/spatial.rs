//! Per-layer bounding-box index and candidate search.
//!
//! One R-tree is bulk-loaded per layer at the start of a run. A candidate
//! search queries every layer's tree (including the feature's own layer) with
//! the feature's envelope, drops the feature itself and re-checks envelopes
//! exactly before any exact geometry predicate runs.

use geo::Rect;
use rstar::{RTree, RTreeObject, AABB};

use crate::feature::FeatureRef;
use crate::geometry;
use crate::store::FeatureStore;

/// Envelope entry stored in a layer tree.
#[derive(Debug, Clone, Copy)]
struct IndexedEnvelope {
    aabb: AABB<[f64; 2]>,
    feature: FeatureRef,
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

fn to_aabb(rect: &Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

/// Bounding-box indices for every layer of a store.
#[derive(Debug)]
pub struct SpatialIndex {
    trees: Vec<RTree<IndexedEnvelope>>,
    /// Envelope per feature, in store order. `None` for empty geometries.
    envelopes: Vec<Option<Rect<f64>>>,
}

impl SpatialIndex {
    /// Builds one tree per layer. Features with empty geometry are not indexed.
    #[must_use]
    pub fn build(store: &FeatureStore) -> Self {
        let envelopes: Vec<Option<Rect<f64>>> = store
            .features()
            .iter()
            .map(|f| geometry::envelope(&f.geometry))
            .collect();

        let trees = (0..store.layers().len())
            .map(|layer_index| {
                let entries: Vec<IndexedEnvelope> = store
                    .layer_refs(layer_index)
                    .filter_map(|r| {
                        envelopes[r.index()].as_ref().map(|rect| IndexedEnvelope {
                            aabb: to_aabb(rect),
                            feature: r,
                        })
                    })
                    .collect();
                RTree::bulk_load(entries)
            })
            .collect();

        Self { trees, envelopes }
    }

    /// Envelope of a feature, if it has any extent.
    #[must_use]
    pub fn envelope(&self, feature: FeatureRef) -> Option<&Rect<f64>> {
        self.envelopes.get(feature.index()).and_then(Option::as_ref)
    }

    /// Number of indexed features across all layers.
    #[must_use]
    pub fn indexed_len(&self) -> usize {
        self.trees.iter().map(RTree::size).sum()
    }

    /// Features whose envelopes intersect `feature`'s envelope, excluding itself.
    ///
    /// Results are sorted in store order.
    #[must_use]
    pub fn candidates(&self, feature: FeatureRef) -> Vec<FeatureRef> {
        let Some(rect) = self.envelope(feature) else {
            return Vec::new();
        };
        let query = to_aabb(rect);

        let mut out: Vec<FeatureRef> = self
            .trees
            .iter()
            .flat_map(|tree| tree.locate_in_envelope_intersecting(&query))
            .map(|entry| entry.feature)
            .filter(|&other| other != feature)
            .filter(|&other| {
                self.envelope(other)
                    .is_some_and(|o| geometry::envelopes_intersect(rect, o))
            })
            .collect();
        out.sort_unstable();
        out
    }
}
