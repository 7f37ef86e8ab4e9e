//! Overlap records and the per-feature overlap graph.

use std::collections::BTreeMap;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

use crate::feature::{FeatureKey, FeatureRef};
use crate::layer::LayerId;
use crate::store::FeatureStore;

fn layer_of(store: &FeatureStore, feature: FeatureRef) -> (usize, &LayerId) {
    let index = store.feature(feature).layer_index;
    (index, &store.layers()[index].id)
}

/// One directed overlap: `owner` intersects `other`.
///
/// `is_subdivision` is relative to the *other* feature's area, so the two
/// records of a pair may disagree about it.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapRecord {
    pub owner: FeatureKey,
    pub other: FeatureKey,
    pub owner_ref: FeatureRef,
    pub other_ref: FeatureRef,
    pub intersection: MultiPolygon<f64>,
    pub intersection_area: f64,
    pub other_area: f64,
    pub is_subdivision: bool,
}

/// Overlap geometry of one unordered feature pair, for preview.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapRegion {
    pub first: FeatureKey,
    pub second: FeatureKey,
    pub geometry: MultiPolygon<f64>,
    pub area: f64,
}

/// Aggregate view of a detection pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    /// Directed records (two per intersecting pair).
    pub records: usize,
    /// Unordered intersecting pairs.
    pub pairs: usize,
    /// Directed records flagged as subdivisions.
    pub subdivision_records: usize,
    /// Sum of intersection areas over unordered pairs.
    pub total_overlap_area: f64,
    /// Unordered pair counts per (layer, layer), layer ids in input order.
    pub by_layer_pair: BTreeMap<String, usize>,
}

/// Overlap records indexed by owning feature, in store order.
#[derive(Debug, Clone, Default)]
pub struct OverlapGraph {
    by_owner: Vec<Vec<OverlapRecord>>,
}

impl OverlapGraph {
    pub(crate) fn from_records(by_owner: Vec<Vec<OverlapRecord>>) -> Self {
        Self { by_owner }
    }

    /// Overlaps owned by `feature`.
    #[must_use]
    pub fn overlaps_of(&self, feature: FeatureRef) -> &[OverlapRecord] {
        match self.by_owner.get(feature.index()) {
            Some(records) => records,
            None => &[],
        }
    }

    /// All records, grouped by owner in store order.
    pub fn iter(&self) -> impl Iterator<Item = &OverlapRecord> {
        self.by_owner.iter().flatten()
    }

    #[must_use]
    pub fn record_count(&self) -> usize {
        self.by_owner.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_owner.iter().all(Vec::is_empty)
    }

    /// One region per unordered pair, taken from the record owned by the
    /// earlier feature in store order.
    #[must_use]
    pub fn overlap_regions(&self) -> Vec<OverlapRegion> {
        self.iter()
            .filter(|r| r.owner_ref < r.other_ref)
            .map(|r| OverlapRegion {
                first: r.owner.clone(),
                second: r.other.clone(),
                geometry: r.intersection.clone(),
                area: r.intersection_area,
            })
            .collect()
    }

    /// Summarizes the graph for the confirmation step.
    #[must_use]
    pub fn summarize(&self, store: &FeatureStore) -> DetectionSummary {
        let mut summary = DetectionSummary {
            records: self.record_count(),
            subdivision_records: self.iter().filter(|r| r.is_subdivision).count(),
            ..DetectionSummary::default()
        };

        for r in self.iter().filter(|r| r.owner_ref < r.other_ref) {
            summary.pairs += 1;
            summary.total_overlap_area += r.intersection_area;

            let (a, b) = (layer_of(store, r.owner_ref), layer_of(store, r.other_ref));
            let (first, second) = if a.0 <= b.0 { (a.1, b.1) } else { (b.1, a.1) };
            *summary.by_layer_pair.entry(format!("{first}/{second}")).or_default() += 1;
        }
        summary
    }
}
