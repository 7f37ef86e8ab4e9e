//! Pairwise overlap detection.
//!
//! Every feature is visited as an owner. Its candidates come from the spatial
//! index; each candidate is confirmed with an exact predicate and the
//! intersection is measured. Records are computed per direction, never
//! mirrored, so `is_subdivision` is always relative to the record's own
//! `other` feature.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::ResolverConfig;
use crate::error::ResolverResult;
use crate::feature::FeatureRef;
use crate::geometry;
use crate::progress::{RunContext, Stage, StageTracker};
use crate::spatial::SpatialIndex;
use crate::store::FeatureStore;

use super::graph::{OverlapGraph, OverlapRecord};

/// Builds the overlap graph of a store.
#[derive(Debug, Clone, Copy)]
pub struct OverlapDetector<'a> {
    store: &'a FeatureStore,
    index: &'a SpatialIndex,
    config: &'a ResolverConfig,
}

impl<'a> OverlapDetector<'a> {
    #[must_use]
    pub fn new(store: &'a FeatureStore, index: &'a SpatialIndex, config: &'a ResolverConfig) -> Self {
        Self { store, index, config }
    }

    /// Detects all overlaps.
    ///
    /// Sequential and parallel detection produce the same graph: results are
    /// collected per owner in store order regardless of completion order.
    ///
    /// # Errors
    /// `ExecutionError::Cancelled` if the context is cancelled between features.
    pub fn detect(&self, ctx: &RunContext) -> ResolverResult<OverlapGraph> {
        let total = self.store.len();
        let tracker = ctx.tracker(Stage::Detecting, total);

        let by_owner: Vec<Vec<OverlapRecord>> = if self.config.parallel_detection {
            (0..total)
                .into_par_iter()
                .map(|i| self.visit(FeatureRef(i), &tracker))
                .collect::<ResolverResult<_>>()?
        } else {
            (0..total)
                .map(|i| self.visit(FeatureRef(i), &tracker))
                .collect::<ResolverResult<_>>()?
        };

        let graph = OverlapGraph::from_records(by_owner);
        info!(
            features = total,
            records = graph.record_count(),
            parallel = self.config.parallel_detection,
            "overlap detection complete"
        );
        Ok(graph)
    }

    fn visit(&self, owner: FeatureRef, tracker: &StageTracker<'_>) -> ResolverResult<Vec<OverlapRecord>> {
        tracker.checkpoint()?;
        let records = self.detect_feature(owner);
        tracker.advance()?;
        Ok(records)
    }

    /// Overlap records owned by a single feature, in candidate (store) order.
    #[must_use]
    pub fn detect_feature(&self, owner: FeatureRef) -> Vec<OverlapRecord> {
        let f1 = self.store.feature(owner);
        let mut records = Vec::new();

        for other in self.index.candidates(owner) {
            let f2 = self.store.feature(other);
            if !geometry::intersects(&f1.geometry, &f2.geometry) {
                continue;
            }

            let intersection = geometry::intersection(&f1.geometry, &f2.geometry);
            let area = geometry::area(&intersection);
            if area <= 0.0 || area < self.config.min_overlap_area {
                debug!(owner = %f1.key, other = %f2.key, area, "discarding negligible overlap");
                continue;
            }

            records.push(OverlapRecord {
                owner: f1.key.clone(),
                other: f2.key.clone(),
                owner_ref: owner,
                other_ref: other,
                intersection,
                intersection_area: area,
                other_area: f2.area,
                is_subdivision: area > self.config.subdivision_ratio * f2.area,
            });
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;
    use crate::error::{ExecutionError, ResolverError};
    use crate::feature::FeatureKey;
    use crate::layer::{FeatureInput, LayerInput};

    fn square(x0: f64, y0: f64, size: f64) -> geo::Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
        ]
    }

    fn store() -> FeatureStore {
        FeatureStore::ingest(vec![
            LayerInput::new("old", "X")
                .feature(FeatureInput::new(1, square(0.0, 0.0, 10.0), vec![]))
                .feature(FeatureInput::new(2, square(50.0, 50.0, 1.0), vec![])),
            LayerInput::new("new", "X")
                .feature(FeatureInput::new(1, square(2.0, 2.0, 2.0), vec![]))
                .feature(FeatureInput::new(2, square(9.0, 0.0, 4.0), vec![]))
                // Shares only an edge with old_1.
                .feature(FeatureInput::new(3, square(10.0, 5.0, 1.0), vec![]))
                .feature(FeatureInput::new(4, square(13.0, 0.0, 1.0), vec![])),
        ])
        .unwrap()
    }

    fn detect(store: &FeatureStore, config: &ResolverConfig) -> OverlapGraph {
        let index = SpatialIndex::build(store);
        OverlapDetector::new(store, &index, config)
            .detect(&RunContext::default())
            .unwrap()
    }

    fn record<'g>(graph: &'g OverlapGraph, owner: &str, other: &str) -> Option<&'g OverlapRecord> {
        graph
            .iter()
            .find(|r| r.owner.to_string() == owner && r.other.to_string() == other)
    }

    #[test]
    fn records_are_registered_in_both_directions() {
        let store = store();
        let graph = detect(&store, &ResolverConfig::default());

        assert_eq!(graph.record_count(), 4);
        assert!(record(&graph, "old_1", "new_1").is_some());
        assert!(record(&graph, "new_1", "old_1").is_some());
        assert!(record(&graph, "old_1", "new_2").is_some());
        assert!(record(&graph, "new_2", "old_1").is_some());
        assert!(record(&graph, "old_1", "new_3").is_none());
    }

    #[test]
    fn subdivision_flag_depends_on_direction() {
        let store = store();
        let graph = detect(&store, &ResolverConfig::default());

        let outer = record(&graph, "old_1", "new_1").unwrap();
        assert!(outer.is_subdivision);
        assert!((outer.intersection_area - 4.0).abs() < 1e-9);
        assert!((outer.other_area - 4.0).abs() < 1e-9);

        let inner = record(&graph, "new_1", "old_1").unwrap();
        assert!(!inner.is_subdivision);
        assert!((inner.other_area - 100.0).abs() < 1e-9);

        let partial = record(&graph, "old_1", "new_2").unwrap();
        assert!(!partial.is_subdivision);
        assert!((partial.intersection_area - 4.0).abs() < 1e-9);
    }

    #[test]
    fn sequential_and_parallel_detection_agree() {
        let store = store();
        let parallel = detect(&store, &ResolverConfig::default());
        let sequential = detect(
            &store,
            &ResolverConfig {
                parallel_detection: false,
                ..ResolverConfig::default()
            },
        );

        let a: Vec<_> = parallel.iter().collect();
        let b: Vec<_> = sequential.iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn overlaps_below_minimum_area_are_discarded() {
        let store = store();
        let graph = detect(
            &store,
            &ResolverConfig {
                min_overlap_area: 5.0,
                ..ResolverConfig::default()
            },
        );
        assert!(graph.is_empty());
    }

    #[test]
    fn graph_exposes_regions_and_summary() {
        let store = store();
        let graph = detect(&store, &ResolverConfig::default());

        let owner = store.lookup(&FeatureKey::new("old", 1)).unwrap();
        assert_eq!(graph.overlaps_of(owner).len(), 2);

        let regions = graph.overlap_regions();
        assert_eq!(regions.len(), 2);
        assert!(regions.iter().all(|r| r.first.layer.as_str() == "old"));

        let summary = graph.summarize(&store);
        assert_eq!(summary.records, 4);
        assert_eq!(summary.pairs, 2);
        assert_eq!(summary.subdivision_records, 1);
        assert!((summary.total_overlap_area - 8.0).abs() < 1e-9);
        assert_eq!(summary.by_layer_pair.get("old/new"), Some(&2));
    }

    #[test]
    fn cancelled_context_stops_detection() {
        let store = store();
        let index = SpatialIndex::build(&store);
        let config = ResolverConfig::default();
        let ctx = RunContext::default();
        ctx.token().cancel();

        let err = OverlapDetector::new(&store, &index, &config).detect(&ctx).unwrap_err();
        assert!(matches!(
            err,
            ResolverError::Execution(ExecutionError::Cancelled { stage: Stage::Detecting })
        ));
    }
}
