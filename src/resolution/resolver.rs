use chrono::NaiveDateTime;
use geo::MultiPolygon;
use tracing::info;

use crate::config::{OverlapScope, ResolverConfig};
use crate::error::ResolverResult;
use crate::feature::FeatureRef;
use crate::overlap::{OverlapGraph, OverlapRecord};
use crate::progress::{RunContext, Stage};
use crate::store::FeatureStore;
use crate::temporal::MIN_TIMESTAMP;

use super::authority::AuthorityRanking;
use super::policies::{ResolutionPolicy, TemporalMode};

/// Regions a single feature cedes to higher-authority features.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemovalSet {
    /// Intersection regions, in the order they were ceded.
    pub regions: Vec<MultiPolygon<f64>>,
    /// The feature loses everything, regardless of `regions`.
    pub whole: bool,
}

impl RemovalSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.whole && self.regions.is_empty()
    }
}

/// Removal sets for every feature of a store, in store order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreasToRemove {
    sets: Vec<RemovalSet>,
}

impl AreasToRemove {
    fn with_len(len: usize) -> Self {
        Self {
            sets: vec![RemovalSet::default(); len],
        }
    }

    #[must_use]
    pub fn get(&self, feature: FeatureRef) -> Option<&RemovalSet> {
        self.sets.get(feature.index())
    }

    /// Number of features that cede something.
    #[must_use]
    pub fn affected(&self) -> usize {
        self.sets.iter().filter(|s| !s.is_empty()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.affected() == 0
    }
}

/// Turns an overlap graph into per-feature removal sets under one policy.
#[derive(Debug)]
pub struct ConflictResolver<'a> {
    store: &'a FeatureStore,
    graph: &'a OverlapGraph,
    policy: &'a ResolutionPolicy,
    scope: OverlapScope,
    ranking: AuthorityRanking,
}

impl<'a> ConflictResolver<'a> {
    #[must_use]
    pub fn new(
        store: &'a FeatureStore,
        graph: &'a OverlapGraph,
        policy: &'a ResolutionPolicy,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            store,
            graph,
            policy,
            scope: config.overlap_scope,
            ranking: AuthorityRanking::for_policy(policy, store),
        }
    }

    #[must_use]
    pub fn ranking(&self) -> &AuthorityRanking {
        &self.ranking
    }

    /// Walks layers from lowest authority upward and collects what each
    /// feature cedes.
    ///
    /// # Errors
    /// `ExecutionError::Cancelled` if the context is cancelled between features.
    pub fn resolve(&self, ctx: &RunContext) -> ResolverResult<AreasToRemove> {
        let tracker = ctx.tracker(Stage::Resolving, self.store.len());
        let mut removals = AreasToRemove::with_len(self.store.len());
        let timestamps = match self.policy {
            ResolutionPolicy::Temporal {
                mode: TemporalMode::WholeFeatureDrop,
            } => Some(self.feature_timestamps()),
            _ => None,
        };

        for layer in self.ranking.lowest_first() {
            for feature in self.store.layer_refs(layer) {
                tracker.checkpoint()?;
                let set = &mut removals.sets[feature.index()];
                let overlaps = self.graph.overlaps_of(feature);
                match &timestamps {
                    Some(ts) => self.mark_if_superseded(ts, feature, overlaps, set),
                    None => self.cede_regions(layer, overlaps, set),
                }
                tracker.advance()?;
            }
        }

        info!(
            policy = self.policy.name(),
            affected = removals.affected(),
            "conflict resolution complete"
        );
        Ok(removals)
    }

    fn counts(&self, record: &OverlapRecord) -> bool {
        record.is_subdivision || self.scope == OverlapScope::AllOverlaps
    }

    fn cede_regions(&self, layer: usize, overlaps: &[OverlapRecord], set: &mut RemovalSet) {
        for record in overlaps {
            let partner_layer = self.store.feature(record.other_ref).layer_index;
            if self.counts(record) && self.ranking.is_strictly_higher(partner_layer, layer) {
                set.regions.push(record.intersection.clone());
            }
        }
    }

    // Direct timestamp comparison: partners of any layer count, including
    // the feature's own.
    fn mark_if_superseded(
        &self,
        timestamps: &[NaiveDateTime],
        feature: FeatureRef,
        overlaps: &[OverlapRecord],
        set: &mut RemovalSet,
    ) {
        let own = timestamps[feature.index()];
        set.whole = overlaps
            .iter()
            .any(|r| self.counts(r) && timestamps[r.other_ref.index()] > own);
    }

    fn feature_timestamps(&self) -> Vec<NaiveDateTime> {
        let layers = self.store.layers();
        self.store
            .features()
            .iter()
            .map(|f| match &layers[f.layer_index].temporal_key {
                Some(key) => key.timestamp(&f.attributes),
                None => MIN_TIMESTAMP,
            })
            .collect()
    }
}
