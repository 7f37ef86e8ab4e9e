//! Authority ranking over layers.

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::store::FeatureStore;
use crate::temporal::MIN_TIMESTAMP;

use super::policies::ResolutionPolicy;

/// Total order over the layers of a run, highest authority first.
///
/// Ties keep input layer order, so the ranking is a total order even when
/// two layers share a timestamp or rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityRanking {
    /// Layer indices, highest authority first.
    order: Vec<usize>,
    /// Position of each layer index in `order`.
    position: Vec<usize>,
}

impl AuthorityRanking {
    /// Ranks the store's layers under `policy`.
    ///
    /// Layer metadata (`temporal_key`, `priority_rank`) must already be set.
    #[must_use]
    pub fn for_policy(policy: &ResolutionPolicy, store: &FeatureStore) -> Self {
        let ranking = match policy {
            ResolutionPolicy::Temporal { .. } => Self::temporal(store),
            ResolutionPolicy::Priority { .. } => Self::priority(store),
        };
        let order: Vec<&str> = ranking.order.iter().map(|&i| store.layers()[i].id.as_str()).collect();
        debug!(policy = policy.name(), ?order, "authority ranking");
        ranking
    }

    /// Newest layer first, by each layer's maximum feature timestamp.
    ///
    /// A layer without a temporal key ranks as if every feature carried the
    /// minimum timestamp.
    #[must_use]
    pub fn temporal(store: &FeatureStore) -> Self {
        let newest: Vec<NaiveDateTime> = (0..store.layers().len())
            .map(|i| layer_max_timestamp(store, i))
            .collect();

        let mut order: Vec<usize> = (0..newest.len()).collect();
        order.sort_by(|&a, &b| newest[b].cmp(&newest[a]));
        Self::from_order(order)
    }

    /// Lowest explicit rank first; unranked layers last.
    #[must_use]
    pub fn priority(store: &FeatureStore) -> Self {
        let layers = store.layers();
        let mut order: Vec<usize> = (0..layers.len()).collect();
        order.sort_by_key(|&i| match layers[i].priority_rank {
            Some(rank) => (false, rank),
            None => (true, 0),
        });
        Self::from_order(order)
    }

    fn from_order(order: Vec<usize>) -> Self {
        let mut position = vec![0; order.len()];
        for (pos, &layer) in order.iter().enumerate() {
            position[layer] = pos;
        }
        Self { order, position }
    }

    /// Layer indices from highest to lowest authority.
    #[must_use]
    pub fn highest_first(&self) -> &[usize] {
        &self.order
    }

    /// Layer indices from lowest to highest authority.
    pub fn lowest_first(&self) -> impl Iterator<Item = usize> + '_ {
        self.order.iter().rev().copied()
    }

    /// Position of a layer in the ranking; 0 is the most authoritative.
    #[must_use]
    pub fn position(&self, layer_index: usize) -> usize {
        self.position.get(layer_index).copied().unwrap_or(usize::MAX)
    }

    /// True if layer `a` ranks strictly above layer `b`.
    #[must_use]
    pub fn is_strictly_higher(&self, a: usize, b: usize) -> bool {
        self.position(a) < self.position(b)
    }
}

/// Newest timestamp among a layer's features, or the minimum if it has none.
#[must_use]
pub fn layer_max_timestamp(store: &FeatureStore, layer_index: usize) -> NaiveDateTime {
    let Some(key) = store.layers().get(layer_index).and_then(|l| l.temporal_key.as_ref()) else {
        return MIN_TIMESTAMP;
    };
    store
        .layer_features(layer_index)
        .iter()
        .map(|f| key.timestamp(&f.attributes))
        .max()
        .unwrap_or(MIN_TIMESTAMP)
}

/// Warns about layers that cannot take part in temporal ranking.
pub(crate) fn warn_missing_temporal_keys(store: &FeatureStore) {
    let missing: Vec<&str> = store
        .layers()
        .iter()
        .filter(|l| l.temporal_key.is_none())
        .map(|l| l.id.as_str())
        .collect();
    if missing.len() == store.layers().len() {
        warn!("no layer has a detectable timestamp field; temporal ranking falls back to input order");
    } else {
        for layer in missing {
            warn!(layer, "no timestamp field detected; layer ranks lowest");
        }
    }
}
