//! Geometry differencing.
//!
//! Each feature's removal set is subtracted from its geometry, region by
//! region. Features that end up empty are dropped; attributes play no part in
//! that decision.

use geo::MultiPolygon;
use tracing::{debug, info};

use crate::error::ResolverResult;
use crate::feature::{FeatureKey, FeatureRef};
use crate::geometry;
use crate::progress::{RunContext, Stage};
use crate::resolution::AreasToRemove;
use crate::store::FeatureStore;

/// A feature that kept some area.
#[derive(Debug, Clone, PartialEq)]
pub struct Survivor {
    pub feature: FeatureRef,
    pub geometry: MultiPolygon<f64>,
    /// True if at least one region was subtracted.
    pub trimmed: bool,
}

/// Result of the differencing stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DifferenceOutcome {
    /// Surviving features, in store order.
    pub survivors: Vec<Survivor>,
    pub dropped: Vec<FeatureKey>,
}

/// Applies removal sets to every feature of the store.
///
/// # Errors
/// `ExecutionError::Cancelled` if the context is cancelled between features.
pub fn apply_removals(
    store: &FeatureStore,
    removals: &AreasToRemove,
    ctx: &RunContext,
) -> ResolverResult<DifferenceOutcome> {
    let tracker = ctx.tracker(Stage::Differencing, store.len());
    let mut outcome = DifferenceOutcome::default();

    for (i, feature) in store.features().iter().enumerate() {
        tracker.checkpoint()?;
        let r = FeatureRef(i);

        match removals.get(r) {
            Some(set) if set.whole => {
                debug!(feature = %feature.key, "dropped by newer subdivision");
                outcome.dropped.push(feature.key.clone());
            }
            Some(set) if !set.regions.is_empty() => {
                let remaining = subtract_all(&feature.geometry, &set.regions);
                if geometry::is_empty(&remaining) {
                    debug!(feature = %feature.key, "nothing left after differencing");
                    outcome.dropped.push(feature.key.clone());
                } else {
                    outcome.survivors.push(Survivor {
                        feature: r,
                        geometry: remaining,
                        trimmed: true,
                    });
                }
            }
            _ => outcome.survivors.push(Survivor {
                feature: r,
                geometry: feature.geometry.clone(),
                trimmed: false,
            }),
        }
        tracker.advance()?;
    }

    info!(
        survivors = outcome.survivors.len(),
        dropped = outcome.dropped.len(),
        "differencing complete"
    );
    Ok(outcome)
}

/// Subtracts `regions` from `geometry` one at a time.
#[must_use]
pub fn subtract_all(geometry: &MultiPolygon<f64>, regions: &[MultiPolygon<f64>]) -> MultiPolygon<f64> {
    let mut remaining = geometry.clone();
    for region in regions {
        if geometry::is_empty(&remaining) {
            break;
        }
        remaining = geometry::difference(&remaining, region);
    }
    remaining
}

#[cfg(test)]
mod tests {
    use geo::{polygon, Area};

    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
        ]])
    }

    #[test]
    fn regions_are_subtracted_cumulatively() {
        let out = subtract_all(&square(0.0, 0.0, 10.0), &[square(0.0, 0.0, 5.0), square(5.0, 5.0, 5.0)]);
        assert!((out.unsigned_area() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn covering_regions_leave_nothing() {
        let out = subtract_all(&square(1.0, 1.0, 2.0), &[square(0.0, 0.0, 10.0), square(0.0, 0.0, 1.0)]);
        assert!(geometry::is_empty(&out));
    }

    #[test]
    fn no_regions_is_identity() {
        let g = square(0.0, 0.0, 3.0);
        assert_eq!(subtract_all(&g, &[]), g);
    }
}
