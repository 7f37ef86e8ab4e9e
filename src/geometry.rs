//! Total geometry primitives.
//!
//! Inputs are assumed to be repaired upstream, but residual self-intersections
//! can still make boolean operations misbehave. Every operation here is total:
//! a failing operation yields an empty result (or `false`) instead of unwinding
//! through the pipeline.

use std::panic::{catch_unwind, AssertUnwindSafe};

use geo::{Area, BooleanOps, BoundingRect, Geometry, Intersects, MultiPolygon, Rect};
use tracing::warn;

/// Returns an empty multipolygon.
#[must_use]
pub fn empty() -> MultiPolygon<f64> {
    MultiPolygon::new(Vec::new())
}

/// Short, stable name of a geometry variant, used in diagnostics.
#[must_use]
pub const fn kind_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "point",
        Geometry::Line(_) => "line",
        Geometry::LineString(_) => "line_string",
        Geometry::Polygon(_) => "polygon",
        Geometry::MultiPoint(_) => "multi_point",
        Geometry::MultiLineString(_) => "multi_line_string",
        Geometry::MultiPolygon(_) => "multi_polygon",
        Geometry::GeometryCollection(_) => "geometry_collection",
        Geometry::Rect(_) => "rect",
        Geometry::Triangle(_) => "triangle",
    }
}

/// Normalizes a polygonal geometry to a multipolygon.
///
/// Returns the variant name for anything that is not polygonal.
pub fn to_multipolygon(geometry: &Geometry<f64>) -> Result<MultiPolygon<f64>, &'static str> {
    match geometry {
        Geometry::Polygon(p) => Ok(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Ok(mp.clone()),
        Geometry::Rect(r) => Ok(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Ok(MultiPolygon::new(vec![t.to_polygon()])),
        other => Err(kind_name(other)),
    }
}

/// Unsigned planar area.
#[must_use]
pub fn area(geometry: &MultiPolygon<f64>) -> f64 {
    geometry.unsigned_area()
}

/// True if the geometry holds no polygons or covers no area.
#[must_use]
pub fn is_empty(geometry: &MultiPolygon<f64>) -> bool {
    geometry.0.is_empty() || area(geometry) == 0.0
}

/// Axis-aligned envelope, `None` for empty geometries.
#[must_use]
pub fn envelope(geometry: &MultiPolygon<f64>) -> Option<Rect<f64>> {
    geometry.bounding_rect()
}

/// Closed-interval envelope overlap test.
#[must_use]
pub fn envelopes_intersect(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x && b.min().x <= a.max().x && a.min().y <= b.max().y && b.min().y <= a.max().y
}

/// Exact intersection predicate. Touching boundaries count as intersecting.
#[must_use]
pub fn intersects(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        a.0.iter().any(|pa| b.0.iter().any(|pb| pa.intersects(pb)))
    }))
    .unwrap_or_else(|_| {
        warn!("intersects predicate failed on degenerate input; treating as disjoint");
        false
    })
}

/// Exact intersection; empty on failure.
#[must_use]
pub fn intersection(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    catch_unwind(AssertUnwindSafe(|| a.intersection(b))).unwrap_or_else(|_| {
        warn!("intersection failed on degenerate input; using empty geometry");
        empty()
    })
}

/// `a` minus `b`. On failure `a` is returned unchanged, so a degenerate
/// removal region never erases a feature.
#[must_use]
pub fn difference(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    catch_unwind(AssertUnwindSafe(|| a.difference(b))).unwrap_or_else(|_| {
        warn!("difference failed on degenerate input; keeping geometry unchanged");
        a.clone()
    })
}
