//! Overlap detection.
//!
//! Every feature is visited as the "owning" side of its overlaps, so an
//! intersecting pair produces two records, each computed from scratch.

mod detector;
mod graph;

pub use detector::OverlapDetector;
pub use graph::{DetectionSummary, OverlapGraph, OverlapRecord, OverlapRegion};
