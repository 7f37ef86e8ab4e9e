//! # overlap-resolver
//!
//! Resolves spatial overlaps among polygon layers into one non-overlapping
//! feature collection.
//!
//! Layers that legitimately overlap, such as successive surveys or boundary
//! sets of differing authority, are ranked by a [`ResolutionPolicy`]. Every
//! overlap is detected, the less authoritative feature cedes the contested
//! region, and the surviving geometries are returned with their attributes
//! unchanged.
//!
//! ## Pipeline
//!
//! - **Feature store**: validated layers, geometries normalized to multipolygons
//! - **Datetime detection**: per-layer timestamp field and format (temporal policy only)
//! - **Spatial index**: one R-tree per layer for candidate pruning
//! - **Overlap detection**: exact intersections, directional subdivision flags
//! - **Conflict resolution**: authority ranking and per-feature removal sets
//! - **Differencing and assembly**: trimmed survivors in one output collection
//!
//! ## Usage
//!
//! ```rust
//! use geo::polygon;
//! use overlap_resolver::{run, FeatureInput, LayerInput, ResolutionPolicy, ResolverConfig, RunContext, Value};
//!
//! let layers = vec![
//!     LayerInput::new("cadastre_1998", "EPSG:2193").fields(["survey_date"]).feature(FeatureInput::new(
//!         1,
//!         polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
//!         vec![Value::from("1998-02-11")],
//!     )),
//!     LayerInput::new("cadastre_2021", "EPSG:2193").fields(["survey_date"]).feature(FeatureInput::new(
//!         1,
//!         polygon![(x: 1.0, y: 1.0), (x: 3.0, y: 1.0), (x: 3.0, y: 3.0), (x: 1.0, y: 3.0)],
//!         vec![Value::from("2021-07-30")],
//!     )),
//! ];
//!
//! let status = run(ResolverConfig::default(), ResolutionPolicy::temporal(), layers, &RunContext::default());
//! let output = status.into_output().unwrap();
//! assert_eq!(output.report.trimmed, 1);
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod difference;
pub mod engine;
pub mod error;
pub mod feature;
pub mod geometry;
pub mod layer;
pub mod output;
pub mod overlap;
pub mod progress;
pub mod resolution;
pub mod spatial;
pub mod store;
pub mod temporal;
pub mod validation;
pub mod value;

pub use config::{OverlapScope, ResolverConfig};
pub use difference::{apply_removals, DifferenceOutcome, Survivor};
pub use engine::{run, ResolutionRun, RunId, RunState, RunStatus};
pub use error::{ExecutionError, ResolverError, ResolverResult, ValidationError};
pub use feature::{Feature, FeatureKey, FeatureRef};
pub use layer::{FeatureInput, GeometryKind, Layer, LayerId, LayerInput};
pub use output::{LayerSchema, OutputCollection, OutputFeature, ResolutionReport};
pub use overlap::{DetectionSummary, OverlapDetector, OverlapGraph, OverlapRecord, OverlapRegion};
pub use progress::{
    CancellationToken, ChannelProgress, NoProgress, ProgressEvent, ProgressObserver, RunContext, Stage,
};
pub use resolution::{AreasToRemove, AuthorityRanking, ConflictResolver, RemovalSet, ResolutionPolicy, TemporalMode};
pub use spatial::SpatialIndex;
pub use store::FeatureStore;
pub use temporal::{DatetimeDetector, DetectedField, TemporalKey};
pub use validation::validate_layers;
pub use value::Value;
