//! Resolution run driver.
//!
//! A `ResolutionRun` owns every intermediate value of one run and moves
//! through the pipeline stages in order. Detection and resolution are separate
//! calls so a caller can inspect the overlaps before confirming; `run` drives
//! both in one go.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, warn};

use crate::config::ResolverConfig;
use crate::difference::apply_removals;
use crate::error::{ExecutionError, ResolverError, ResolverResult};
use crate::layer::LayerInput;
use crate::output::OutputCollection;
use crate::overlap::{DetectionSummary, OverlapDetector, OverlapGraph, OverlapRegion};
use crate::progress::RunContext;
use crate::resolution::{warn_missing_temporal_keys, ConflictResolver, ResolutionPolicy};
use crate::spatial::SpatialIndex;
use crate::store::FeatureStore;
use crate::temporal::{DatetimeDetector, TemporalKey};
use crate::validation::validate_layers;

/// Identifier attached to every log event of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(uuid::Uuid);

impl RunId {
    /// Creates a new random run ID.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Validating,
    IndexBuilding,
    Detecting,
    /// Detection finished without overlaps; there is nothing to resolve.
    Empty,
    /// Detection found overlaps; waiting for the caller to confirm.
    HasOverlaps,
    Resolving,
    Differencing,
    Assembling,
    Done,
    Aborted,
    Failed,
}

impl RunState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::IndexBuilding => "index_building",
            Self::Detecting => "detecting",
            Self::Empty => "empty",
            Self::HasOverlaps => "has_overlaps",
            Self::Resolving => "resolving",
            Self::Differencing => "differencing",
            Self::Assembling => "assembling",
            Self::Done => "done",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        }
    }

    /// True once the run can make no further progress.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Empty | Self::Done | Self::Aborted | Self::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final outcome of a one-shot run.
#[derive(Debug)]
pub enum RunStatus {
    /// No two features overlap; the input needs no changes.
    NoOverlaps,
    Resolved(OutputCollection),
    /// Cancelled by the caller. No output is produced.
    Aborted,
    Failed(ResolverError),
}

impl RunStatus {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoOverlaps => "no_overlaps",
            Self::Resolved(_) => "resolved",
            Self::Aborted => "aborted",
            Self::Failed(_) => "failed",
        }
    }

    /// The output collection, if the run resolved overlaps.
    #[must_use]
    pub fn into_output(self) -> Option<OutputCollection> {
        match self {
            Self::Resolved(output) => Some(output),
            _ => None,
        }
    }
}

/// State carried from detection into resolution.
#[derive(Debug)]
struct Detected {
    store: FeatureStore,
    graph: OverlapGraph,
}

/// One resolution run over a fixed set of layers.
///
/// # Example
/// ```
/// use geo::polygon;
/// use overlap_resolver::{
///     FeatureInput, LayerInput, ResolutionPolicy, ResolutionRun, ResolverConfig, RunContext, RunState,
/// };
///
/// let layers = vec![
///     LayerInput::new("parcels", "EPSG:2193").feature(FeatureInput::new(
///         1,
///         polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
///         vec![],
///     )),
///     LayerInput::new("lots", "EPSG:2193").feature(FeatureInput::new(
///         1,
///         polygon![(x: 2.0, y: 2.0), (x: 4.0, y: 2.0), (x: 4.0, y: 4.0), (x: 2.0, y: 4.0)],
///         vec![],
///     )),
/// ];
/// let policy = ResolutionPolicy::priority([("lots", 1), ("parcels", 2)]).unwrap();
/// let ctx = RunContext::default();
///
/// let mut run = ResolutionRun::new(ResolverConfig::default(), policy, layers).unwrap();
/// let summary = run.detect(&ctx).unwrap();
/// assert_eq!(summary.pairs, 1);
/// assert_eq!(run.state(), RunState::HasOverlaps);
///
/// let output = run.resolve(&ctx).unwrap();
/// assert_eq!(output.len(), 2);
/// assert_eq!(output.report.trimmed, 1);
/// ```
#[derive(Debug)]
pub struct ResolutionRun {
    id: RunId,
    config: ResolverConfig,
    policy: ResolutionPolicy,
    state: RunState,
    pending: Option<Vec<LayerInput>>,
    detected: Option<Detected>,
}

impl ResolutionRun {
    /// Creates an idle run.
    ///
    /// Configuration and policy are validated here; layers are validated when
    /// detection starts.
    ///
    /// # Errors
    /// `ValidationError::InvalidConfig` or `ValidationError::InvalidPolicy`.
    pub fn new(config: ResolverConfig, policy: ResolutionPolicy, layers: Vec<LayerInput>) -> ResolverResult<Self> {
        config.validate()?;
        policy.validate()?;
        Ok(Self {
            id: RunId::new(),
            config,
            policy,
            state: RunState::Idle,
            pending: Some(layers),
            detected: None,
        })
    }

    #[must_use]
    pub fn id(&self) -> RunId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    #[must_use]
    pub fn policy(&self) -> &ResolutionPolicy {
        &self.policy
    }

    /// The feature store, once validation and ingestion have run.
    #[must_use]
    pub fn store(&self) -> Option<&FeatureStore> {
        self.detected.as_ref().map(|d| &d.store)
    }

    /// The overlap graph, once detection has completed.
    #[must_use]
    pub fn overlaps(&self) -> Option<&OverlapGraph> {
        self.detected.as_ref().map(|d| &d.graph)
    }

    /// Overlap geometry per unordered pair, for preview before confirming.
    #[must_use]
    pub fn overlap_regions(&self) -> Vec<OverlapRegion> {
        self.overlaps().map(OverlapGraph::overlap_regions).unwrap_or_default()
    }

    /// Validates and ingests the layers, builds the spatial index and detects
    /// every overlap.
    ///
    /// Leaves the run in `Empty` or `HasOverlaps`.
    ///
    /// # Errors
    /// - `ExecutionError::InvalidState` unless the run is `Idle`
    /// - any `ValidationError` for the layers (run becomes `Failed`)
    /// - `ExecutionError::UnexpectedGeometry` (run becomes `Failed`)
    /// - `ExecutionError::Cancelled` (run becomes `Aborted`)
    pub fn detect(&mut self, ctx: &RunContext) -> ResolverResult<DetectionSummary> {
        self.require(RunState::Idle)?;
        let span = info_span!("resolution_run", run_id = %self.id, policy = self.policy.name());
        let _guard = span.enter();

        let result = self.detect_inner(ctx);
        self.settle(result)
    }

    fn detect_inner(&mut self, ctx: &RunContext) -> ResolverResult<DetectionSummary> {
        let started = Instant::now();

        self.state = RunState::Validating;
        let layers = self
            .pending
            .take()
            .ok_or_else(|| ResolverError::internal("run has no pending layers"))?;
        validate_layers(&layers)?;
        let mut store = FeatureStore::ingest(layers)?;
        self.annotate_layers(&mut store);

        self.state = RunState::IndexBuilding;
        let index = SpatialIndex::build(&store);
        info!(
            layers = store.layers().len(),
            features = store.len(),
            indexed = index.indexed_len(),
            "spatial index built"
        );

        self.state = RunState::Detecting;
        let graph = OverlapDetector::new(&store, &index, &self.config).detect(ctx)?;
        let summary = graph.summarize(&store);

        self.state = if graph.is_empty() {
            RunState::Empty
        } else {
            RunState::HasOverlaps
        };
        info!(
            pairs = summary.pairs,
            subdivisions = summary.subdivision_records,
            state = %self.state,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "detection finished"
        );
        self.detected = Some(Detected { store, graph });
        Ok(summary)
    }

    /// Resolves the detected overlaps and assembles the output.
    ///
    /// Calling this is the caller's confirmation; the run must be in
    /// `HasOverlaps`.
    ///
    /// # Errors
    /// - `ExecutionError::InvalidState` unless the run is `HasOverlaps`
    /// - `ExecutionError::Cancelled` (run becomes `Aborted`)
    pub fn resolve(&mut self, ctx: &RunContext) -> ResolverResult<OutputCollection> {
        self.require(RunState::HasOverlaps)?;
        let span = info_span!("resolution_run", run_id = %self.id, policy = self.policy.name());
        let _guard = span.enter();

        let result = self.resolve_inner(ctx);
        self.settle(result)
    }

    fn resolve_inner(&mut self, ctx: &RunContext) -> ResolverResult<OutputCollection> {
        let started = Instant::now();
        let detected = self
            .detected
            .take()
            .ok_or_else(|| ResolverError::internal("run has no detection results"))?;

        self.state = RunState::Resolving;
        let removals =
            ConflictResolver::new(&detected.store, &detected.graph, &self.policy, &self.config).resolve(ctx)?;

        self.state = RunState::Differencing;
        let outcome = apply_removals(&detected.store, &removals, ctx)?;

        self.state = RunState::Assembling;
        let output = OutputCollection::assemble(&detected.store, outcome);
        if output.is_empty() {
            warn!("every feature was removed during differencing");
        }

        self.state = RunState::Done;
        info!(
            input = output.report.input_features,
            trimmed = output.report.trimmed,
            dropped = output.report.dropped,
            untouched = output.report.untouched,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "resolution finished"
        );
        Ok(output)
    }

    fn require(&self, expected: RunState) -> ResolverResult<()> {
        if self.state != expected {
            return Err(ExecutionError::InvalidState {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            }
            .into());
        }
        Ok(())
    }

    // Failures drop every intermediate value: an aborted or failed run never
    // exposes partial output.
    fn settle<T>(&mut self, result: ResolverResult<T>) -> ResolverResult<T> {
        if let Err(err) = &result {
            self.detected = None;
            if err.is_cancelled() {
                info!(stage = %self.state, "run aborted");
                self.state = RunState::Aborted;
            } else {
                error!(stage = %self.state, error = %err, "run failed");
                self.state = RunState::Failed;
            }
        }
        result
    }

    /// Fills in the per-layer metadata the policy ranks by.
    fn annotate_layers(&self, store: &mut FeatureStore) {
        match &self.policy {
            ResolutionPolicy::Temporal { .. } => {
                let detector = DatetimeDetector::from_config(&self.config);
                let keys: Vec<Option<TemporalKey>> = (0..store.layers().len())
                    .map(|i| {
                        let rows = store.layer_features(i).iter().map(|f| f.attributes.as_slice());
                        detector
                            .detect_fields(&store.layers()[i].fields, rows)
                            .into_iter()
                            .next()
                            .map(TemporalKey::from)
                    })
                    .collect();
                for (layer, key) in store.layers_mut().iter_mut().zip(keys) {
                    if let Some(key) = &key {
                        info!(layer = %layer.id, field = %key.field, format = key.format, "temporal key selected");
                    }
                    layer.temporal_key = key;
                }
                warn_missing_temporal_keys(store);
            }
            ResolutionPolicy::Priority { ranks } => {
                for layer in store.layers_mut() {
                    layer.priority_rank = self.policy.rank_of(&layer.id);
                }
                for id in ranks.keys() {
                    if !store.layers().iter().any(|l| &l.id == id) {
                        warn!(layer = %id, "priority rank given for unknown layer");
                    }
                }
            }
        }
    }
}

/// Runs detection and resolution in one go.
///
/// Never returns an error: every failure is folded into the status.
#[must_use]
pub fn run(
    config: ResolverConfig,
    policy: ResolutionPolicy,
    layers: Vec<LayerInput>,
    ctx: &RunContext,
) -> RunStatus {
    let mut run = match ResolutionRun::new(config, policy, layers) {
        Ok(run) => run,
        Err(err) => return RunStatus::Failed(err),
    };

    let outcome = run.detect(ctx).and_then(|_| match run.state() {
        RunState::Empty => Ok(None),
        _ => run.resolve(ctx).map(Some),
    });

    match outcome {
        Ok(None) => RunStatus::NoOverlaps,
        Ok(Some(output)) => RunStatus::Resolved(output),
        Err(err) if err.is_cancelled() => RunStatus::Aborted,
        Err(err) => RunStatus::Failed(err),
    }
}
