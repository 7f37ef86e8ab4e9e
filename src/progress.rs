//! Progress reporting and cooperative cancellation.
//!
//! Detection, resolution and differencing report `(processed, total)` at
//! feature granularity and poll a `CancellationToken` between features.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use crate::error::{ExecutionError, ResolverError, ResolverResult};

/// Cancellable, progress-reporting pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Detecting,
    Resolving,
    Differencing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detecting => write!(f, "detecting"),
            Self::Resolving => write!(f, "resolving"),
            Self::Differencing => write!(f, "differencing"),
        }
    }
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Receives progress reports.
pub trait ProgressObserver: Send + Sync {
    /// Called after each feature of `stage` has been processed.
    fn on_progress(&self, stage: Stage, processed: usize, total: usize);
}

impl<F> ProgressObserver for F
where
    F: Fn(Stage, usize, usize) + Send + Sync,
{
    fn on_progress(&self, stage: Stage, processed: usize, total: usize) {
        self(stage, processed, total);
    }
}

/// Observer that discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _stage: Stage, _processed: usize, _total: usize) {}
}

/// A single progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub processed: usize,
    pub total: usize,
}

/// Forwards progress into a bounded channel.
///
/// Sends never block the pipeline: when the channel is full or the receiver
/// is gone the event is dropped and counted.
#[derive(Debug)]
pub struct ChannelProgress {
    tx: Sender<ProgressEvent>,
    dropped: AtomicU64,
}

impl ChannelProgress {
    /// Creates the observer and the receiving end of its channel.
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, Receiver<ProgressEvent>) {
        let (tx, rx) = bounded(capacity.max(1));
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Number of events dropped because the channel was full or disconnected.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl ProgressObserver for ChannelProgress {
    fn on_progress(&self, stage: Stage, processed: usize, total: usize) {
        let event = ProgressEvent {
            stage,
            processed,
            total,
        };
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Cancellation token and progress observer for one run.
#[derive(Clone)]
pub struct RunContext {
    cancel: CancellationToken,
    observer: Arc<dyn ProgressObserver>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(CancellationToken::new(), Arc::new(NoProgress))
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl RunContext {
    pub fn new(cancel: CancellationToken, observer: Arc<dyn ProgressObserver>) -> Self {
        Self { cancel, observer }
    }

    /// Context with a fresh token and the given observer.
    pub fn with_observer(observer: Arc<dyn ProgressObserver>) -> Self {
        Self::new(CancellationToken::new(), observer)
    }

    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fails with `Cancelled` once cancellation has been requested.
    pub fn checkpoint(&self, stage: Stage) -> ResolverResult<()> {
        if self.cancel.is_cancelled() {
            return Err(ResolverError::Execution(ExecutionError::Cancelled { stage }));
        }
        Ok(())
    }

    /// Starts a progress counter for `stage`.
    #[must_use]
    pub fn tracker(&self, stage: Stage, total: usize) -> StageTracker<'_> {
        StageTracker {
            ctx: self,
            stage,
            total,
            processed: Mutex::new(0),
        }
    }
}

/// Per-stage progress counter.
///
/// The counter and the observer call happen under one lock, so reports stay
/// monotonic when features complete on several threads.
pub struct StageTracker<'a> {
    ctx: &'a RunContext,
    stage: Stage,
    total: usize,
    processed: Mutex<usize>,
}

impl StageTracker<'_> {
    /// Checks for cancellation before a feature is processed.
    pub fn checkpoint(&self) -> ResolverResult<()> {
        self.ctx.checkpoint(self.stage)
    }

    /// Records one processed feature.
    pub fn advance(&self) -> ResolverResult<()> {
        let mut processed = self
            .processed
            .lock()
            .map_err(|_| ResolverError::internal("progress counter lock poisoned"))?;
        *processed += 1;
        self.ctx.observer.on_progress(self.stage, *processed, self.total);
        Ok(())
    }
}
