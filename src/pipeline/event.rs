//! Progress events emitted during a run.
//!
//! Events are pushed over an mpsc channel; a dropped or slow receiver never
//! fails the run. Snapshots are immutable copies — the observer holds no
//! shared mutable state with the orchestrator.

use serde::{Deserialize, Serialize};

use super::tracker::PipelineStage;
use crate::models::{AnalysisResult, RunTimings, SentimentCounts};

/// Full view of run state at one point in time: current stage, the ordered
/// result sequence so far, counters, and timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub stage: PipelineStage,
    pub results: Vec<AnalysisResult>,
    pub counts: SentimentCounts,
    pub timings: RunTimings,
}

/// Events emitted by the orchestrator, in run order.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// The run entered a new stage.
    StageChanged { stage: PipelineStage },
    /// Stage 1 finished; `total` posts were retrieved.
    Fetched { total: usize, elapsed_secs: f64 },
    /// Stage 1 returned nothing; the run ends here. Not an error.
    NoResults { query: String },
    /// Classification of post `index`/`total` is starting.
    PostStarted {
        index: usize,
        total: usize,
        post_id: String,
        title: String,
    },
    /// A post finished (classified or failed); snapshot carries the updated
    /// result sequence and counters.
    PostFinished { snapshot: RunSnapshot },
    /// Aggregation failed; the run still completes without a summary.
    AggregationFailed { error: String },
    /// Cancellation was requested between posts; partial results stand.
    Cancelled { completed: usize },
    /// The run finished; final snapshot.
    Completed { snapshot: RunSnapshot },
}
