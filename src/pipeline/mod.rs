//! The three-stage orchestration pipeline.
//!
//! `fetching → analyzing → aggregating`, with per-post failure isolation and
//! live progress events. Everything an observer sees goes through the
//! [`RunEvent`] stream; no state here outlives one run.

mod event;
mod orchestrator;
mod tracker;

pub use event::{RunEvent, RunSnapshot};
pub use orchestrator::{
    PipelineError, RunOutcome, RunReport, RunRequest, SentimentPipeline, DEFAULT_POST_DELAY,
};
pub use tracker::{PipelineStage, ProgressSnapshot, ProgressTracker};
