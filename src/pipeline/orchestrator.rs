//! The pipeline orchestrator.
//!
//! Drives one run through its three stages, strictly sequentially: one
//! fetch, one classification at a time with a fixed inter-post delay, one
//! aggregation. A single post's failure never aborts the batch; only a
//! stage-1 fetch error is fatal.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use super::event::{RunEvent, RunSnapshot};
use super::tracker::{PipelineStage, ProgressTracker};
use crate::llm::{SentimentAggregator, SentimentClassifier};
use crate::models::{
    AggregatedResult, AnalysisOutcome, AnalysisResult, RunTimings, SentimentCounts,
};
use crate::sources::{PostSource, SourceError};

/// Flat self-imposed throttle between classifier calls, applied after every
/// post including the last.
pub const DEFAULT_POST_DELAY: Duration = Duration::from_secs(1);

/// Only stage-1 failures propagate; everything else is absorbed into the
/// result model.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetching posts failed: {0}")]
    Fetch(#[from] SourceError),
}

/// Parameters for one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub query: String,
    pub limit: usize,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// All stages ran (aggregation may still have been skipped or failed).
    Completed,
    /// Stage 1 returned no posts; nothing was analyzed.
    NoResults,
    /// Cancellation was requested between posts.
    Cancelled,
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub query: String,
    pub outcome: RunOutcome,
    /// Ordered result sequence; one entry per processed post.
    pub results: Vec<AnalysisResult>,
    pub aggregated: Option<AggregatedResult>,
    pub counts: SentimentCounts,
    pub timings: RunTimings,
}

impl RunReport {
    /// Number of posts whose classification failed.
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_failed()).count()
    }
}

/// Orchestrates `fetching → analyzing → aggregating` for one query.
///
/// Holds only adapters and knobs; all run state lives inside [`run`] so
/// concurrent runs on clones of the same adapters stay isolated.
///
/// [`run`]: SentimentPipeline::run
pub struct SentimentPipeline {
    source: Arc<dyn PostSource>,
    classifier: Arc<dyn SentimentClassifier>,
    aggregator: Arc<dyn SentimentAggregator>,
    post_delay: Duration,
    cancel: Option<watch::Receiver<bool>>,
}

impl SentimentPipeline {
    pub fn new(
        source: Arc<dyn PostSource>,
        classifier: Arc<dyn SentimentClassifier>,
        aggregator: Arc<dyn SentimentAggregator>,
    ) -> Self {
        Self {
            source,
            classifier,
            aggregator,
            post_delay: DEFAULT_POST_DELAY,
            cancel: None,
        }
    }

    /// Override the inter-post delay (tests run with zero).
    pub fn with_post_delay(mut self, delay: Duration) -> Self {
        self.post_delay = delay;
        self
    }

    /// Attach a cooperative cancellation signal, checked between posts.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn cancel_requested(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Execute one run. Progress is pushed to `event_tx`; a dropped receiver
    /// never fails the run.
    pub async fn run(
        &self,
        request: &RunRequest,
        event_tx: mpsc::Sender<RunEvent>,
    ) -> Result<RunReport, PipelineError> {
        let mut tracker = ProgressTracker::new();
        let mut timings = RunTimings::default();

        // === Stage 1: fetching ===
        let _ = event_tx
            .send(RunEvent::StageChanged {
                stage: PipelineStage::Fetching,
            })
            .await;

        let fetch_started = Instant::now();
        let posts = self
            .source
            .search(&request.query, request.limit)
            .await
            .map_err(|e| {
                warn!(query = %request.query, "fetch failed: {e}");
                e
            })?;
        timings.data_retrieval_secs = fetch_started.elapsed().as_secs_f64();

        info!(
            query = %request.query,
            total = posts.len(),
            source = self.source.source_name(),
            "fetched posts"
        );
        let _ = event_tx
            .send(RunEvent::Fetched {
                total: posts.len(),
                elapsed_secs: timings.data_retrieval_secs,
            })
            .await;

        if posts.is_empty() {
            // Successful-but-empty outcome; deliberately never reaches the
            // analyzing or aggregating stages.
            let _ = event_tx
                .send(RunEvent::NoResults {
                    query: request.query.clone(),
                })
                .await;
            return Ok(RunReport {
                query: request.query.clone(),
                outcome: RunOutcome::NoResults,
                results: Vec::new(),
                aggregated: None,
                counts: SentimentCounts::default(),
                timings,
            });
        }

        // === Stage 2: analyzing ===
        tracker.set_total(posts.len());
        tracker.advance_to(PipelineStage::Analyzing);
        let _ = event_tx
            .send(RunEvent::StageChanged {
                stage: PipelineStage::Analyzing,
            })
            .await;

        let llm_started = Instant::now();
        let total = posts.len();
        let mut results: Vec<AnalysisResult> = Vec::with_capacity(total);
        let mut all_positives: Vec<String> = Vec::new();
        let mut all_negatives: Vec<String> = Vec::new();

        for (i, post) in posts.into_iter().enumerate() {
            if self.cancel_requested() {
                info!(completed = results.len(), "run cancelled between posts");
                timings.llm_processing_secs = llm_started.elapsed().as_secs_f64();
                let _ = event_tx
                    .send(RunEvent::Cancelled {
                        completed: results.len(),
                    })
                    .await;
                return Ok(RunReport {
                    query: request.query.clone(),
                    outcome: RunOutcome::Cancelled,
                    results,
                    aggregated: None,
                    counts: tracker.counts(),
                    timings,
                });
            }

            let index = i + 1;
            tracker.begin_post(index);
            let _ = event_tx
                .send(RunEvent::PostStarted {
                    index,
                    total,
                    post_id: post.id.clone(),
                    title: post.title.clone(),
                })
                .await;

            match self.classifier.classify(&post, &request.query).await {
                Ok(verdict) => {
                    tracker.record_label(&verdict.sentiment);
                    all_positives.extend(verdict.positives.iter().cloned());
                    all_negatives.extend(verdict.negatives.iter().cloned());
                    results.push(AnalysisResult {
                        post,
                        outcome: AnalysisOutcome::Analyzed { verdict },
                    });
                }
                Err(e) => {
                    warn!(index, total, "classification failed: {e}");
                    results.push(AnalysisResult {
                        post,
                        outcome: AnalysisOutcome::Failed {
                            error: e.to_string(),
                        },
                    });
                }
            }

            timings.llm_processing_secs = llm_started.elapsed().as_secs_f64();
            let _ = event_tx
                .send(RunEvent::PostFinished {
                    snapshot: make_snapshot(&tracker, &results, timings),
                })
                .await;

            // Flat throttle against the upstream quota; applied after every
            // post, including the last.
            if self.post_delay > Duration::ZERO {
                tokio::time::sleep(self.post_delay).await;
            }
        }

        // === Stage 3: aggregating ===
        tracker.advance_to(PipelineStage::Aggregating);
        let _ = event_tx
            .send(RunEvent::StageChanged {
                stage: PipelineStage::Aggregating,
            })
            .await;

        let mut aggregated = None;
        if !all_positives.is_empty() || !all_negatives.is_empty() {
            match self
                .aggregator
                .aggregate(&all_positives, &all_negatives, &request.query)
                .await
            {
                Ok(summary) => aggregated = Some(summary),
                Err(e) => {
                    warn!("aggregation failed: {e}");
                    let _ = event_tx
                        .send(RunEvent::AggregationFailed {
                            error: e.to_string(),
                        })
                        .await;
                }
            }
        }
        timings.llm_processing_secs = llm_started.elapsed().as_secs_f64();

        let report = RunReport {
            query: request.query.clone(),
            outcome: RunOutcome::Completed,
            results,
            aggregated,
            counts: tracker.counts(),
            timings,
        };
        let _ = event_tx
            .send(RunEvent::Completed {
                snapshot: make_snapshot(&tracker, &report.results, timings),
            })
            .await;
        Ok(report)
    }
}

fn make_snapshot(
    tracker: &ProgressTracker,
    results: &[AnalysisResult],
    timings: RunTimings,
) -> RunSnapshot {
    let progress = tracker.snapshot();
    RunSnapshot {
        stage: progress.stage,
        results: results.to_vec(),
        counts: progress.counts,
        timings,
    }
}
