//! Run progress bookkeeping.
//!
//! The tracker is owned and mutated only by the orchestrator; observers get
//! immutable snapshots, so no reader can see a half-updated state.

use serde::{Deserialize, Serialize};

use crate::models::SentimentCounts;

/// The three ordered phases of a run. Advances forward only; a new run
/// starts back at `Fetching`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Fetching,
    Analyzing,
    Aggregating,
}

impl PipelineStage {
    fn order(self) -> u8 {
        match self {
            Self::Fetching => 0,
            Self::Analyzing => 1,
            Self::Aggregating => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Analyzing => "analyzing",
            Self::Aggregating => "aggregating",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consistent point-in-time view of the tracker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub stage: PipelineStage,
    /// 1-based index of the post currently being processed (0 before any).
    pub current: usize,
    pub total: usize,
    pub counts: SentimentCounts,
}

/// Running tallies for one pipeline run.
#[derive(Debug)]
pub struct ProgressTracker {
    stage: PipelineStage,
    current: usize,
    total: usize,
    counts: SentimentCounts,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            stage: PipelineStage::Fetching,
            current: 0,
            total: 0,
            counts: SentimentCounts::default(),
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn counts(&self) -> SentimentCounts {
        self.counts
    }

    /// Move to a later stage. Regressions are ignored; returns whether the
    /// stage actually changed.
    pub fn advance_to(&mut self, stage: PipelineStage) -> bool {
        if stage.order() <= self.stage.order() {
            return false;
        }
        self.stage = stage;
        true
    }

    pub fn set_total(&mut self, total: usize) {
        self.total = total;
    }

    /// Mark the 1-based post index currently being processed.
    pub fn begin_post(&mut self, index: usize) {
        self.current = index;
    }

    /// Count a verdict's label. Unrecognized labels leave the counts
    /// untouched and return false.
    pub fn record_label(&mut self, label: &str) -> bool {
        self.counts.record(label)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            stage: self.stage,
            current: self.current,
            total: self.total,
            counts: self.counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(format!("{}", PipelineStage::Fetching), "fetching");
        assert_eq!(format!("{}", PipelineStage::Analyzing), "analyzing");
        assert_eq!(format!("{}", PipelineStage::Aggregating), "aggregating");
    }

    #[test]
    fn test_stage_advances_forward_only() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(tracker.stage(), PipelineStage::Fetching);

        assert!(tracker.advance_to(PipelineStage::Analyzing));
        assert_eq!(tracker.stage(), PipelineStage::Analyzing);

        // Regression is a no-op.
        assert!(!tracker.advance_to(PipelineStage::Fetching));
        assert_eq!(tracker.stage(), PipelineStage::Analyzing);

        assert!(tracker.advance_to(PipelineStage::Aggregating));
        assert!(!tracker.advance_to(PipelineStage::Aggregating));
        assert_eq!(tracker.stage(), PipelineStage::Aggregating);
    }

    #[test]
    fn test_snapshot_reflects_latest_mutation() {
        let mut tracker = ProgressTracker::new();
        tracker.set_total(3);
        tracker.begin_post(1);
        tracker.record_label("positive");
        tracker.record_label("bogus");

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.current, 1);
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.counts.positive, 1);
        assert_eq!(snapshot.counts.total(), 1);
    }
}
