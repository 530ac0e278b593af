//! Domain models for one sentiment-analysis run.
//!
//! Everything here is scoped to a single pipeline run: posts are fetched,
//! classified, and summarized, then the whole run state is dropped. Nothing
//! is persisted across runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One Reddit post under analysis. Immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Reddit fullname-less ID (e.g. "1abcde").
    pub id: String,
    pub title: String,
    /// Self-text body; empty for link posts.
    pub body: String,
    pub subreddit: String,
    pub author: String,
    pub score: i64,
    pub num_comments: u64,
    /// Site-relative permalink (e.g. "/r/rust/comments/...").
    pub permalink: String,
    pub created_utc: Option<DateTime<Utc>>,
}

impl Post {
    /// Text submitted to the classifier: title plus body when present.
    pub fn analysis_text(&self) -> String {
        if self.body.trim().is_empty() {
            self.title.clone()
        } else {
            format!("{}\n\n{}", self.title, self.body)
        }
    }
}

/// The four sentiment labels that participate in counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Mixed,
    Neutral,
}

impl Sentiment {
    /// Case-insensitive label lookup. Labels outside the four recognized
    /// values return `None` and are dropped from counting.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "mixed" => Some(Self::Mixed),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Mixed => "mixed",
            Self::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured classifier output for one post.
///
/// `sentiment` keeps the raw model label; use [`Sentiment::from_label`] to
/// map it onto the counted set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub sentiment: String,
    #[serde(default)]
    pub positives: Vec<String>,
    #[serde(default)]
    pub negatives: Vec<String>,
}

impl Verdict {
    pub fn label(&self) -> Option<Sentiment> {
        Sentiment::from_label(&self.sentiment)
    }
}

/// Outcome of classifying one post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum AnalysisOutcome {
    /// Classification succeeded.
    Analyzed { verdict: Verdict },
    /// Classifier failed after exhausting its retry budget.
    Failed { error: String },
}

/// One post paired with its classification outcome.
///
/// Appended to the run's result sequence in source order; never mutated,
/// reordered, or removed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub post: Post,
    pub outcome: AnalysisOutcome,
}

impl AnalysisResult {
    pub fn verdict(&self) -> Option<&Verdict> {
        match &self.outcome {
            AnalysisOutcome::Analyzed { verdict } => Some(verdict),
            AnalysisOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, AnalysisOutcome::Failed { .. })
    }
}

/// Running tallies per recognized sentiment label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: u64,
    pub negative: u64,
    pub mixed: u64,
    pub neutral: u64,
}

impl SentimentCounts {
    /// Record a raw label. Returns false when the label is unrecognized,
    /// in which case no counter changes.
    pub fn record(&mut self, label: &str) -> bool {
        match Sentiment::from_label(label) {
            Some(Sentiment::Positive) => self.positive += 1,
            Some(Sentiment::Negative) => self.negative += 1,
            Some(Sentiment::Mixed) => self.mixed += 1,
            Some(Sentiment::Neutral) => self.neutral += 1,
            None => return false,
        }
        true
    }

    pub fn total(&self) -> u64 {
        self.positive + self.negative + self.mixed + self.neutral
    }

    pub fn get(&self, sentiment: Sentiment) -> u64 {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Mixed => self.mixed,
            Sentiment::Neutral => self.neutral,
        }
    }
}

/// Aggregated summary verdict over all successful classifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResult {
    /// Overall sentiment label for the keyword.
    pub overall_sentiment: String,
    /// Short prose summary of the discussion.
    pub summary: String,
    /// Distilled recurring positive themes.
    #[serde(default)]
    pub positives: Vec<String>,
    /// Distilled recurring negative themes.
    #[serde(default)]
    pub negatives: Vec<String>,
}

/// Wall-clock durations for one run, reported in seconds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunTimings {
    /// Fetch stage only.
    pub data_retrieval_secs: f64,
    /// Analyze + aggregate stages combined.
    pub llm_processing_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_from_label_case_insensitive() {
        assert_eq!(Sentiment::from_label("Positive"), Some(Sentiment::Positive));
        assert_eq!(Sentiment::from_label("NEGATIVE"), Some(Sentiment::Negative));
        assert_eq!(Sentiment::from_label("mixed"), Some(Sentiment::Mixed));
        assert_eq!(Sentiment::from_label("NeuTral"), Some(Sentiment::Neutral));
        assert_eq!(Sentiment::from_label("sarcastic"), None);
        assert_eq!(Sentiment::from_label(""), None);
    }

    #[test]
    fn test_counts_record_and_silent_drop() {
        let mut counts = SentimentCounts::default();
        assert!(counts.record("positive"));
        assert!(counts.record("Positive"));
        assert!(counts.record("negative"));
        assert!(!counts.record("enthusiastic"));
        assert_eq!(counts.positive, 2);
        assert_eq!(counts.negative, 1);
        assert_eq!(counts.mixed, 0);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_analysis_result_verdict_access() {
        let post = Post {
            id: "x1".into(),
            title: "t".into(),
            body: String::new(),
            subreddit: "rust".into(),
            author: "a".into(),
            score: 1,
            num_comments: 0,
            permalink: "/r/rust/x1".into(),
            created_utc: None,
        };
        let ok = AnalysisResult {
            post: post.clone(),
            outcome: AnalysisOutcome::Analyzed {
                verdict: Verdict {
                    sentiment: "positive".into(),
                    positives: vec!["fast".into()],
                    negatives: vec![],
                },
            },
        };
        assert!(ok.verdict().is_some());
        assert!(!ok.is_failed());

        let failed = AnalysisResult {
            post,
            outcome: AnalysisOutcome::Failed {
                error: "retries exhausted".into(),
            },
        };
        assert!(failed.verdict().is_none());
        assert!(failed.is_failed());
    }

    #[test]
    fn test_analysis_text_falls_back_to_title() {
        let mut post = Post {
            id: "x1".into(),
            title: "Just a headline".into(),
            body: "  ".into(),
            subreddit: "news".into(),
            author: "a".into(),
            score: 0,
            num_comments: 0,
            permalink: String::new(),
            created_utc: None,
        };
        assert_eq!(post.analysis_text(), "Just a headline");
        post.body = "With a body".into();
        assert!(post.analysis_text().contains("With a body"));
    }
}
