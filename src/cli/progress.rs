//! Progress display for a pipeline run.
//!
//! Bridges `RunEvent`s to a single indicatif bar (the run is strictly
//! sequential, so one bar is enough) and renders the end-of-run summary.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::models::Sentiment;
use crate::pipeline::{PipelineStage, RunEvent, RunOutcome, RunReport};

/// One progress bar tracking stage and per-post position.
pub struct RunProgress {
    bar: ProgressBar,
}

impl RunProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        bar.set_message("Fetching posts...");
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { bar }
    }

    /// Apply one event to the display.
    pub fn handle_event(&self, event: &RunEvent) {
        match event {
            RunEvent::StageChanged { stage } => match stage {
                PipelineStage::Fetching => self.bar.set_message("Fetching posts..."),
                PipelineStage::Analyzing => {}
                PipelineStage::Aggregating => {
                    self.bar.set_message("Aggregating results...");
                }
            },
            RunEvent::Fetched { total, elapsed_secs } => {
                self.bar.println(format!(
                    "{} Fetched {} posts in {:.1}s",
                    style("✓").green(),
                    total,
                    elapsed_secs
                ));
                self.bar.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len}")
                        .unwrap()
                        .progress_chars("█▓░"),
                );
                self.bar.set_length(*total as u64);
                self.bar.set_position(0);
            }
            RunEvent::NoResults { query } => {
                self.bar.println(format!(
                    "{} No posts found for \"{}\". Try a different keyword.",
                    style("!").yellow(),
                    query
                ));
            }
            RunEvent::PostStarted { index, total, title, .. } => {
                self.bar.set_message(format!(
                    "Analyzing {}/{}: {}",
                    index,
                    total,
                    truncate_title(title, 40)
                ));
            }
            RunEvent::PostFinished { snapshot } => {
                self.bar.set_position(snapshot.results.len() as u64);
            }
            RunEvent::AggregationFailed { error } => {
                self.bar.println(format!(
                    "{} Aggregation failed: {}",
                    style("!").yellow(),
                    error
                ));
            }
            RunEvent::Cancelled { completed } => {
                self.bar.println(format!(
                    "{} Cancelled after {} posts",
                    style("!").yellow(),
                    completed
                ));
            }
            RunEvent::Completed { .. } => {}
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for RunProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Render the end-of-run summary.
pub fn print_summary(report: &RunReport) {
    if report.outcome == RunOutcome::NoResults {
        return;
    }

    println!("\n{}", style(format!("Sentiment for \"{}\"", report.query)).bold());
    println!("{}", "-".repeat(50));

    let counts = &report.counts;
    for (sentiment, count) in [
        (Sentiment::Positive, counts.positive),
        (Sentiment::Negative, counts.negative),
        (Sentiment::Mixed, counts.mixed),
        (Sentiment::Neutral, counts.neutral),
    ] {
        let label = match sentiment {
            Sentiment::Positive => style(sentiment.as_str()).green(),
            Sentiment::Negative => style(sentiment.as_str()).red(),
            Sentiment::Mixed => style(sentiment.as_str()).yellow(),
            Sentiment::Neutral => style(sentiment.as_str()).dim(),
        };
        println!("  {:<10} {}", label, count);
    }

    let failed = report.failed_count();
    if failed > 0 {
        println!(
            "  {:<10} {}",
            style("failed").red().dim(),
            failed
        );
    }

    println!(
        "\n  {} {:.1}s data retrieval, {:.1}s LLM processing",
        style("⏱").dim(),
        report.timings.data_retrieval_secs,
        report.timings.llm_processing_secs
    );

    match &report.aggregated {
        Some(aggregate) => {
            println!("\n{}", style("Overall").bold());
            println!(
                "  {} {}",
                style("sentiment:").dim(),
                aggregate.overall_sentiment
            );
            println!("  {}", aggregate.summary);
            if !aggregate.positives.is_empty() {
                println!("\n  {}", style("Recurring positives:").green());
                for item in &aggregate.positives {
                    println!("    + {item}");
                }
            }
            if !aggregate.negatives.is_empty() {
                println!("\n  {}", style("Recurring negatives:").red());
                for item in &aggregate.negatives {
                    println!("    - {item}");
                }
            }
        }
        None => {
            if report.outcome == RunOutcome::Completed {
                println!(
                    "\n  {}",
                    style("No aggregated summary available.").dim()
                );
            }
        }
    }
    println!();
}

/// Truncate a post title for the progress message.
fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        return title.to_string();
    }
    let prefix: String = title.chars().take(max_len.saturating_sub(3)).collect();
    format!("{prefix}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_title() {
        assert_eq!(truncate_title("short", 20), "short");
        assert_eq!(
            truncate_title("a very long title that keeps going and going", 20),
            "a very long title..."
        );
    }
}
