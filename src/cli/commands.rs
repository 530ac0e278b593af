//! Command definitions and dispatch.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use tokio::sync::{mpsc, watch};

use crate::llm::{GeminiClient, GeminiConfig};
use crate::pipeline::{RunOutcome, RunRequest, SentimentPipeline};
use crate::sources::{PostSource, RedditSession, RedditSource};

use super::progress::{print_summary, RunProgress};

#[derive(Parser)]
#[command(name = "senti", version, about = "Reddit sentiment analysis driven by Gemini")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch posts for a keyword and analyze their sentiment
    Analyze {
        /// Search keyword
        query: String,

        /// Maximum posts to analyze (1-100)
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Request attempts per LLM call before giving up
        #[arg(long, default_value_t = 12)]
        retries: u32,

        /// Gemini model ID (default from GEMINI_MODEL or gemini-2.0-flash)
        #[arg(long)]
        model: Option<String>,

        /// Gemini API key (default from GEMINI_API_KEY)
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Delay between posts in milliseconds
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,

        /// Print the full run report as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Check configuration and backend availability
    Check,
}

/// Pre-parse peek at verbosity, used to pick the default log filter before
/// clap runs.
pub fn is_verbose() -> bool {
    std::env::args().any(|a| a == "-v" || a == "--verbose")
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Analyze {
            query,
            limit,
            retries,
            model,
            api_key,
            delay_ms,
            json,
        } => cmd_analyze(query, limit, retries, model, api_key, delay_ms, json).await,
        Command::Check => cmd_check().await,
    }
}

/// Build the Reddit session from published auth state, if any.
fn session_from_env() -> RedditSession {
    match std::env::var("REDDIT_ACCESS_TOKEN") {
        Ok(token) if !token.is_empty() => {
            RedditSession::authenticated(token, std::env::var("REDDIT_USERNAME").ok(), None)
        }
        _ => RedditSession::anonymous(),
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_analyze(
    query: String,
    limit: usize,
    retries: u32,
    model: Option<String>,
    api_key: Option<String>,
    delay_ms: u64,
    json: bool,
) -> anyhow::Result<()> {
    let query = query.trim().to_string();
    if query.is_empty() {
        anyhow::bail!("search query must not be empty");
    }
    if limit < 1 {
        anyhow::bail!("--limit must be at least 1");
    }

    let mut config = GeminiConfig::from_env().with_max_retries(retries);
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }
    if let Some(model) = model {
        config = config.with_model(model);
    }
    if !config.is_available() {
        anyhow::bail!("{}", config.availability_hint());
    }

    let source = Arc::new(RedditSource::new(session_from_env())?);
    let gemini = Arc::new(GeminiClient::new(config)?);

    // Ctrl-C cancels cooperatively between posts, keeping partial results.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let pipeline = SentimentPipeline::new(source, gemini.clone(), gemini)
        .with_post_delay(Duration::from_millis(delay_ms))
        .with_cancel(cancel_rx);

    let request = RunRequest { query, limit };
    let (event_tx, mut event_rx) = mpsc::channel(64);

    let runner = tokio::spawn(async move { pipeline.run(&request, event_tx).await });

    let display = (!json).then(RunProgress::new);
    while let Some(event) = event_rx.recv().await {
        if let Some(display) = &display {
            display.handle_event(&event);
        }
    }
    if let Some(display) = &display {
        display.finish();
    }

    // Only a fatal fetch error propagates; a degraded run still reports.
    let report = runner.await??;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
        if report.outcome == RunOutcome::Cancelled {
            println!("{}", style("Run was cancelled; results are partial.").yellow());
        }
    }

    Ok(())
}

async fn cmd_check() -> anyhow::Result<()> {
    println!("\n{}", style("sentiscan status").bold());
    println!("{}", "-".repeat(50));

    let config = GeminiConfig::from_env();
    let gemini_status = if config.is_available() {
        style("✓ configured").green()
    } else {
        style("✗ not configured").red()
    };
    println!("  {:<12} {}", "Gemini", gemini_status);
    println!("               {}", style(config.availability_hint()).dim());

    let session = session_from_env();
    let reddit_status = if session.is_authenticated() {
        style("✓ authenticated (higher rate limits)").green()
    } else {
        style("○ anonymous (public endpoint)").yellow()
    };
    println!("  {:<12} {}", "Reddit", reddit_status);
    if let Some(username) = &session.username {
        println!("               {}", style(format!("user: {username}")).dim());
    }

    // Constructing the source validates the HTTP client setup.
    let source = RedditSource::new(session)?;
    println!(
        "  {:<12} {}",
        "Source",
        style(format!("{} search API", source.source_name())).dim()
    );

    println!();
    Ok(())
}
