//! sentiscan - Reddit sentiment analysis pipeline driven by Gemini.
//!
//! Core library: fetch posts for a keyword, classify each with an LLM,
//! aggregate the observations into one summary verdict. The `senti` binary
//! wraps this behind a CLI.

pub mod cli;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod sources;
