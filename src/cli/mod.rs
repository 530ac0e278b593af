//! Command-line interface for sentiscan.

mod commands;
mod progress;

pub use commands::{is_verbose, run};
