//! Command-line argument parsing
//!
//! Provides clap-based CLI with verbosity control. Flags override the
//! values loaded from the config file.

use clap::Parser;

/// Boardroom - route one task through a four-role agent leadership team
#[derive(Parser, Debug)]
#[command(name = "boardroom")]
#[command(author = "Jerome (Kubashen) Naidoo")]
#[command(version = "0.3.0")]
#[command(about = "Fan a task out to CEO/CTO/CMO/CFO agents and collect their answers", long_about = None)]
pub struct Args {
    /// Task to orchestrate across the team
    #[arg(value_name = "TASK")]
    pub task: String,

    /// Session identifier for conversational memory
    #[arg(short, long, default_value = "default")]
    pub session: String,

    /// Primary Ollama model
    #[arg(short, long)]
    pub model: Option<String>,

    /// Fallback model tried when the primary fails
    #[arg(long)]
    pub fallback_model: Option<String>,

    /// Ollama host
    #[arg(long)]
    pub host: Option<String>,

    /// Ollama port
    #[arg(long)]
    pub port: Option<u16>,

    /// Qdrant endpoint for vector memory
    #[arg(long)]
    pub qdrant_url: Option<String>,

    /// Per-role reply timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Verbosity level: default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Tracing filter directive for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "boardroom=warn",
            1 => "boardroom=info",
            _ => "boardroom=debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_invocation() {
        let args = Args::parse_from(["boardroom", "launch a coffee brand"]);
        assert_eq!(args.task, "launch a coffee brand");
        assert_eq!(args.session, "default");
        assert!(args.model.is_none());
        assert_eq!(args.log_filter(), "boardroom=warn");
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "boardroom",
            "task",
            "--session",
            "s9",
            "--model",
            "mistral:7b",
            "--timeout",
            "45",
            "-vv",
        ]);
        assert_eq!(args.session, "s9");
        assert_eq!(args.model.as_deref(), Some("mistral:7b"));
        assert_eq!(args.timeout, Some(45));
        assert_eq!(args.log_filter(), "boardroom=debug");
    }
}
