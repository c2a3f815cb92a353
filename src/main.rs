//! CLI entry point for the repository-archive crawler
//!
//! Exit codes: 0 after a cooperative shutdown (the process otherwise runs
//! indefinitely); non-zero on invalid configuration or a fatal
//! pagination-level error.

use clap::Parser;
use repo_crawler::{Config, Language, RepoCrawler, run_with_shutdown};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Crawl repository default-branch archives into a source corpus
#[derive(Debug, Parser)]
#[command(name = "repo-crawler", version, about)]
struct Args {
    /// Target language: selects the extension filter and deny list
    /// (java, go, python)
    #[arg(short, long)]
    language: Option<Language>,

    /// Root directory for the crawled corpus
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// First listing page URL (derived from the language when omitted)
    #[arg(long)]
    start_url: Option<String>,

    /// JSON configuration file (CLI flags override its values)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, path = %path.display(), "failed to load configuration");
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    if let Some(language) = args.language {
        config.language = language;
    }
    if let Some(root) = args.root {
        config.root_dir = root;
    }
    if let Some(start_url) = args.start_url {
        config.start_url = Some(start_url);
    }

    let crawler = match RepoCrawler::new(config) {
        Ok(crawler) => crawler,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run_with_shutdown(crawler).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "crawl terminated");
            ExitCode::FAILURE
        }
    }
}
