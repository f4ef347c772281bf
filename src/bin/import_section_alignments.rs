//! Add section title mappings from a machine-learning alignment database
//!
//! Usage:
//!   cargo run --bin import-section-alignments -- -s alignments.db -t section-titles.db
//!
//! The target database must already exist. Rows are appended, never updated.
//!
//! Optional environment variables:
//! - CX_STATS_API_URL (content translation statistics endpoint)
//! - MIN_TRANSLATORS (defaults to 11)
//! - HTTP_TIMEOUT_SECS, HTTP_MAX_ATTEMPTS

use anyhow::Result;
use clap::Parser;
use cx_section_titles::{config::Config, http, importer};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "import-section-alignments")]
#[command(about = "Add section titles mapping from a database")]
struct Args {
    /// Source database
    #[arg(short, long, value_parser = existing_file)]
    source: PathBuf,

    /// Target database
    #[arg(short, long, value_parser = existing_file)]
    target: PathBuf,
}

fn existing_file(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    match std::fs::File::open(&path) {
        Ok(_) if path.is_file() => Ok(path),
        Ok(_) => Err(format!("{} is not a file", value)),
        Err(e) => Err(format!("can't open '{}': {}", value, e)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cx_section_titles=info".parse()?)
                .add_directive("import_section_alignments=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let client = http::build_client(&config)?;

    let summary = importer::run(&client, &config, &args.source, &args.target).await?;
    info!(
        "✓ Imported {} section titles for {} language pairs",
        summary.titles, summary.language_pairs
    );

    Ok(())
}
