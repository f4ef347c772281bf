//! Align frequent English section titles using machine translation
//!
//! Usage:
//!   cargo run --bin align-section-titles-mt -- --database section-titles.db
//!
//! Optional environment variables:
//! - SECTION_TITLES_DB (defaults to section-titles.db)
//! - CXSERVER_URL (defaults to https://cxserver.wikimedia.org)
//! - HTTP_TIMEOUT_SECS, HTTP_MAX_ATTEMPTS

use anyhow::Result;
use clap::Parser;
use cx_section_titles::{aligner, config::Config, db::TitleStore, http};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "align-section-titles-mt")]
#[command(about = "Fill missing section title alignments with machine translation")]
struct Args {
    /// Section title database to read from and add alignments to
    #[arg(short, long)]
    database: Option<PathBuf>,
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
                .add_directive("align_section_titles_mt=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let database = args
        .database
        .unwrap_or_else(|| PathBuf::from(&config.database_path));

    let client = http::build_client(&config)?;
    let mut store = TitleStore::open(&database)?;

    let summary = aligner::run(&client, &config, &mut store).await?;
    info!(
        "✓ Added {} MT alignments for {} language pairs",
        summary.titles, summary.language_pairs
    );

    Ok(())
}
