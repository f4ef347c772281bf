//! Extract section title pairs from content translation corpus dumps
//!
//! Usage:
//!   cargo run --bin extract-section-titles
//!   cargo run --bin extract-section-titles -- --input-dir dumps/ --database titles.db
//!
//! The titles table is recreated on every run. Processed dump files are deleted.
//!
//! Optional environment variables:
//! - CORPUS_DIR (defaults to dumps.wikimedia.org/other/contenttranslation)
//! - SECTION_TITLES_DB (defaults to section-titles.db)

use anyhow::Result;
use clap::Parser;
use cx_section_titles::{config::Config, db::TitleStore, extractor};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "extract-section-titles")]
#[command(about = "Mine section title pairs from cx-corpora dumps into a SQLite database")]
struct Args {
    /// Directory searched recursively for cx-corpora.*.html.json files
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    /// Output database; its titles table is dropped and recreated
    #[arg(short, long)]
    database: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cx_section_titles=info".parse()?)
                .add_directive("extract_section_titles=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let input_dir = args.input_dir.unwrap_or_else(|| PathBuf::from(&config.corpus_dir));
    let database = args
        .database
        .unwrap_or_else(|| PathBuf::from(&config.database_path));

    info!("Recreating titles table in {}", database.display());
    let mut store = TitleStore::recreate(&database)?;

    let summary = extractor::run(&input_dir, &mut store)?;
    info!(
        "✓ {} title pairs from {} files ({} skipped)",
        summary.pairs, summary.files_processed, summary.files_skipped
    );

    Ok(())
}
