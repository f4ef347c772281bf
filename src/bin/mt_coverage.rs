//! Print a tab separated matrix of the language pairs each MT provider supports
//!
//! Usage:
//!   cargo run --bin mt-coverage > coverage.tsv
//!
//! Logs go to stderr so stdout only carries the report.
//!
//! Optional environment variables:
//! - CXSERVER_URL (defaults to https://cxserver.wikimedia.org)
//! - HTTP_TIMEOUT_SECS, HTTP_MAX_ATTEMPTS

use anyhow::{Context, Result};
use cx_section_titles::{config::Config, coverage, http};
use std::io::Write;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cx_section_titles=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    let client = http::build_client(&config)?;

    let report = coverage::run(&client, &config).await?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(report.as_bytes())
        .context("Failed to write coverage report")?;
    stdout.flush().context("Failed to flush coverage report")?;

    Ok(())
}
