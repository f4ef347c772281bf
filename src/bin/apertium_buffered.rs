//! Run apertium behind a buffered stdout pipe
//!
//! Apertium is a shell pipeline and fails when its stdout is a socket, which is
//! what a node parent process hands it. All arguments go to the engine as is.
//!
//! Usage:
//!   echo "Hola" | apertium-buffered es-ca
//!
//! Optional environment variables:
//! - APERTIUM_BIN (defaults to apertium)

use anyhow::Result;
use cx_section_titles::{buffer, config::Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging; stdout belongs to the engine output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cx_section_titles=warn".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut stdout = tokio::io::stdout();
    let status = buffer::forward_output(&config.apertium_bin, &args, &mut stdout).await?;

    std::process::exit(buffer::exit_code(&status));
}
