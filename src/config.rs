use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE_PATH: &str = "section-titles.db";
pub const DEFAULT_CORPUS_DIR: &str = "dumps.wikimedia.org/other/contenttranslation";
pub const DEFAULT_STATS_API_URL: &str =
    "https://en.wikipedia.org/w/api.php?action=query&list=contenttranslationstats&format=json";
pub const DEFAULT_CXSERVER_URL: &str = "https://cxserver.wikimedia.org";

#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub database_path: String,
    pub corpus_dir: String,

    // Upstream APIs
    pub stats_api_url: String,
    pub cxserver_url: String,

    // Filtering
    pub min_translators: u32,

    // HTTP behaviour
    pub http_timeout: Duration,
    pub http_max_attempts: u32,

    // Wrapped engine
    pub apertium_bin: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let http_timeout_secs: u64 = parse_var("HTTP_TIMEOUT_SECS", 30)?;
        if http_timeout_secs == 0 {
            anyhow::bail!("HTTP_TIMEOUT_SECS must be at least 1");
        }

        let http_max_attempts: u32 = parse_var("HTTP_MAX_ATTEMPTS", 1)?;
        if http_max_attempts == 0 {
            anyhow::bail!("HTTP_MAX_ATTEMPTS must be at least 1");
        }

        Ok(Self {
            database_path: std::env::var("SECTION_TITLES_DB")
                .unwrap_or_else(|_| DEFAULT_DATABASE_PATH.to_string()),
            corpus_dir: std::env::var("CORPUS_DIR")
                .unwrap_or_else(|_| DEFAULT_CORPUS_DIR.to_string()),

            stats_api_url: std::env::var("CX_STATS_API_URL")
                .unwrap_or_else(|_| DEFAULT_STATS_API_URL.to_string()),
            cxserver_url: std::env::var("CXSERVER_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_CXSERVER_URL.to_string()),

            // The statistics API counts translators per pair; pairs below this are too rare
            min_translators: parse_var("MIN_TRANSLATORS", 11)?,

            http_timeout: Duration::from_secs(http_timeout_secs),
            http_max_attempts,

            apertium_bin: std::env::var("APERTIUM_BIN").unwrap_or_else(|_| "apertium".to_string()),
        })
    }

    /// URL of the MT provider coverage listing
    pub fn mt_list_url(&self) -> String {
        format!("{}/v1/list/mt", self.cxserver_url)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            corpus_dir: DEFAULT_CORPUS_DIR.to_string(),
            stats_api_url: DEFAULT_STATS_API_URL.to_string(),
            cxserver_url: DEFAULT_CXSERVER_URL.to_string(),
            min_translators: 11,
            http_timeout: Duration::from_secs(30),
            http_max_attempts: 1,
            apertium_bin: "apertium".to_string(),
        }
    }
}

/// Read a numeric variable, falling back to `default` when unset
fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, value)),
        Err(_) => Ok(default),
    }
}
