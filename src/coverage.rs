use crate::config::Config;
use crate::http::get_json;
use crate::retry::RetryConfig;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{info, warn};

/// Key of the pseudo-provider holding default provider choices
pub const DEFAULTS_KEY: &str = "defaults";

/// Which MT providers support which (source, target) language pairs
#[derive(Debug, Clone, Default)]
pub struct CoverageMatrix {
    languages: Vec<String>,
    cells: HashMap<(String, String), Vec<String>>,
}

impl CoverageMatrix {
    /// Build the matrix from a `/v1/list/mt` document: provider -> source -> [targets].
    ///
    /// Providers in a cell keep the order the document lists them in.
    pub fn from_document(document: &Map<String, Value>) -> Result<Self> {
        let mut languages = BTreeSet::new();
        let mut cells: HashMap<(String, String), Vec<String>> = HashMap::new();

        for (provider, value) in document {
            if provider == DEFAULTS_KEY {
                continue;
            }
            let pairs: BTreeMap<String, Vec<String>> = serde_json::from_value(value.clone())
                .with_context(|| format!("Unexpected language list for provider {}", provider))?;

            for (source, targets) in pairs {
                languages.insert(source.clone());
                for target in targets {
                    languages.insert(target.clone());
                    let providers = cells.entry((source.clone(), target)).or_default();
                    if !providers.contains(provider) {
                        providers.push(provider.clone());
                    }
                }
            }
        }

        Ok(Self {
            languages: languages.into_iter().collect(),
            cells,
        })
    }

    /// Every language seen as a source or a target, sorted
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn providers(&self, source: &str, target: &str) -> &[String] {
        self.cells
            .get(&(source.to_string(), target.to_string()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Tab separated report: a header of all languages, then one row per source language
    pub fn render_tsv(&self) -> String {
        let mut out = String::from("\t");
        for language in &self.languages {
            out.push_str(language);
            out.push('\t');
        }
        out.push('\n');

        for source in &self.languages {
            out.push_str(source);
            out.push('\t');
            for target in &self.languages {
                out.push_str(&self.providers(source, target).join(","));
                out.push('\t');
            }
            out.push('\n');
        }

        out
    }
}

/// Fetch the provider listing from cxserver and render the coverage report
pub async fn run(client: &reqwest::Client, config: &Config) -> Result<String> {
    let url = config.mt_list_url();
    let retry = RetryConfig::with_attempts(config.http_max_attempts);
    let document: Map<String, Value> = get_json(client, &url, &retry)
        .await
        .context("Failed to fetch MT provider list")?;

    let matrix = CoverageMatrix::from_document(&document)?;
    if matrix.languages().is_empty() {
        warn!("MT provider list from {} has no language pairs", url);
    }
    info!(
        "Coverage matrix covers {} languages across {} providers",
        matrix.languages().len(),
        document.keys().filter(|k| k.as_str() != DEFAULTS_KEY).count()
    );

    Ok(matrix.render_tsv())
}
