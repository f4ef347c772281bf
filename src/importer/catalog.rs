use crate::config::Config;
use crate::http::get_json;
use crate::retry::RetryConfig;
use anyhow::{Context, Result};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
struct StatsResponse {
    query: StatsQuery,
}

#[derive(Debug, Deserialize)]
struct StatsQuery {
    contenttranslationstats: TranslationStats,
}

#[derive(Debug, Deserialize)]
struct TranslationStats {
    #[serde(default)]
    pages: Vec<PairStats>,
}

/// Per language pair and status translation counts from the statistics API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairStats {
    pub source_language: String,
    pub target_language: String,
    #[serde(default)]
    pub status: String,
    #[serde(deserialize_with = "deserialize_count")]
    pub translators: u64,
}

/// The API reports counts as strings; accept plain numbers as well
fn deserialize_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Text(String),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

/// Language pairs active enough in content translation to be worth importing.
///
/// Sources and their targets keep the order the statistics API first reports them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguagePairCatalog {
    pairs: Vec<(String, Vec<String>)>,
}

impl LanguagePairCatalog {
    /// Keep non-draft pairs with at least `min_translators` translators, without duplicates
    pub fn from_stats(pages: &[PairStats], min_translators: u64) -> Self {
        let mut pairs: Vec<(String, Vec<String>)> = Vec::new();

        for page in pages {
            if page.status == "draft" || page.translators < min_translators {
                continue;
            }
            let index = match pairs.iter().position(|(source, _)| *source == page.source_language) {
                Some(index) => index,
                None => {
                    pairs.push((page.source_language.clone(), Vec::new()));
                    pairs.len() - 1
                }
            };
            let targets = &mut pairs[index].1;
            if !targets.contains(&page.target_language) {
                targets.push(page.target_language.clone());
            }
        }

        Self { pairs }
    }

    pub fn targets(&self, source_language: &str) -> &[String] {
        self.pairs
            .iter()
            .find(|(source, _)| source == source_language)
            .map(|(_, targets)| targets.as_slice())
            .unwrap_or_default()
    }

    /// All (source, target) pairs, in first-seen order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.pairs.iter().flat_map(|(source, targets)| {
            targets
                .iter()
                .map(move |target| (source.as_str(), target.as_str()))
        })
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.iter().map(|(_, targets)| targets.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Fetch translation statistics and build the catalog
pub async fn fetch_catalog(client: &reqwest::Client, config: &Config) -> Result<LanguagePairCatalog> {
    let retry = RetryConfig::with_attempts(config.http_max_attempts);
    let response: StatsResponse = get_json(client, &config.stats_api_url, &retry)
        .await
        .context("Failed to fetch content translation statistics")?;

    let catalog = LanguagePairCatalog::from_stats(
        &response.query.contenttranslationstats.pages,
        u64::from(config.min_translators),
    );
    info!("Found {} language pairs in CX", catalog.pair_count());

    Ok(catalog)
}
