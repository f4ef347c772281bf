//! Fill alignment gaps for frequent English section titles with machine translation.
//!
//! Titles that are common in English but have no alignment yet for a target
//! language are sent through the first MT service cxserver offers for the pair.

use crate::config::Config;
use crate::db::{TitleKey, TitleStore};
use crate::http::{get_json, post_json};
use crate::retry::RetryConfig;
use anyhow::{Context, Result};
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Frequency recorded for MT computed alignments, between rare and very common human alignments
pub const MT_ALIGNED_FREQUENCY: i64 = 100;

pub const ALIGNMENT_SOURCE_LANGUAGE: &str = "en";

const FREQUENT_TITLE_LIMIT: usize = 200;
const TARGET_LANGUAGE_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
struct MtServices {
    #[serde(default)]
    mt: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    contents: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignSummary {
    pub language_pairs: usize,
    pub titles: usize,
}

/// Client for the cxserver MT listing and translation endpoints
pub struct MtClient<'a> {
    client: &'a reqwest::Client,
    base_url: &'a str,
    retry: RetryConfig,
}

impl<'a> MtClient<'a> {
    pub fn new(client: &'a reqwest::Client, config: &'a Config) -> Self {
        Self {
            client,
            base_url: &config.cxserver_url,
            retry: RetryConfig::with_attempts(config.http_max_attempts),
        }
    }

    /// MT services available for the pair, preferred service first
    pub async fn services(&self, source_language: &str, target_language: &str) -> Result<Vec<String>> {
        let url = format!("{}/v2/list/mt/{}/{}", self.base_url, source_language, target_language);
        let services: MtServices = get_json(self.client, &url, &self.retry)
            .await
            .with_context(|| format!("Failed to list MT services for {}->{}", source_language, target_language))?;
        Ok(services.mt)
    }

    /// Translate plain text and return the text content of the translated HTML
    pub async fn translate(
        &self,
        service: &str,
        source_language: &str,
        target_language: &str,
        text: &str,
    ) -> Result<String> {
        let url = format!(
            "{}/v2/mt/{}/{}/{}",
            self.base_url, source_language, target_language, service
        );
        let response: TranslateResponse =
            post_json(self.client, &url, &TranslateRequest { html: text }, &self.retry)
                .await
                .with_context(|| format!("[{}] failed to translate {:?}", service, text))?;

        Ok(html_to_text(&response.contents))
    }
}

fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.trim().to_string()
}

/// Align frequent English titles that have no alignment yet in each target language
pub async fn run(client: &reqwest::Client, config: &Config, store: &mut TitleStore) -> Result<AlignSummary> {
    let mt = MtClient::new(client, config);

    let frequent = store.frequent_source_titles(ALIGNMENT_SOURCE_LANGUAGE, FREQUENT_TITLE_LIMIT)?;
    info!("Found {} frequent section titles", frequent.len());

    let target_languages: Vec<String> = store
        .target_languages(TARGET_LANGUAGE_LIMIT)?
        .into_iter()
        .filter(|language| language != ALIGNMENT_SOURCE_LANGUAGE)
        .collect();
    info!("Found {} target languages", target_languages.len());

    let mut summary = AlignSummary::default();

    for target_language in &target_languages {
        let aligned =
            store.aligned_source_titles(ALIGNMENT_SOURCE_LANGUAGE, target_language, &frequent)?;
        let missing: Vec<&String> = frequent.iter().filter(|t| !aligned.contains(*t)).collect();
        info!(
            "Missing titles for {} -> {}: {}",
            ALIGNMENT_SOURCE_LANGUAGE,
            target_language,
            missing.len()
        );
        if missing.is_empty() {
            continue;
        }

        let services = mt.services(ALIGNMENT_SOURCE_LANGUAGE, target_language).await?;
        let Some(service) = services.first() else {
            continue;
        };

        let alignment = translate_titles(&mt, service, target_language, &missing).await;
        info!(
            "[{}] {}->{} aligned {} titles",
            service,
            ALIGNMENT_SOURCE_LANGUAGE,
            target_language,
            alignment.len()
        );
        if alignment.is_empty() {
            continue;
        }

        let batch = store.begin()?;
        for (source_title, target_title) in &alignment {
            let key = TitleKey::new(
                ALIGNMENT_SOURCE_LANGUAGE,
                target_language.as_str(),
                source_title.as_str(),
                target_title.as_str(),
            );
            batch.insert(&key, MT_ALIGNED_FREQUENCY)?;
        }
        batch.commit()?;

        summary.language_pairs += 1;
        summary.titles += alignment.len();
    }

    Ok(summary)
}

/// Translations that differ from their source. The first failed request ends the pair.
async fn translate_titles(
    mt: &MtClient<'_>,
    service: &str,
    target_language: &str,
    titles: &[&String],
) -> BTreeMap<String, String> {
    let mut alignment = BTreeMap::new();

    for title in titles {
        match mt
            .translate(service, ALIGNMENT_SOURCE_LANGUAGE, target_language, title)
            .await
        {
            Ok(translation) => {
                if !translation.is_empty() && translation != **title {
                    alignment.insert((*title).clone(), translation);
                }
            }
            Err(e) => {
                warn!(
                    "{}->{}: stopping after MT failure: {:#}",
                    ALIGNMENT_SOURCE_LANGUAGE, target_language, e
                );
                break;
            }
        }
    }

    alignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::{
        matchers::{body_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn seed_store(dir: &TempDir) -> TitleStore {
        let mut store = TitleStore::recreate(dir.path().join("section-titles.db")).expect("store");
        let batch = store.begin().expect("begin");
        for (target, source_title, target_title) in [
            ("fr", "History", "Histoire"),
            ("es", "History", "Historia"),
            ("es", "Career", "Carrera"),
        ] {
            batch
                .insert(&TitleKey::new("en", target, source_title, target_title), 3)
                .expect("insert");
        }
        batch.commit().expect("commit");
        store
    }

    fn config_for(server: &MockServer) -> Config {
        Config {
            cxserver_url: server.uri(),
            ..Config::default()
        }
    }

    #[test]
    fn test_html_to_text() {
        assert_eq!(html_to_text("<div><span>Carrière</span></div>"), "Carrière");
        assert_eq!(html_to_text(" Plain "), "Plain");
    }

    #[tokio::test]
    async fn test_run_fills_missing_alignment() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/list/mt/en/fr"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sourceLanguage": "en", "targetLanguage": "fr", "mt": ["MinT", "Google"]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/mt/en/fr/MinT"))
            .and(body_json(serde_json::json!({"html": "Career"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"contents": "<div>Carrière</div>"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let temp_dir = TempDir::new().expect("temp dir");
        let mut store = seed_store(&temp_dir);
        let config = config_for(&mock_server);
        let client = crate::http::build_client(&config).expect("client");

        let summary = run(&client, &config, &mut store).await.expect("run");

        assert_eq!(summary, AlignSummary { language_pairs: 1, titles: 1 });
        assert_eq!(
            store
                .frequency(&TitleKey::new("en", "fr", "Career", "Carrière"))
                .expect("lookup"),
            Some(MT_ALIGNED_FREQUENCY)
        );
    }

    #[tokio::test]
    async fn test_run_skips_pair_without_service() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/list/mt/en/fr"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"mt": []})))
            .mount(&mock_server)
            .await;

        let temp_dir = TempDir::new().expect("temp dir");
        let mut store = seed_store(&temp_dir);
        let config = config_for(&mock_server);
        let client = crate::http::build_client(&config).expect("client");

        let summary = run(&client, &config, &mut store).await.expect("run");

        assert_eq!(summary, AlignSummary::default());
        assert_eq!(store.count().expect("count"), 3);
    }

    #[tokio::test]
    async fn test_untranslated_title_is_not_stored() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/list/mt/en/fr"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"mt": ["Apertium"]})))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/mt/en/fr/Apertium"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"contents": "Career"})))
            .mount(&mock_server)
            .await;

        let temp_dir = TempDir::new().expect("temp dir");
        let mut store = seed_store(&temp_dir);
        let config = config_for(&mock_server);
        let client = crate::http::build_client(&config).expect("client");

        let summary = run(&client, &config, &mut store).await.expect("run");

        assert_eq!(summary.titles, 0);
        assert!(store
            .frequency(&TitleKey::new("en", "fr", "Career", "Career"))
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn test_translation_failure_skips_pair() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/list/mt/en/fr"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"mt": ["Google"]})))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/mt/en/fr/Google"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Authorization header is missing"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let temp_dir = TempDir::new().expect("temp dir");
        let mut store = seed_store(&temp_dir);
        let config = config_for(&mock_server);
        let client = crate::http::build_client(&config).expect("client");

        let summary = run(&client, &config, &mut store).await.expect("run");

        assert_eq!(summary, AlignSummary::default());
    }
}
