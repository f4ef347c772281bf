//! Import of machine-learning section title alignments.
//!
//! The alignment dataset scores candidate title pairs between wikis. Confident,
//! clean pairs for language pairs that content translation actually uses are
//! appended to the section title database with a fixed frequency.

mod catalog;
mod filter;

pub use catalog::{fetch_catalog, LanguagePairCatalog, PairStats};
pub use filter::{is_acceptable_title, select_alignments};

use crate::config::Config;
use crate::db::{AlignmentSource, TitleKey, TitleStore};
use anyhow::Result;
use std::path::Path;
use tracing::info;

/// Frequency recorded for imported pairs. It marks a predicted alignment and
/// is not an observation count.
pub const MACHINE_ALIGNED_FREQUENCY: i64 = 1;

/// Only the best ranked candidate per title is imported
pub const ALIGNMENT_MAX_RANK: i64 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub language_pairs: usize,
    pub titles: usize,
}

/// Import alignments from `source_db` into `target_db` for every active language pair
pub async fn run(
    client: &reqwest::Client,
    config: &Config,
    source_db: &Path,
    target_db: &Path,
) -> Result<ImportSummary> {
    let catalog = fetch_catalog(client, config).await?;

    let source = AlignmentSource::open(source_db)?;
    let mut target = TitleStore::open(target_db)?;

    import_catalog(&catalog, &source, &mut target)
}

/// Import every pair of `catalog`; any database error aborts the import
pub fn import_catalog(
    catalog: &LanguagePairCatalog,
    source: &AlignmentSource,
    target: &mut TitleStore,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for (source_language, target_language) in catalog.pairs() {
        let added = import_pair(source, target, source_language, target_language)?;
        info!(
            "{}->{} Added {} section titles",
            source_language, target_language, added
        );
        summary.language_pairs += 1;
        summary.titles += added;
    }

    info!(
        "Import complete: {} section titles across {} language pairs",
        summary.titles, summary.language_pairs
    );

    Ok(summary)
}

/// Import one language pair in a single transaction, returning the number of rows added
pub fn import_pair(
    source: &AlignmentSource,
    target: &mut TitleStore,
    source_language: &str,
    target_language: &str,
) -> Result<usize> {
    let rows = source.section_titles(source_language, target_language, ALIGNMENT_MAX_RANK)?;
    let mapping = select_alignments(rows);

    let batch = target.begin()?;
    for (source_title, target_title) in &mapping {
        let key = TitleKey::new(source_language, target_language, source_title, target_title);
        batch.insert(&key, MACHINE_ALIGNED_FREQUENCY)?;
    }
    batch.commit()?;

    Ok(mapping.len())
}
