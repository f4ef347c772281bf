//! Section title extraction from content translation corpus dumps.
//!
//! Each dump shard is a JSON array of translated sections. Sections whose
//! source and target HTML both carry a heading give one (source title,
//! target title) observation, counted in the `titles` table.
//!
//! Shards are consumed: a shard is deleted once its rows are committed, so a
//! rerun only sees shards that failed or arrived since.

mod corpus;
mod headings;
mod section;

pub use corpus::{stream_records, CorpusDocument, CorpusError, CorpusRecord};
pub use headings::extract_heading;
pub use section::{CorpusSection, SectionState};

use crate::db::TitleStore;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const CORPUS_FILE_PATTERN: &str = "cx-corpora.*.html.json";

/// Totals for one extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files_processed: usize,
    pub files_skipped: usize,
    pub records: usize,
    /// Title pairs inserted or updated
    pub pairs: usize,
}

#[derive(Debug, Clone, Copy)]
struct ShardStats {
    records: usize,
    pairs: usize,
}

/// Corpus shards anywhere below `input_dir`, in sorted order
pub fn find_corpus_files(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let dir = input_dir
        .to_str()
        .with_context(|| format!("Corpus directory is not valid UTF-8: {}", input_dir.display()))?;
    let pattern = format!(
        "{}/**/{}",
        glob::Pattern::escape(dir.trim_end_matches('/')),
        CORPUS_FILE_PATTERN
    );

    let mut files = glob::glob(&pattern)
        .with_context(|| format!("Invalid corpus file pattern: {}", pattern))?
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to list corpus files")?;
    files.sort();

    Ok(files)
}

/// Extract title pairs from every shard below `input_dir` into `store`.
///
/// Every shard is committed in its own transaction and then deleted. A shard
/// that is not valid JSON is rolled back, logged and left in place. Database
/// and filesystem errors abort the run.
pub fn run(input_dir: &Path, store: &mut TitleStore) -> Result<ExtractSummary> {
    let files = find_corpus_files(input_dir)?;
    info!("Found {} corpus files in {}", files.len(), input_dir.display());

    let mut summary = ExtractSummary::default();

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        info!("Reading {}", name);

        match extract_shard(&path, store) {
            Ok(stats) => {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                summary.files_processed += 1;
                summary.records += stats.records;
                summary.pairs += stats.pairs;
                info!("Inserted {} items", stats.pairs);
            }
            Err(CorpusError::Malformed(e)) if !e.is_io() => {
                error!(
                    file = %path.display(),
                    line = e.line(),
                    column = e.column(),
                    "Invalid JSON {}: {}",
                    name,
                    e
                );
                summary.files_skipped += 1;
            }
            Err(CorpusError::Malformed(e)) => {
                return Err(anyhow::Error::new(e).context(format!("Failed to read {}", path.display())));
            }
            Err(CorpusError::Sink(e)) => {
                return Err(e.context(format!("Failed to extract titles from {}", path.display())));
            }
        }
    }

    info!(
        "Extraction complete: {} files processed, {} skipped, {} title pairs",
        summary.files_processed, summary.files_skipped, summary.pairs
    );

    Ok(summary)
}

fn extract_shard(path: &Path, store: &mut TitleStore) -> Result<ShardStats, CorpusError> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let batch = store.begin()?;
    let mut pairs = 0;

    let records = stream_records(BufReader::new(file), |record| {
        if let Some(key) = CorpusSection::from_record(record).into_title_key() {
            batch.upsert(&key)?;
            pairs += 1;
        }
        Ok(())
    })?;

    batch.commit()?;
    Ok(ShardStats { records, pairs })
}
