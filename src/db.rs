use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Transaction};
use std::collections::HashSet;
use std::path::Path;

const CREATE_TITLES_TABLE: &str = "CREATE TABLE IF NOT EXISTS titles (
        source_language TEXT,
        target_language TEXT,
        source_title TEXT,
        target_title TEXT,
        frequency INTEGER
    )";

const CREATE_TITLES_INDEX: &str = "CREATE INDEX IF NOT EXISTS title_source_target
        ON titles (source_language, target_language)";

/// Identity of a section title alignment row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TitleKey {
    pub source_language: String,
    pub target_language: String,
    pub source_title: String,
    pub target_title: String,
}

impl TitleKey {
    pub fn new(
        source_language: impl Into<String>,
        target_language: impl Into<String>,
        source_title: impl Into<String>,
        target_title: impl Into<String>,
    ) -> Self {
        Self {
            source_language: source_language.into(),
            target_language: target_language.into(),
            source_title: source_title.into(),
            target_title: target_title.into(),
        }
    }
}

/// A persisted row of the `titles` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitlePair {
    pub source_language: String,
    pub target_language: String,
    pub source_title: String,
    pub target_title: String,
    pub frequency: i64,
}

/// The section title database shared by the extractor, importer and MT aligner
pub struct TitleStore {
    conn: Connection,
}

impl TitleStore {
    /// Create the database at `path`, dropping any existing titles table and index
    pub fn recreate(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;

        conn.execute_batch(
            "DROP TABLE IF EXISTS titles;
             DROP INDEX IF EXISTS title_source_target;",
        )
        .context("Failed to drop titles table")?;

        Self::ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an existing database, creating the titles table if it is missing
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open database at {}", path.display()))?;

        Self::ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute(CREATE_TITLES_TABLE, [])
            .context("Failed to create titles table")?;
        conn.execute(CREATE_TITLES_INDEX, [])
            .context("Failed to create title_source_target index")?;
        Ok(())
    }

    /// Start a batch of writes; dropping the batch without committing rolls it back
    pub fn begin(&mut self) -> Result<TitleBatch<'_>> {
        let tx = self
            .conn
            .transaction()
            .context("Failed to start transaction")?;
        Ok(TitleBatch { tx })
    }

    pub fn frequency(&self, key: &TitleKey) -> Result<Option<i64>> {
        lookup_frequency(&self.conn, key)
    }

    /// Total number of rows
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM titles", [], |row| row.get(0))
            .context("Failed to count titles")?;
        Ok(count as usize)
    }

    /// All rows for a language pair, most frequent first
    pub fn pairs(&self, source_language: &str, target_language: &str) -> Result<Vec<TitlePair>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_language, target_language, source_title, target_title, frequency
             FROM titles
             WHERE source_language = ?1 AND target_language = ?2
             ORDER BY frequency DESC, source_title, target_title",
        )?;

        let rows = stmt
            .query_map(params![source_language, target_language], |row| {
                Ok(TitlePair {
                    source_language: row.get(0)?,
                    target_language: row.get(1)?,
                    source_title: row.get(2)?,
                    target_title: row.get(3)?,
                    frequency: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list title pairs")?;

        Ok(rows)
    }

    /// Source titles of `language` ordered by how many rows use them
    pub fn frequent_source_titles(&self, language: &str, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_title, COUNT(source_title) AS occurrences
             FROM titles
             WHERE source_language = ?1
             GROUP BY source_title
             ORDER BY occurrences DESC, source_title
             LIMIT ?2",
        )?;

        let titles = stmt
            .query_map(params![language, limit as i64], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()
            .context("Failed to query frequent source titles")?;

        Ok(titles)
    }

    /// Target languages ordered by number of rows
    pub fn target_languages(&self, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT target_language, COUNT(source_title) AS occurrences
             FROM titles
             GROUP BY target_language
             ORDER BY occurrences DESC, target_language
             LIMIT ?1",
        )?;

        let languages = stmt
            .query_map(params![limit as i64], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()
            .context("Failed to query target languages")?;

        Ok(languages)
    }

    /// The subset of `titles` that already has an alignment for the language pair
    pub fn aligned_source_titles(
        &self,
        source_language: &str,
        target_language: &str,
        titles: &[String],
    ) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT 1 FROM titles
             WHERE source_language = ?1 AND target_language = ?2 AND source_title = ?3
             LIMIT 1",
        )?;

        let mut aligned = HashSet::new();
        for title in titles {
            if stmt.exists(params![source_language, target_language, title])? {
                aligned.insert(title.clone());
            }
        }

        Ok(aligned)
    }
}

/// A transaction over the titles table
pub struct TitleBatch<'a> {
    tx: Transaction<'a>,
}

impl TitleBatch<'_> {
    /// Insert the pair with frequency 1, or increment the existing row. Returns the new frequency.
    pub fn upsert(&self, key: &TitleKey) -> Result<i64> {
        match lookup_frequency(&self.tx, key)? {
            None => {
                self.insert(key, 1)?;
                Ok(1)
            }
            Some(frequency) => {
                let frequency = frequency + 1;
                self.tx
                    .execute(
                        "UPDATE titles SET frequency = ?1
                         WHERE source_language = ?2 AND target_language = ?3
                         AND source_title = ?4 AND target_title = ?5",
                        params![
                            frequency,
                            key.source_language,
                            key.target_language,
                            key.source_title,
                            key.target_title
                        ],
                    )
                    .context("Failed to update title frequency")?;
                Ok(frequency)
            }
        }
    }

    /// Plain insert; an identical existing row is kept and a duplicate added
    pub fn insert(&self, key: &TitleKey, frequency: i64) -> Result<()> {
        self.tx
            .execute(
                "INSERT INTO titles VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    key.source_language,
                    key.target_language,
                    key.source_title,
                    key.target_title,
                    frequency
                ],
            )
            .context("Failed to insert title pair")?;
        Ok(())
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit().context("Failed to commit transaction")
    }
}

fn lookup_frequency(conn: &Connection, key: &TitleKey) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT frequency FROM titles
         WHERE source_language = ?1 AND target_language = ?2
         AND source_title = ?3 AND target_title = ?4",
        params![
            key.source_language,
            key.target_language,
            key.source_title,
            key.target_title
        ],
        |row| row.get(0),
    )
    .optional()
    .context("Failed to look up title frequency")
}

/// Read-only view of an externally produced alignment database.
///
/// Its `titles` table carries `rank` and `probability` columns and uses wiki
/// database names (`enwiki`) as language identifiers.
pub struct AlignmentSource {
    conn: Connection,
}

impl AlignmentSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open alignment database at {}", path.display()))?;
        Ok(Self { conn })
    }

    /// Confident alignments for a language pair, in table order
    pub fn section_titles(
        &self,
        source_language: &str,
        target_language: &str,
        max_rank: i64,
    ) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT source_title, target_title
                 FROM titles
                 WHERE source_language = ?1
                 AND target_language = ?2
                 AND rank <= ?3
                 AND source_title != ''
                 AND target_title != ''
                 AND probability > 0.6
                 AND source_title != target_title",
            )
            .context("Failed to prepare alignment query")?;

        let rows = stmt
            .query_map(
                params![
                    format!("{}wiki", source_language),
                    format!("{}wiki", target_language),
                    max_rank
                ],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| {
                format!(
                    "Failed to read alignments for {}->{}",
                    source_language, target_language
                )
            })?;

        Ok(rows)
    }
}
