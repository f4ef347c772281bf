use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::io::Read;
use thiserror::Error;
use tracing::debug;

/// One element of a `cx-corpora.*.html.json` dump.
///
/// Dumps are not strictly typed: a field of an unexpected JSON type reads as
/// absent instead of failing the whole shard.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub source_language: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub target_language: Option<String>,
    #[serde(default, deserialize_with = "lenient_document")]
    pub source: Option<CorpusDocument>,
    #[serde(default, deserialize_with = "lenient_document")]
    pub target: Option<CorpusDocument>,
}

/// The `source` / `target` object of a record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorpusDocument {
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

fn lenient_document<'de, D>(deserializer: D) -> Result<Option<CorpusDocument>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => Ok(CorpusDocument::deserialize(value).ok()),
        _ => Ok(None),
    }
}

#[derive(Error, Debug)]
pub enum CorpusError {
    /// The shard is not a well-formed array of records
    #[error("malformed corpus JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The record handler failed; the shard itself may be fine
    #[error(transparent)]
    Sink(#[from] anyhow::Error),
}

struct RecordVisitor<'a, F> {
    sink: &'a mut F,
    failure: &'a mut Option<anyhow::Error>,
}

impl<'de, F> Visitor<'de> for RecordVisitor<'_, F>
where
    F: FnMut(CorpusRecord) -> anyhow::Result<()>,
{
    type Value = usize;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an array of corpus records")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<usize, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut count = 0;
        while let Some(element) = seq.next_element::<serde_json::Value>()? {
            count += 1;
            if !element.is_object() {
                debug!("Skipping non-object corpus element #{}", count);
                continue;
            }
            let record = match CorpusRecord::deserialize(element) {
                Ok(record) => record,
                Err(e) => {
                    debug!("Skipping unreadable corpus element #{}: {}", count, e);
                    continue;
                }
            };
            if let Err(e) = (self.sink)(record) {
                *self.failure = Some(e);
                return Err(de::Error::custom("record handler failed"));
            }
        }
        Ok(count)
    }
}

/// Stream the records of a JSON array to `sink`, one at a time.
///
/// Only the record being handled is held in memory. Returns the number of
/// array elements seen; elements that are not objects are skipped. Records
/// handed to `sink` before a syntax error are not undone here; callers wrap
/// the stream in a transaction.
pub fn stream_records<R, F>(reader: R, mut sink: F) -> Result<usize, CorpusError>
where
    R: Read,
    F: FnMut(CorpusRecord) -> anyhow::Result<()>,
{
    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    let mut failure = None;

    let result = (&mut deserializer).deserialize_seq(RecordVisitor {
        sink: &mut sink,
        failure: &mut failure,
    });

    match result {
        Ok(count) => {
            deserializer.end().map_err(CorpusError::Malformed)?;
            Ok(count)
        }
        Err(e) => Err(match failure {
            Some(sink_error) => CorpusError::Sink(sink_error),
            None => CorpusError::Malformed(e),
        }),
    }
}
