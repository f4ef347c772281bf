use super::corpus::CorpusRecord;
use super::headings::extract_heading;
use crate::db::TitleKey;

/// Progress of heading capture within one corpus record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionState {
    AwaitingSource,
    AwaitingTarget {
        source_header: String,
    },
    Complete {
        source_header: String,
        target_header: String,
    },
}

/// Per-record accumulator; a new one is built for every record
#[derive(Debug, Clone)]
pub struct CorpusSection {
    source_language: Option<String>,
    target_language: Option<String>,
    state: SectionState,
}

impl CorpusSection {
    pub fn new(source_language: Option<String>, target_language: Option<String>) -> Self {
        Self {
            source_language,
            target_language,
            state: SectionState::AwaitingSource,
        }
    }

    /// Run a whole record through the tracker: source content first, then target content
    pub fn from_record(record: CorpusRecord) -> Self {
        let mut section = Self::new(record.source_language, record.target_language);
        if let Some(content) = record.source.and_then(|doc| doc.content) {
            section.observe_source(&content);
        }
        if let Some(content) = record.target.and_then(|doc| doc.content) {
            section.observe_target(&content);
        }
        section
    }

    pub fn state(&self) -> &SectionState {
        &self.state
    }

    /// Capture the source heading. Ignored unless the tracker still awaits it.
    pub fn observe_source(&mut self, html: &str) {
        if self.state != SectionState::AwaitingSource {
            return;
        }
        if let Some(source_header) = extract_heading(html) {
            self.state = SectionState::AwaitingTarget { source_header };
        }
    }

    /// Capture the target heading. A heading identical to the source heading is rejected.
    pub fn observe_target(&mut self, html: &str) {
        let SectionState::AwaitingTarget { source_header } = &self.state else {
            return;
        };
        let Some(target_header) = extract_heading(html) else {
            return;
        };
        if &target_header == source_header {
            return;
        }

        let source_header = source_header.clone();
        self.state = SectionState::Complete {
            source_header,
            target_header,
        };
    }

    /// The title pair, when both headings were captured and both languages are known
    pub fn into_title_key(self) -> Option<TitleKey> {
        match self.state {
            SectionState::Complete {
                source_header,
                target_header,
            } => Some(TitleKey {
                source_language: self.source_language?,
                target_language: self.target_language?,
                source_title: source_header,
                target_title: target_header,
            }),
            _ => None,
        }
    }
}
