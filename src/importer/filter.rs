use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

static SPECIAL_CHARS_REGEX: OnceLock<Regex> = OnceLock::new();
static NUMERIC_TITLE_REGEX: OnceLock<Regex> = OnceLock::new();

fn special_chars_regex() -> &'static Regex {
    SPECIAL_CHARS_REGEX.get_or_init(|| Regex::new(r#"[,:\[\]<>\-'\\/"+]"#).expect("valid regex"))
}

fn numeric_title_regex() -> &'static Regex {
    NUMERIC_TITLE_REGEX.get_or_init(|| Regex::new(r#"^[0-9:\-()\s"]+$"#).expect("valid regex"))
}

/// Titles with punctuation or brackets are rare and usually noise; purely
/// numeric titles come from list articles.
pub fn is_acceptable_title(title: &str) -> bool {
    !special_chars_regex().is_match(title) && !numeric_title_regex().is_match(title)
}

/// Filter alignment rows and map each source title to a single target title.
///
/// When a source title appears more than once the last row wins. The result
/// is keyed (and iterated) by source title.
pub fn select_alignments<I>(rows: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut mapping = BTreeMap::new();
    for (source_title, target_title) in rows {
        if !is_acceptable_title(&source_title) || !is_acceptable_title(&target_title) {
            continue;
        }
        mapping.insert(source_title, target_title);
    }
    mapping
}
