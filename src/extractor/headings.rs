use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;

static HEADING_CLOSE_REGEX: OnceLock<Regex> = OnceLock::new();
static HEADING_SELECTOR: OnceLock<Selector> = OnceLock::new();

fn heading_close_regex() -> &'static Regex {
    HEADING_CLOSE_REGEX.get_or_init(|| Regex::new(r"</h[2-4]").expect("valid regex"))
}

fn heading_selector() -> &'static Selector {
    HEADING_SELECTOR.get_or_init(|| Selector::parse("h2, h3, h4").expect("valid selector"))
}

/// Extract the section title from an HTML fragment.
///
/// Only fragments that close an `h2`, `h3` or `h4` element are parsed. The
/// title is the trimmed text of every such heading, concatenated in document
/// order. Returns `None` when there is no heading or its text is empty.
pub fn extract_heading(html: &str) -> Option<String> {
    if !heading_close_regex().is_match(html) {
        return None;
    }

    let fragment = Html::parse_fragment(html);
    let title: String = fragment
        .select(heading_selector())
        .map(|element| element.text().collect::<String>().trim().to_string())
        .collect();

    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_h2() {
        assert_eq!(extract_heading("<h2>History</h2>"), Some("History".to_string()));
    }

    #[test]
    fn test_extract_h3_and_h4() {
        assert_eq!(extract_heading("<h3> Career </h3>"), Some("Career".to_string()));
        assert_eq!(
            extract_heading("<h4>Awards</h4><p>text</p>"),
            Some("Awards".to_string())
        );
    }

    #[test]
    fn test_nested_markup_text_is_included() {
        let html = r#"<h2 id="mwAQ"><span class="mw-headline">Early <b>life</b></span></h2>"#;
        assert_eq!(extract_heading(html), Some("Early life".to_string()));
    }

    #[test]
    fn test_multiple_headings_are_concatenated() {
        let html = "<h2>Works</h2><p>body</p><h3>Novels</h3>";
        assert_eq!(extract_heading(html), Some("WorksNovels".to_string()));
    }

    #[test]
    fn test_other_heading_levels_ignored() {
        assert_eq!(extract_heading("<h1>Title</h1>"), None);
        assert_eq!(extract_heading("<h5>Minor</h5>"), None);
    }

    #[test]
    fn test_paragraph_only_content() {
        assert_eq!(extract_heading("<p>Just a paragraph</p>"), None);
    }

    #[test]
    fn test_unclosed_heading_is_not_parsed() {
        assert_eq!(extract_heading("<h2>History"), None);
    }

    #[test]
    fn test_whitespace_only_heading() {
        assert_eq!(extract_heading("<h2>   </h2>"), None);
    }

    #[test]
    fn test_entities_are_decoded() {
        assert_eq!(
            extract_heading("<h2>Arts &amp; culture</h2>"),
            Some("Arts & culture".to_string())
        );
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(extract_heading(""), None);
    }
}
