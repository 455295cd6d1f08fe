//! Date mentions in extracted text.
//!
//! Notices and circulars usually state their effective dates in prose. This
//! pass picks out date-like tokens with a fixed set of patterns and keeps a
//! short window of surrounding text so a reader can tell which date matters.

use crate::output::DateMention;
use once_cell::sync::Lazy;
use regex::Regex;

/// Characters of context kept on each side of a match.
pub const CONTEXT_WINDOW: usize = 40;

const MONTH: &str = r"(?:Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|Jun(?:e)?|Jul(?:y)?|Aug(?:ust)?|Sep(?:tember)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)";

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // January 1, 2020 / Jan 1 2020
        Regex::new(&format!(r"\b{MONTH} ?\d{{1,2}},? ?\d{{4}}\b")).unwrap(),
        // 1 Jan 2020
        Regex::new(&format!(r"\b\d{{1,2}} {MONTH} ?\d{{4}}\b")).unwrap(),
        // 01/01/2020, 1/1/20
        Regex::new(r"\b\d{1,2}/\d{1,2}/\d{2,4}\b").unwrap(),
        // 2020-01-01
        Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").unwrap(),
    ]
});

/// Find every date mention in `text`, ordered by position.
///
/// A span matched by more than one pattern is reported once.
pub fn extract_dates(text: &str) -> Vec<DateMention> {
    let mut spans: Vec<(usize, usize)> = DATE_PATTERNS
        .iter()
        .flat_map(|re| re.find_iter(text).map(|m| (m.start(), m.end())))
        .collect();
    spans.sort_unstable();
    spans.dedup();

    spans
        .into_iter()
        .map(|(start, end)| DateMention {
            date: text[start..end].to_string(),
            context: context_around(text, start, end),
        })
        .collect()
}

/// Up to [`CONTEXT_WINDOW`] chars either side of `start..end`, on one line.
fn context_around(text: &str, start: usize, end: usize) -> String {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(CONTEXT_WINDOW - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let to = text[end..]
        .char_indices()
        .nth(CONTEXT_WINDOW)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());

    text[from..to]
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(text: &str) -> Vec<String> {
        extract_dates(text).into_iter().map(|d| d.date).collect()
    }

    #[test]
    fn test_month_name_forms() {
        assert_eq!(dates("effective January 1, 2020 onwards"), ["January 1, 2020"]);
        assert_eq!(dates("from Jan 1 2020."), ["Jan 1 2020"]);
        assert_eq!(dates("dated 28 November 2019"), ["28 November 2019"]);
        assert_eq!(dates("on 3 Sep 2021"), ["3 Sep 2021"]);
    }

    #[test]
    fn test_numeric_forms() {
        assert_eq!(dates("circular of 01/01/2020"), ["01/01/2020"]);
        assert_eq!(dates("circular of 1/1/20"), ["1/1/20"]);
        assert_eq!(dates("version 2019-11-28 final"), ["2019-11-28"]);
    }

    #[test]
    fn test_ordered_by_position() {
        let text = "Issued 2020-03-01, amended on 5 May 2020 and again 06/07/2021.";
        assert_eq!(dates(text), ["2020-03-01", "5 May 2020", "06/07/2021"]);
    }

    #[test]
    fn test_no_dates() {
        assert!(extract_dates("").is_empty());
        assert!(extract_dates("Reserve Bank of India, Mumbai 400001").is_empty());
    }

    #[test]
    fn test_context_window_and_newlines() {
        let text = format!("{}\nOn 1 Jan 2020\nthe rule applies{}", "x".repeat(100), "y".repeat(100));
        let found = extract_dates(&text);
        assert_eq!(found.len(), 1);
        let ctx = &found[0].context;
        assert!(!ctx.contains('\n'));
        assert!(ctx.contains("On 1 Jan 2020 the rule applies"), "got {ctx:?}");
        // 40 chars before the match, 40 after, one newline each side folded.
        assert_eq!(ctx.chars().count(), 40 + "1 Jan 2020".len() + 40);
    }

    #[test]
    fn test_context_respects_char_boundaries() {
        let text = "é".repeat(50) + " 2020-01-01 " + &"ü".repeat(50);
        let found = extract_dates(&text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].context.chars().count(), 40 + 10 + 40);
    }

    #[test]
    fn test_context_at_text_edges() {
        let found = extract_dates("2020-01-01");
        assert_eq!(found[0].context, "2020-01-01");
    }
}
