//! Citekey scanning in manuscript text
//!
//! Extracts `@citekey` occurrences using the same rules as pandoc, except
//! more permissive in two ways: the final character can be a slash because
//! many URLs end in a slash, and underscores are allowed internally because
//! URLs, DOIs, and citation tags often contain them.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // The leading `@` must not be preceded by a word character. The regex
    // crate has no lookbehind, so the guard consumes one preceding
    // non-word character (or start of text) instead.
    static ref CITEKEY_PATTERN: Regex =
        Regex::new(r"(?:^|[^\w])@([a-zA-Z0-9][\w:.#$%&\-+?<>~/]*[a-zA-Z0-9/])").unwrap();
}

/// Extract citekey strings from manuscript text, deduplicated and in order
/// of first appearance. The leading `@` is not included.
pub fn scan_citekeys(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut citekeys = Vec::new();
    for capture in CITEKEY_PATTERN.captures_iter(text) {
        let citekey = capture[1].to_string();
        if seen.insert(citekey.clone()) {
            citekeys.push(citekey);
        }
    }
    citekeys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_basic() {
        let text = "As shown previously [@doi:10.1038/nature12373].";
        assert_eq!(scan_citekeys(text), vec!["doi:10.1038/nature12373"]);
    }

    #[test]
    fn test_scan_multiple_and_dedup() {
        let text = "See @pmid:29424689 and @arxiv:1806.05726, also @pmid:29424689 again.";
        assert_eq!(
            scan_citekeys(text),
            vec!["pmid:29424689", "arxiv:1806.05726"]
        );
    }

    #[test]
    fn test_scan_ignores_emails() {
        let text = "Contact author@example.com for details.";
        assert!(scan_citekeys(text).is_empty());
    }

    #[test]
    fn test_scan_trailing_punctuation_excluded() {
        let text = "Cited in @doi:10.1098/rsif.2017.0387.";
        assert_eq!(scan_citekeys(text), vec!["doi:10.1098/rsif.2017.0387"]);
    }

    #[test]
    fn test_scan_allows_preceding_at_sign() {
        let text = "(@@raw:tag)";
        assert_eq!(scan_citekeys(text), vec!["raw:tag"]);
    }

    #[test]
    fn test_scan_url_trailing_slash() {
        let text = "(@url:https://example.com/page/)";
        assert_eq!(scan_citekeys(text), vec!["url:https://example.com/page/"]);
    }
}
