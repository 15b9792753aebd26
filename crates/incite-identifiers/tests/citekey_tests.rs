//! Citekey parsing integration tests

use incite_identifiers::{scan_citekeys, Citekey, CitekeyError, Source};
use rstest::rstest;

// === Strict parsing ===

#[rstest]
#[case("doi:10.1038/nature12373", Source::Doi, "10.1038/nature12373")]
#[case("doi:10/gddkbh", Source::Doi, "10/gddkbh")]
#[case("pmid:29424689", Source::Pmid, "29424689")]
#[case("pmcid:PMC4304851", Source::Pmcid, "PMC4304851")]
#[case("arxiv:1806.05726", Source::Arxiv, "1806.05726")]
#[case("arxiv:cond-mat/9901001v2", Source::Arxiv, "cond-mat/9901001v2")]
#[case("isbn:9780306406157", Source::Isbn, "9780306406157")]
#[case("url:https://example.com", Source::Url, "https://example.com")]
#[case("raw:dongbo-conversation", Source::Raw, "dongbo-conversation")]
fn test_parse_recovers_source_and_identifier(
    #[case] input: &str,
    #[case] source: Source,
    #[case] identifier: &str,
) {
    let key = Citekey::parse(input).unwrap();
    assert_eq!(key.source, source);
    assert_eq!(key.identifier, identifier);
}

#[rstest]
#[case("doi:")]
#[case("raw:")]
#[case("pmid:")]
fn test_parse_blank_identifier_is_malformed(#[case] input: &str) {
    assert!(matches!(
        Citekey::parse(input),
        Err(CitekeyError::Malformed { .. })
    ));
}

#[rstest]
#[case("doi:nature12373")] // missing 10. prefix
#[case("pmid:012345")] // leading zero
#[case("pmcid:4304851")] // missing PMC prefix
#[case("arxiv:12345")]
#[case("isbn:0-306-40615-1")] // bad checksum
fn test_parse_invalid_identifier_syntax(#[case] input: &str) {
    assert!(matches!(
        Citekey::parse(input),
        Err(CitekeyError::Malformed { .. })
    ));
}

#[test]
fn test_parse_unknown_source_is_unrecognized() {
    assert!(matches!(
        Citekey::parse("wosid:000288695300001"),
        Err(CitekeyError::UnrecognizedSource { .. })
    ));
}

// === Prefix inference ===

#[rstest]
#[case("tag-without-prefix")]
#[case("bogus:10.1038/nature12373")]
#[case("Smith2008")]
fn test_infer_defaults_to_raw_with_original_string(#[case] input: &str) {
    let key = Citekey::infer(input).unwrap();
    assert_eq!(key.source, Source::Raw);
    assert_eq!(key.identifier, input);
}

#[test]
fn test_infer_accepts_uppercase_prefix() {
    let key = Citekey::infer("PMID:29424689").unwrap();
    assert_eq!(key.to_string(), "pmid:29424689");
}

#[test]
fn test_infer_standardizes_isbn() {
    let key = Citekey::infer("isbn:0-306-40615-2").unwrap();
    assert_eq!(key.to_string(), "isbn:9780306406157");
}

// === Manuscript scanning ===

#[test]
fn test_scan_finds_bracketed_and_bare_citekeys() {
    let text = "Blood vessels [@doi:10.1098/rsif.2017.0387] regulate\n\
                hematopoiesis, as @pmid:29424689 showed.";
    assert_eq!(
        scan_citekeys(text),
        vec!["doi:10.1098/rsif.2017.0387", "pmid:29424689"]
    );
}

#[test]
fn test_scanned_citekeys_parse() {
    let text = "[@doi:10.1098/rsif.2017.0387; @pmid:29424689; @raw:lab-notebook]";
    for raw in scan_citekeys(text) {
        Citekey::infer(&raw).unwrap();
    }
}
