//! Identifier validation functions

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // DOI validation regex
    // https://www.crossref.org/blog/dois-and-matching-regular-expressions/
    static ref DOI_PATTERN: Regex = Regex::new(r"^10\.\d{4,9}/\S+$").unwrap();

    // shortDOI, see http://shortdoi.org
    static ref SHORT_DOI_PATTERN: Regex = Regex::new(r"^10/[a-zA-Z0-9]+$").unwrap();

    // PubMed identifiers are 1-8 digits with no leading zeros
    // https://www.nlm.nih.gov/bsd/mms/medlineelements.html#pmid
    static ref PMID_PATTERN: Regex = Regex::new(r"^[1-9][0-9]{0,7}$").unwrap();

    // PubMed Central identifiers are PMC followed by digits
    static ref PMCID_PATTERN: Regex = Regex::new(r"^PMC[0-9]+$").unwrap();

    // arXiv ID validation regex (new format: YYMM.NNNNN, old format: archive/NNNNNNN)
    static ref ARXIV_NEW_PATTERN: Regex = Regex::new(r"^\d{4}\.\d{4,5}(v\d+)?$").unwrap();
    static ref ARXIV_OLD_PATTERN: Regex = Regex::new(r"^[a-z-]+(\.[a-z-]+)?/\d{7}(v\d+)?$").unwrap();
}

pub fn is_valid_doi(doi: &str) -> bool {
    DOI_PATTERN.is_match(doi)
}

pub fn is_valid_short_doi(doi: &str) -> bool {
    SHORT_DOI_PATTERN.is_match(doi)
}

pub fn is_valid_pmid(pmid: &str) -> bool {
    PMID_PATTERN.is_match(pmid)
}

pub fn is_valid_pmcid(pmcid: &str) -> bool {
    PMCID_PATTERN.is_match(pmcid)
}

pub fn is_valid_arxiv_id(arxiv_id: &str) -> bool {
    ARXIV_NEW_PATTERN.is_match(arxiv_id) || ARXIV_OLD_PATTERN.is_match(arxiv_id)
}

pub fn is_valid_isbn(isbn: &str) -> bool {
    let normalized = normalize_isbn_chars(isbn);
    match normalized.len() {
        10 => validate_isbn10(&normalized),
        13 => validate_isbn13(&normalized),
        _ => false,
    }
}

/// Strip URL prefixes and trailing punctuation from a DOI.
pub fn normalize_doi(doi: &str) -> String {
    let mut result = doi.trim().to_string();

    let prefixes = [
        "https://doi.org/",
        "http://doi.org/",
        "https://dx.doi.org/",
        "http://dx.doi.org/",
        "doi:",
        "DOI:",
    ];

    for prefix in prefixes {
        if let Some(stripped) = result.strip_prefix(prefix) {
            result = stripped.to_string();
            break;
        }
    }

    // Remove trailing punctuation
    while let Some(c) = result.chars().last() {
        if c == '.' || c == ',' || c == ';' {
            result.pop();
        } else {
            break;
        }
    }

    result
}

/// Convert an ISBN-10 or ISBN-13 to hyphenless ISBN-13.
/// Returns None if the input is not a checksum-valid ISBN.
pub fn to_isbn13(isbn: &str) -> Option<String> {
    let normalized = normalize_isbn_chars(isbn);
    match normalized.len() {
        13 if validate_isbn13(&normalized) => Some(normalized),
        10 if validate_isbn10(&normalized) => {
            let mut result = String::from("978");
            result.push_str(&normalized[..9]);
            let sum: u32 = result
                .chars()
                .enumerate()
                .map(|(i, c)| {
                    let value = c.to_digit(10).unwrap_or(0);
                    if i % 2 == 0 {
                        value
                    } else {
                        value * 3
                    }
                })
                .sum();
            let check = (10 - sum % 10) % 10;
            result.push(char::from_digit(check, 10).unwrap_or('0'));
            Some(result)
        }
        _ => None,
    }
}

/// Normalize: remove hyphens and spaces, uppercase the check character
fn normalize_isbn_chars(isbn: &str) -> String {
    isbn.chars()
        .filter(|c| c.is_ascii_digit() || *c == 'X' || *c == 'x')
        .collect::<String>()
        .to_uppercase()
}

/// Validate ISBN-10 checksum
fn validate_isbn10(isbn: &str) -> bool {
    if isbn.len() != 10 {
        return false;
    }

    let chars: Vec<char> = isbn.chars().collect();

    // Check that first 9 are digits and last is digit or X
    for (i, &c) in chars.iter().enumerate() {
        if i < 9 {
            if !c.is_ascii_digit() {
                return false;
            }
        } else if !c.is_ascii_digit() && c != 'X' {
            return false;
        }
    }

    let sum: u32 = chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let value = if c == 'X' {
                10
            } else {
                c.to_digit(10).unwrap_or(0)
            };
            value * (10 - i as u32)
        })
        .sum();

    sum % 11 == 0
}

/// Validate ISBN-13 checksum
fn validate_isbn13(isbn: &str) -> bool {
    if isbn.len() != 13 || !isbn.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let sum: u32 = isbn
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let value = c.to_digit(10).unwrap_or(0);
            if i % 2 == 0 {
                value
            } else {
                value * 3
            }
        })
        .sum();

    sum % 10 == 0
}
