//! Tag normalization: deduplication, year resolution, and decade tags.
//!
//! Turns a raw collection of tag strings (crawled tag anchors, year
//! sentinels, previously stored tags, stale decade tags) into a canonical
//! tag list plus a resolved year.
//!
//! # Algorithm
//!
//! 1. Deduplicate the raw input, keeping first-seen order.
//! 2. Resolve the year from the first `year:<digits>` sentinel. Without a
//!    sentinel the caller's fallback year is used (the edit path parses a
//!    user-supplied year string instead).
//! 3. Drop every year sentinel and every decade-pattern tag. A decade
//!    pattern is exactly four ASCII digits followed by `s` (`"1980s"`).
//!    Shorter forms such as `"80s"` are ordinary genre tags and are kept.
//! 4. If the year is positive, append `"<decade>s"` unless already present.
//!
//! Normalizing is idempotent: feeding the output tags and year back in
//! yields the same output, so re-running an enrichment batch is safe.
//!
//! # Example
//!
//! ```rust
//! use spindle_core::tags::normalize;
//!
//! let raw: Vec<String> = ["Rock", "Rock", "year:2001", "Pop"]
//!     .iter()
//!     .map(|s| s.to_string())
//!     .collect();
//! let facts = normalize(&raw, 0);
//! assert_eq!(facts.tags, vec!["Rock", "Pop", "2000s"]);
//! assert_eq!(facts.year, 2001);
//! ```

use std::collections::HashSet;

use tracing::warn;

use crate::models::{NormalizedFacts, YEAR_SENTINEL};

/// Normalize raw tag candidates gathered by a crawl.
///
/// The first valid year sentinel wins; `fallback_year` is used when no
/// sentinel parses.
pub fn normalize(raw: &[String], fallback_year: i32) -> NormalizedFacts {
    let deduped = dedup(raw);
    let year = deduped
        .iter()
        .find_map(|tag| parse_year_sentinel(tag))
        .unwrap_or(fallback_year);
    NormalizedFacts {
        tags: canonical_tags(&deduped, year),
        year,
    }
}

/// Renormalize a release's stored tags after a user edits its year.
///
/// `year_input` is taken verbatim from the user. Anything that is not a
/// plain decimal number resolves to `0` with a warning rather than an
/// error, and the stale decade tag is dropped without a replacement.
pub fn normalize_edit(current: &[String], year_input: &str) -> NormalizedFacts {
    let trimmed = year_input.trim();
    let year = match parse_digits(trimmed) {
        Some(year) => year,
        None => {
            if !trimmed.is_empty() {
                warn!(input = trimmed, "invalid year input, storing 0");
            }
            0
        }
    };
    let deduped = dedup(current);
    NormalizedFacts {
        tags: canonical_tags(&deduped, year),
        year,
    }
}

/// Returns true for stored decade tags such as `"1990s"`.
pub fn is_decade_tag(tag: &str) -> bool {
    match tag.strip_suffix('s') {
        Some(prefix) => prefix.len() == 4 && prefix.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// The decade tag for a year (`1994` → `"1990s"`), or `None` for unknown years.
pub fn decade_tag(year: i32) -> Option<String> {
    if year > 0 {
        Some(format!("{}s", year / 10 * 10))
    } else {
        None
    }
}

/// Parses `"year:<digits>"`. Signs, whitespace, and fractions are rejected.
pub fn parse_year_sentinel(tag: &str) -> Option<i32> {
    tag.strip_prefix(YEAR_SENTINEL).and_then(parse_digits)
}

fn is_year_sentinel(tag: &str) -> bool {
    tag.starts_with(YEAR_SENTINEL)
}

fn parse_digits(s: &str) -> Option<i32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn dedup(raw: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(String::as_str)
        .filter(|tag| seen.insert(*tag))
        .collect()
}

fn canonical_tags(deduped: &[&str], year: i32) -> Vec<String> {
    let mut tags: Vec<String> = deduped
        .iter()
        .filter(|tag| !is_year_sentinel(tag) && !is_decade_tag(tag))
        .map(|tag| tag.to_string())
        .collect();

    if let Some(decade) = decade_tag(year) {
        if !tags.contains(&decade) {
            tags.push(decade);
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dedup_year_and_decade() {
        let facts = normalize(&strings(&["Rock", "Rock", "year:2001", "Pop"]), 0);
        assert_eq!(facts.tags, strings(&["Rock", "Pop", "2000s"]));
        assert_eq!(facts.year, 2001);
    }

    #[test]
    fn test_decade_for_1994() {
        let facts = normalize(&strings(&["Grunge", "year:1994"]), 0);
        assert!(facts.tags.contains(&"1990s".to_string()));
        assert_eq!(facts.year, 1994);
    }

    #[test]
    fn test_year_zero_adds_no_decade() {
        let facts = normalize(&strings(&["Jazz"]), 0);
        assert_eq!(facts.tags, strings(&["Jazz"]));
        assert_eq!(facts.year, 0);
    }

    #[test]
    fn test_stale_decade_is_replaced() {
        let facts = normalize(&strings(&["1980s", "Synthpop", "year:1994"]), 0);
        assert_eq!(facts.tags, strings(&["Synthpop", "1990s"]));
    }

    #[test]
    fn test_short_decade_tag_is_kept() {
        let facts = normalize(&strings(&["80s", "year:1984"]), 0);
        assert_eq!(facts.tags, strings(&["80s", "1980s"]));
    }

    #[test]
    fn test_decade_pattern_boundary() {
        assert!(is_decade_tag("1980s"));
        assert!(is_decade_tag("2010s"));
        assert!(!is_decade_tag("80s"));
        assert!(!is_decade_tag("980s"));
        assert!(!is_decade_tag("19800s"));
        assert!(!is_decade_tag("1980"));
        assert!(!is_decade_tag("19a0s"));
        assert!(!is_decade_tag("s"));
    }

    #[test]
    fn test_first_valid_sentinel_wins() {
        let facts = normalize(&strings(&["year:abc", "year:1971", "year:1999"]), 0);
        assert_eq!(facts.year, 1971);
        assert_eq!(facts.tags, strings(&["1970s"]));
    }

    #[test]
    fn test_signed_sentinel_is_rejected() {
        assert_eq!(parse_year_sentinel("year:-1994"), None);
        assert_eq!(parse_year_sentinel("year:+1994"), None);
        assert_eq!(parse_year_sentinel("year:19.94"), None);
        assert_eq!(parse_year_sentinel("year:1994"), Some(1994));
    }

    #[test]
    fn test_fallback_year_used_without_sentinel() {
        let facts = normalize(&strings(&["Soul"]), 1968);
        assert_eq!(facts.year, 1968);
        assert_eq!(facts.tags, strings(&["Soul", "1960s"]));
    }

    #[test]
    fn test_existing_decade_not_duplicated() {
        let facts = normalize(&strings(&["1990s", "Rock", "year:1991"]), 0);
        assert_eq!(facts.tags, strings(&["Rock", "1990s"]));
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            (strings(&["Rock", "Rock", "year:2001", "Pop"]), 0),
            (strings(&["1980s", "80s", "Synthpop", "year:1994"]), 0),
            (strings(&["Ambient", "1970s"]), 0),
            (strings(&["Folk"]), 1965),
            (strings(&[]), 0),
        ];
        for (raw, fallback) in inputs {
            let once = normalize(&raw, fallback);
            let twice = normalize(&once.tags, once.year);
            assert_eq!(once, twice, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_edit_renormalizes_decade() {
        let facts = normalize_edit(&strings(&["Rock", "1990s"]), " 2003 ");
        assert_eq!(facts.year, 2003);
        assert_eq!(facts.tags, strings(&["Rock", "2000s"]));
    }

    #[test]
    fn test_edit_invalid_year_is_zero() {
        let facts = normalize_edit(&strings(&["Rock", "1990s"]), "nineteen");
        assert_eq!(facts.year, 0);
        assert_eq!(facts.tags, strings(&["Rock"]));
    }

    #[test]
    fn test_edit_ignores_stored_sentinels() {
        let facts = normalize_edit(&strings(&["year:1950", "Blues"]), "1962");
        assert_eq!(facts.year, 1962);
        assert_eq!(facts.tags, strings(&["Blues", "1960s"]));
    }
}
