//! Release filters for catalog listings and search.
//!
//! Text comparisons are case- and accent-insensitive: both sides are
//! folded to NFD, stripped of combining marks and lowercased, so `"bjork"`
//! finds `"Björk"`.
//!
//! An artist filter is split on `/` and matches a release whose artist
//! contains any of the pieces, so `"Lennon/Ono"` lists releases by either.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::Release;

/// Which releases a listing returns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReleaseFilter {
    #[default]
    All,
    /// Missing a year, tags, or a cover image.
    NeedsEnrichment,
    /// On the wish list.
    Wanted,
    Year(i32),
    /// Exact tag match.
    Tag(String),
    /// Any `/`-separated piece contained in the artist.
    Artist(String),
    /// Substring of the title, the artist, or the year.
    Search(String),
}

impl ReleaseFilter {
    pub fn matches(&self, release: &Release) -> bool {
        match self {
            ReleaseFilter::All => true,
            ReleaseFilter::NeedsEnrichment => !release.is_fully_enriched(),
            ReleaseFilter::Wanted => release.wanted,
            ReleaseFilter::Year(year) => release.year == *year,
            ReleaseFilter::Tag(tag) => release.tags.iter().any(|t| t == tag),
            ReleaseFilter::Artist(query) => {
                let artist = fold(&release.artist);
                artist_pieces(query).any(|piece| artist.contains(&piece))
            }
            ReleaseFilter::Search(query) => {
                let needle = fold(query.trim());
                if needle.is_empty() {
                    return true;
                }
                fold(&release.title).contains(&needle)
                    || fold(&release.artist).contains(&needle)
                    || (release.year > 0 && release.year.to_string().contains(&needle))
            }
        }
    }

    /// Human-readable heading for a filtered listing.
    pub fn describe(&self) -> String {
        match self {
            ReleaseFilter::All => "All releases".to_string(),
            ReleaseFilter::NeedsEnrichment => "Releases needing enrichment".to_string(),
            ReleaseFilter::Wanted => "Wanted releases".to_string(),
            ReleaseFilter::Year(year) => format!("Releases from {}", year),
            ReleaseFilter::Tag(tag) => format!("Releases tagged '{}'", tag),
            ReleaseFilter::Artist(artist) => format!("Releases by {}", artist),
            ReleaseFilter::Search(query) => format!("Search results for '{}'", query),
        }
    }
}

/// Case- and accent-insensitive form of `s`.
pub fn fold(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

fn artist_pieces(query: &str) -> impl Iterator<Item = String> + '_ {
    query
        .split('/')
        .map(|p| fold(p.trim()))
        .filter(|p| !p.is_empty())
}
