//! Core data models used throughout spindle.
//!
//! These types represent the catalog rows and the ephemeral crawl facts
//! that flow through the enrichment pipeline.

use serde::Serialize;

/// Sentinel prefix marking a raw fact as a year observation (`"year:1994"`).
pub const YEAR_SENTINEL: &str = "year:";

/// One catalog entry (an album or recording) as stored by the release store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
    /// Stable internal identifier.
    pub id: i64,
    /// Identifier on the external catalog. Correlates crawl events and
    /// names the cover image file.
    pub external_id: i64,
    pub artist: String,
    pub title: String,
    /// `0` means unknown.
    pub year: i32,
    /// Empty when the stored column is NULL or an empty array.
    pub tags: Vec<String>,
    /// Empty when no cover image has been stored yet.
    pub cover_image_path: String,
    /// On the wish list rather than owned.
    pub wanted: bool,
}

impl Release {
    /// A release is fully enriched once it has a cover image, at least one
    /// tag, and a known year. Fully enriched releases are never crawled.
    pub fn is_fully_enriched(&self) -> bool {
        !self.cover_image_path.is_empty() && !self.tags.is_empty() && self.year != 0
    }

    /// Short human-readable label used in run logs.
    pub fn label(&self) -> String {
        format!(
            "release {} ({} - {}, external id {})",
            self.id,
            self.artist.trim(),
            self.title.trim(),
            self.external_id
        )
    }
}

/// Fields needed to insert (or refresh) a release row.
#[derive(Debug, Clone, Default)]
pub struct NewRelease {
    pub external_id: i64,
    pub artist: String,
    pub title: String,
    pub year: i32,
    pub tags: Vec<String>,
    pub wanted: bool,
}

/// Raw tag candidates gathered from one release's page during a crawl.
///
/// Entries are either plain tags or year sentinels (`"year:<N>"`).
/// Duplicates are expected; the tag normalizer resolves them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFactSet {
    facts: Vec<String>,
}

impl RawFactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_tag(&mut self, tag: impl Into<String>) {
        self.facts.push(tag.into());
    }

    pub fn push_year(&mut self, year: i32) {
        self.facts.push(format!("{}{}", YEAR_SENTINEL, year));
    }

    pub fn extend(&mut self, other: RawFactSet) {
        self.facts.extend(other.facts);
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.facts
    }

    pub fn into_vec(self) -> Vec<String> {
        self.facts
    }
}

/// Output of the tag normalizer: canonical tags plus the resolved year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFacts {
    pub tags: Vec<String>,
    pub year: i32,
}

/// Column a release listing is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Title,
    Artist,
    Year,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::Artist => "artist",
            SortField::Year => "year",
        }
    }
}

/// Sanitized ordering for release listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListOrder {
    pub field: SortField,
    pub descending: bool,
}

impl ListOrder {
    /// Parse user-supplied ordering. Unknown fields fall back to title and
    /// unknown directions fall back to ascending.
    pub fn parse(field: &str, direction: &str) -> Self {
        let field = match field.trim().to_ascii_lowercase().as_str() {
            "artist" => SortField::Artist,
            "year" => SortField::Year,
            _ => SortField::Title,
        };
        let descending = direction.trim().eq_ignore_ascii_case("desc");
        Self { field, descending }
    }

    pub fn direction(&self) -> &'static str {
        if self.descending {
            "DESC"
        } else {
            "ASC"
        }
    }
}
