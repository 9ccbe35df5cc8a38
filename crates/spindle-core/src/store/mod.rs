//! Storage abstraction for spindle.
//!
//! The [`ReleaseStore`] trait is the only way the enrichment pipeline and
//! the catalog commands touch persisted releases, enabling pluggable
//! backends (SQLite in the `spindle` crate, in-memory here).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::filter::ReleaseFilter;
use crate::models::{ListOrder, NewRelease, Release};
use crate::stats::CollectionStats;

/// Abstract release storage.
///
/// Updates issued by the crawler match rows by **external id**; catalog
/// edits look rows up by internal id first.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`list_releases`](ReleaseStore::list_releases) | All releases |
/// | [`list_needing_enrichment`](ReleaseStore::list_needing_enrichment) | Releases missing year, tags, or cover |
/// | [`get_release`](ReleaseStore::get_release) | One release by internal id |
/// | [`fetch_tags`](ReleaseStore::fetch_tags) | Stored tags by internal id |
/// | [`update_tags_and_year`](ReleaseStore::update_tags_and_year) | Write tags + year by external id |
/// | [`update_cover_image`](ReleaseStore::update_cover_image) | Record cover path by external id |
/// | [`upsert_release`](ReleaseStore::upsert_release) | Insert or refresh a row by external id |
/// | [`add_tag`](ReleaseStore::add_tag) / [`remove_tag`](ReleaseStore::remove_tag) | Single-tag edits |
/// | [`find_releases`](ReleaseStore::find_releases) | Filtered listing and search |
/// | [`set_wanted`](ReleaseStore::set_wanted) | Wish-list flag |
/// | [`update_details`](ReleaseStore::update_details) | Edit artist and title of one release |
/// | [`rename_artist`](ReleaseStore::rename_artist) | Rename an artist on every row |
/// | [`collection_stats`](ReleaseStore::collection_stats) | Totals and breakdowns |
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    async fn list_releases(&self, order: ListOrder) -> Result<Vec<Release>>;

    /// Releases with `year = 0`, no tags, or no cover image.
    async fn list_needing_enrichment(&self, order: ListOrder) -> Result<Vec<Release>>;

    async fn get_release(&self, id: i64) -> Result<Option<Release>>;

    /// Stored tags for a release. Empty if none are stored or the id is unknown.
    async fn fetch_tags(&self, id: i64) -> Result<Vec<String>>;

    /// Overwrite tags and year of the row with `external_id`.
    ///
    /// Returns the number of rows affected; `0` means no row matched.
    async fn update_tags_and_year(&self, external_id: i64, tags: &[String], year: i32)
        -> Result<u64>;

    /// Record the cover image path (relative to the covers directory).
    async fn update_cover_image(&self, external_id: i64, relative_path: &str) -> Result<()>;

    /// Insert a release, or refresh artist/title/year/tags if the external
    /// id already exists. Returns the internal id.
    async fn upsert_release(&self, release: &NewRelease) -> Result<i64>;

    /// Append a tag unless already present. Returns whether it was added.
    async fn add_tag(&self, id: i64, tag: &str) -> Result<bool>;

    /// Remove every occurrence of a tag. Returns whether anything was removed.
    async fn remove_tag(&self, id: i64, tag: &str) -> Result<bool>;

    /// Releases matching `filter`, in `order`.
    ///
    /// The default lists everything and filters in memory; backends push
    /// down whatever filters they can express natively.
    async fn find_releases(&self, filter: &ReleaseFilter, order: ListOrder) -> Result<Vec<Release>> {
        Ok(self
            .list_releases(order)
            .await?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect())
    }

    /// Mark a release wanted or owned. Returns false for an unknown id.
    async fn set_wanted(&self, id: i64, wanted: bool) -> Result<bool>;

    /// Overwrite artist and title of one release. Returns false for an unknown id.
    async fn update_details(&self, id: i64, artist: &str, title: &str) -> Result<bool>;

    /// Replace `old` with `new` on every row whose artist is exactly `old`.
    /// Returns the number of rows changed.
    async fn rename_artist(&self, old: &str, new: &str) -> Result<u64>;

    async fn collection_stats(&self) -> Result<CollectionStats> {
        let releases = self.list_releases(ListOrder::default()).await?;
        Ok(CollectionStats::from_releases(&releases))
    }
}

/// `tags` with `tag` appended, or `None` if it is already present.
pub fn with_tag_added(tags: &[String], tag: &str) -> Option<Vec<String>> {
    if tags.iter().any(|t| t == tag) {
        return None;
    }
    let mut next = tags.to_vec();
    next.push(tag.to_string());
    Some(next)
}

/// `tags` without any occurrence of `tag`, or `None` if it was absent.
pub fn with_tag_removed(tags: &[String], tag: &str) -> Option<Vec<String>> {
    if !tags.iter().any(|t| t == tag) {
        return None;
    }
    Some(tags.iter().filter(|t| *t != tag).cloned().collect())
}
