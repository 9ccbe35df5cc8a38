//! Catalog maintenance commands.
//!
//! Implements the non-crawling CLI commands: `spindle add`, `spindle list`,
//! `spindle search`, `spindle stats`, `spindle wanted`, `spindle edit`, and
//! `spindle tag add|remove`. Each command has a
//! store-level operation written against [`ReleaseStore`] (exercised by the
//! unit tests with the in-memory store) and a `run_*` wrapper that opens
//! the SQLite store and prints the result.

use anyhow::{bail, Result};
use tracing::info;

use spindle_core::filter::ReleaseFilter;
use spindle_core::models::{ListOrder, NewRelease, NormalizedFacts, Release};
use spindle_core::stats::CollectionStats;
use spindle_core::store::ReleaseStore;
use spindle_core::tags::{normalize, normalize_edit};

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Insert a release, or refresh the row with the same external id.
///
/// Seed tags are normalized against the given year, so a seeded release
/// already carries its decade tag.
pub async fn add_release(store: &dyn ReleaseStore, release: NewRelease) -> Result<i64> {
    if release.external_id <= 0 {
        bail!("external id must be a positive integer");
    }
    if release.artist.trim().is_empty() || release.title.trim().is_empty() {
        bail!("artist and title must not be empty");
    }
    if release.year < 0 {
        bail!("year must not be negative");
    }

    let tags: Vec<String> = release
        .tags
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    let normalized = normalize(&tags, release.year);
    let id = store
        .upsert_release(&NewRelease {
            artist: release.artist.trim().to_string(),
            title: release.title.trim().to_string(),
            year: normalized.year,
            tags: normalized.tags,
            ..release
        })
        .await?;
    info!(id, external_id = release.external_id, "release stored");
    Ok(id)
}

/// Set a release's year from user input and renormalize its stored tags.
pub async fn edit_year(
    store: &dyn ReleaseStore,
    id: i64,
    year_input: &str,
) -> Result<NormalizedFacts> {
    let Some(release) = store.get_release(id).await? else {
        bail!("Release not found: {}", id);
    };
    let current = store.fetch_tags(id).await?;
    let normalized = normalize_edit(&current, year_input);
    store
        .update_tags_and_year(release.external_id, &normalized.tags, normalized.year)
        .await?;
    Ok(normalized)
}

/// Result of an artist/title edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailsEdit {
    pub release: Release,
    /// Other releases whose artist was renamed along with this one.
    pub also_renamed: u64,
}

/// Change the artist and/or title of a release.
///
/// With `all_occurrences`, the new artist name replaces the old one on
/// every release that carried exactly the old name.
pub async fn edit_details(
    store: &dyn ReleaseStore,
    id: i64,
    artist: Option<&str>,
    title: Option<&str>,
    all_occurrences: bool,
) -> Result<DetailsEdit> {
    let Some(current) = store.get_release(id).await? else {
        bail!("Release not found: {}", id);
    };
    let artist = match artist.map(str::trim) {
        Some("") => bail!("artist must not be empty"),
        Some(a) => a,
        None => current.artist.as_str(),
    };
    let title = match title.map(str::trim) {
        Some("") => bail!("title must not be empty"),
        Some(t) => t,
        None => current.title.as_str(),
    };

    let mut also_renamed = 0;
    if all_occurrences && artist != current.artist {
        let renamed = store.rename_artist(&current.artist, artist).await?;
        also_renamed = renamed.saturating_sub(1);
        info!(from = %current.artist, to = %artist, renamed, "artist renamed");
    }
    store.update_details(id, artist, title).await?;

    let Some(release) = store.get_release(id).await? else {
        bail!("Release not found: {}", id);
    };
    Ok(DetailsEdit {
        release,
        also_renamed,
    })
}

/// Move a release onto or off the wish list.
pub async fn set_wanted(store: &dyn ReleaseStore, id: i64, wanted: bool) -> Result<()> {
    if !store.set_wanted(id, wanted).await? {
        bail!("Release not found: {}", id);
    }
    Ok(())
}

/// Releases matching `filter`. Blank text queries are rejected, except for
/// free-text search where an empty query lists everything.
pub async fn find_releases(
    store: &dyn ReleaseStore,
    filter: &ReleaseFilter,
    order: ListOrder,
) -> Result<Vec<Release>> {
    match filter {
        ReleaseFilter::Tag(q) | ReleaseFilter::Artist(q) if q.trim().is_empty() => {
            bail!("filter value must not be empty")
        }
        ReleaseFilter::Tag(tag) => {
            let trimmed = ReleaseFilter::Tag(tag.trim().to_string());
            store.find_releases(&trimmed, order).await
        }
        _ => store.find_releases(filter, order).await,
    }
}

/// Add `tag` to a release. Returns false when it was already present.
pub async fn add_tag(store: &dyn ReleaseStore, id: i64, tag: &str) -> Result<bool> {
    let tag = checked_tag(tag)?;
    ensure_exists(store, id).await?;
    store.add_tag(id, tag).await
}

/// Remove every occurrence of `tag`. Returns false when it was absent.
pub async fn remove_tag(store: &dyn ReleaseStore, id: i64, tag: &str) -> Result<bool> {
    let tag = checked_tag(tag)?;
    ensure_exists(store, id).await?;
    store.remove_tag(id, tag).await
}

fn checked_tag(tag: &str) -> Result<&str> {
    let tag = tag.trim();
    if tag.is_empty() {
        bail!("tag must not be empty");
    }
    Ok(tag)
}

async fn ensure_exists(store: &dyn ReleaseStore, id: i64) -> Result<()> {
    if store.get_release(id).await?.is_none() {
        bail!("Release not found: {}", id);
    }
    Ok(())
}

/// Render releases as a fixed-width table.
pub fn format_listing(releases: &[Release]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>5} {:>10}  {:<24} {:<28} {:>4}  {:<5}  {}\n",
        "ID", "EXTERNAL", "ARTIST", "TITLE", "YEAR", "COVER", "TAGS"
    ));
    out.push_str(&format!("{}\n", "-".repeat(96)));
    for r in releases {
        let year = if r.year > 0 {
            r.year.to_string()
        } else {
            "-".to_string()
        };
        out.push_str(&format!(
            "{:>5} {:>10}  {:<24} {:<28} {:>4}  {:<5}  {}\n",
            r.id,
            r.external_id,
            truncate(&r.artist, 24),
            truncate(&r.title, 28),
            year,
            if r.cover_image_path.is_empty() { "no" } else { "yes" },
            if r.wanted {
                format!("[wanted] {}", r.tags.join(", "))
            } else {
                r.tags.join(", ")
            }
        ));
    }
    out
}

/// Render collection statistics as a plain-text report.
pub fn format_stats(stats: &CollectionStats) -> String {
    let mut out = String::new();
    out.push_str("Spindle — collection stats\n");
    out.push_str("==========================\n\n");
    out.push_str(&format!("  Releases:        {}\n", stats.total));
    out.push_str(&format!("  Owned:           {}\n", stats.owned));
    out.push_str(&format!("  Wanted:          {}\n", stats.wanted));
    out.push_str(&format!("  Fully enriched:  {}\n", stats.fully_enriched));
    out.push_str(&format!("  With cover:      {}\n", stats.with_cover));

    for (heading, items) in [
        ("By decade", &stats.by_decade),
        ("Top artists", &stats.top_artists),
        ("Top tags", &stats.top_tags),
    ] {
        if items.is_empty() {
            continue;
        }
        out.push_str(&format!("\n  {}:\n", heading));
        for item in items {
            out.push_str(&format!("    {:<28} {:>5}\n", truncate(&item.label, 28), item.count));
        }
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut cut: String = s.chars().take(max.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

async fn open_store(config: &Config) -> Result<SqliteStore> {
    Ok(SqliteStore::new(db::connect(config).await?))
}

pub async fn run_add(config: &Config, release: NewRelease) -> Result<()> {
    let store = open_store(config).await?;
    let external_id = release.external_id;
    let id = add_release(&store, release).await?;
    println!("Stored release {} (external id {})", id, external_id);
    store.close().await;
    Ok(())
}

pub async fn run_list(
    config: &Config,
    filter: ReleaseFilter,
    order: ListOrder,
    json: bool,
) -> Result<()> {
    let store = open_store(config).await?;
    let releases = find_releases(&store, &filter, order).await?;
    store.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&releases)?);
    } else if releases.is_empty() {
        println!("No releases.");
    } else {
        println!("{}", filter.describe());
        println!();
        print!("{}", format_listing(&releases));
        println!();
        println!("{} release(s)", releases.len());
    }
    Ok(())
}

pub async fn run_stats(config: &Config, json: bool) -> Result<()> {
    let store = open_store(config).await?;
    let stats = store.collection_stats().await?;
    store.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", format_stats(&stats));
    }
    Ok(())
}

pub async fn run_wanted(config: &Config, id: i64, wanted: bool) -> Result<()> {
    let store = open_store(config).await?;
    set_wanted(&store, id, wanted).await?;
    if wanted {
        println!("Release {} marked as wanted", id);
    } else {
        println!("Release {} marked as owned", id);
    }
    store.close().await;
    Ok(())
}

/// Fields to change in `spindle edit`.
#[derive(Debug, Clone, Default)]
pub struct EditRequest {
    pub year: Option<String>,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub all_occurrences: bool,
}

pub async fn run_edit(config: &Config, id: i64, request: EditRequest) -> Result<()> {
    if request.year.is_none() && request.artist.is_none() && request.title.is_none() {
        bail!("nothing to edit: pass --year, --artist, or --title");
    }
    let store = open_store(config).await?;

    if request.artist.is_some() || request.title.is_some() {
        let edit = edit_details(
            &store,
            id,
            request.artist.as_deref(),
            request.title.as_deref(),
            request.all_occurrences,
        )
        .await?;
        println!(
            "Release {}: {} - {}",
            id, edit.release.artist, edit.release.title
        );
        if edit.also_renamed > 0 {
            println!("  artist renamed on {} other release(s)", edit.also_renamed);
        }
    }
    if let Some(year_input) = &request.year {
        let normalized = edit_year(&store, id, year_input).await?;
        println!("Release {}: year {}", id, normalized.year);
        println!("  tags: {}", normalized.tags.join(", "));
    }
    store.close().await;
    Ok(())
}

pub async fn run_tag(config: &Config, id: i64, tag: &str, remove: bool) -> Result<()> {
    let store = open_store(config).await?;
    if remove {
        if remove_tag(&store, id, tag).await? {
            println!("Removed tag '{}' from release {}", tag.trim(), id);
        } else {
            println!("Release {} has no tag '{}'", id, tag.trim());
        }
    } else if add_tag(&store, id, tag).await? {
        println!("Added tag '{}' to release {}", tag.trim(), id);
    } else {
        println!("Release {} already has tag '{}'", id, tag.trim());
    }
    store.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spindle_core::store::memory::InMemoryStore;

    fn seed(external_id: i64, tags: &[&str], year: i32) -> NewRelease {
        NewRelease {
            external_id,
            artist: " Massive Attack ".into(),
            title: "Mezzanine".into(),
            year,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            wanted: false,
        }
    }

    #[tokio::test]
    async fn test_add_release_normalizes_seed_tags() {
        let store = InMemoryStore::new();
        let id = add_release(&store, seed(55, &["Trip-Hop", " ", "Trip-Hop"], 1998))
            .await
            .unwrap();

        let r = store.get_release(id).await.unwrap().unwrap();
        assert_eq!(r.artist, "Massive Attack");
        assert_eq!(r.tags, vec!["Trip-Hop", "1990s"]);
        assert_eq!(r.year, 1998);
    }

    #[tokio::test]
    async fn test_add_release_rejects_bad_input() {
        let store = InMemoryStore::new();
        assert!(add_release(&store, seed(0, &[], 0)).await.is_err());
        let mut blank = seed(1, &[], 0);
        blank.title = "  ".into();
        assert!(add_release(&store, blank).await.is_err());
    }

    #[tokio::test]
    async fn test_edit_year_replaces_decade_tag() {
        let store = InMemoryStore::new();
        let id = add_release(&store, seed(7, &["Rock"], 1994)).await.unwrap();

        let facts = edit_year(&store, id, "2003").await.unwrap();
        assert_eq!(facts.year, 2003);
        assert_eq!(facts.tags, vec!["Rock", "2000s"]);
        let stored = store.get_release(id).await.unwrap().unwrap();
        assert_eq!(stored.tags, vec!["Rock", "2000s"]);
        assert_eq!(stored.year, 2003);
    }

    #[tokio::test]
    async fn test_edit_year_invalid_input_clears_year() {
        let store = InMemoryStore::new();
        let id = add_release(&store, seed(7, &["Rock"], 1994)).await.unwrap();

        let facts = edit_year(&store, id, "nineteen").await.unwrap();
        assert_eq!(facts.year, 0);
        assert_eq!(facts.tags, vec!["Rock"]);
    }

    #[tokio::test]
    async fn test_edit_unknown_release_errors() {
        let store = InMemoryStore::new();
        let err = edit_year(&store, 404, "1999").await.unwrap_err();
        assert!(err.to_string().contains("Release not found: 404"));
    }

    #[tokio::test]
    async fn test_tag_add_remove() {
        let store = InMemoryStore::new();
        let id = add_release(&store, seed(9, &["Rock"], 0)).await.unwrap();

        assert!(add_tag(&store, id, " Shoegaze ").await.unwrap());
        assert!(!add_tag(&store, id, "Shoegaze").await.unwrap());
        assert!(remove_tag(&store, id, "Rock").await.unwrap());
        assert!(!remove_tag(&store, id, "Rock").await.unwrap());
        assert_eq!(store.fetch_tags(id).await.unwrap(), vec!["Shoegaze"]);

        assert!(add_tag(&store, id, "").await.is_err());
        assert!(add_tag(&store, 999, "Rock").await.is_err());
    }

    #[test]
    fn test_format_listing_marks_unknowns() {
        let releases = vec![Release {
            id: 3,
            external_id: 30,
            artist: "Boards of Canada".into(),
            title: "Music Has the Right to Children".into(),
            year: 0,
            tags: vec!["IDM".into(), "Electronic".into()],
            cover_image_path: String::new(),
            wanted: true,
        }];
        let out = format_listing(&releases);
        let row = out.lines().nth(2).unwrap();
        assert!(row.contains("Boards of Canada"));
        assert!(row.contains("Music Has the Right to Chil…"));
        assert!(row.contains(" -  no"));
        assert!(row.ends_with("[wanted] IDM, Electronic"));
    }

    fn by(external_id: i64, artist: &str, title: &str) -> NewRelease {
        NewRelease {
            external_id,
            artist: artist.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_edit_details_single_release() {
        let store = InMemoryStore::new();
        let id = add_release(&store, by(1, "Prince", "Purple Rain")).await.unwrap();
        let other = add_release(&store, by(2, "Prince", "1999")).await.unwrap();

        let edit = edit_details(&store, id, Some(" Prince & The Revolution "), None, false)
            .await
            .unwrap();
        assert_eq!(edit.release.artist, "Prince & The Revolution");
        assert_eq!(edit.release.title, "Purple Rain");
        assert_eq!(edit.also_renamed, 0);
        assert_eq!(store.get_release(other).await.unwrap().unwrap().artist, "Prince");
    }

    #[tokio::test]
    async fn test_edit_details_all_occurrences() {
        let store = InMemoryStore::new();
        let id = add_release(&store, by(1, "Prince", "Purple Rain")).await.unwrap();
        let other = add_release(&store, by(2, "Prince", "1999")).await.unwrap();
        let buster = add_release(&store, by(3, "Prince Buster", "Wash Wash")).await.unwrap();

        let edit = edit_details(&store, id, Some("The Artist"), Some("Purple Rain (OST)"), true)
            .await
            .unwrap();
        assert!(edit.release.label().contains("The Artist - Purple Rain (OST)"));
        assert_eq!(edit.also_renamed, 1);
        assert_eq!(store.get_release(other).await.unwrap().unwrap().artist, "The Artist");
        assert_eq!(
            store.get_release(buster).await.unwrap().unwrap().artist,
            "Prince Buster"
        );
    }

    #[tokio::test]
    async fn test_edit_details_rejects_blank_and_unknown() {
        let store = InMemoryStore::new();
        let id = add_release(&store, by(1, "Air", "Moon Safari")).await.unwrap();
        assert!(edit_details(&store, id, Some("  "), None, false).await.is_err());
        assert!(edit_details(&store, id, None, Some(""), false).await.is_err());
        let err = edit_details(&store, 404, Some("X"), None, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Release not found: 404"));
    }

    #[tokio::test]
    async fn test_wanted_toggle() {
        let store = InMemoryStore::new();
        let id = add_release(&store, by(1, "Air", "Moon Safari")).await.unwrap();
        set_wanted(&store, id, true).await.unwrap();
        let wanted = find_releases(&store, &ReleaseFilter::Wanted, ListOrder::default())
            .await
            .unwrap();
        assert_eq!(wanted.len(), 1);

        set_wanted(&store, id, false).await.unwrap();
        assert!(find_releases(&store, &ReleaseFilter::Wanted, ListOrder::default())
            .await
            .unwrap()
            .is_empty());
        assert!(set_wanted(&store, 999, true).await.is_err());
    }

    #[tokio::test]
    async fn test_find_releases_by_tag_year_artist_search() {
        let store = InMemoryStore::new();
        add_release(&store, seed(1, &["Trip-Hop"], 1998)).await.unwrap();
        add_release(&store, by(2, "Sigur Rós", "Ágætis byrjun")).await.unwrap();
        add_release(&store, by(3, "Air", "Talkie Walkie")).await.unwrap();
        let order = ListOrder::default();

        async fn ids(store: &InMemoryStore, filter: ReleaseFilter) -> Vec<i64> {
            find_releases(store, &filter, ListOrder::parse("artist", "asc"))
                .await
                .unwrap()
                .iter()
                .map(|r| r.external_id)
                .collect()
        }

        assert_eq!(ids(&store, ReleaseFilter::Tag(" Trip-Hop ".into())).await, vec![1]);
        assert_eq!(ids(&store, ReleaseFilter::Year(1998)).await, vec![1]);
        assert_eq!(
            ids(&store, ReleaseFilter::Artist("sigur ros/air".into())).await,
            vec![3, 2]
        );
        assert_eq!(ids(&store, ReleaseFilter::Search("AGÆTIS".into())).await, vec![2]);
        assert_eq!(ids(&store, ReleaseFilter::Search(String::new())).await.len(), 3);

        assert!(find_releases(&store, &ReleaseFilter::Tag(" ".into()), order)
            .await
            .is_err());
    }

    #[test]
    fn test_format_stats_lists_breakdowns() {
        let stats = CollectionStats::from_releases(&[Release {
            id: 1,
            external_id: 10,
            artist: "Can".into(),
            title: "Tago Mago".into(),
            year: 1971,
            tags: vec!["Krautrock".into(), "1970s".into()],
            cover_image_path: "10.jpg".into(),
            wanted: false,
        }]);
        let out = format_stats(&stats);
        assert!(out.contains("Releases:        1"));
        assert!(out.contains("Fully enriched:  1"));
        assert!(out.contains("By decade:"));
        assert!(out.lines().any(|l| l.trim_start().starts_with("1970s") && l.ends_with("1")));
        assert!(out.lines().any(|l| l.trim_start().starts_with("Krautrock")));
    }
}
