//! Collection statistics: totals, enrichment coverage, and breakdowns by
//! decade, artist and tag.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::Release;
use crate::tags::{decade_tag, is_decade_tag};

/// How many entries each ranked breakdown keeps.
pub const TOP_N: usize = 10;

/// A label and the number of releases it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatItem {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    pub total: usize,
    pub owned: usize,
    pub wanted: usize,
    pub fully_enriched: usize,
    pub with_cover: usize,
    /// Oldest decade first; releases with an unknown year come last.
    pub by_decade: Vec<StatItem>,
    pub top_artists: Vec<StatItem>,
    pub top_tags: Vec<StatItem>,
}

impl CollectionStats {
    pub fn from_releases(releases: &[Release]) -> Self {
        let mut stats = CollectionStats {
            total: releases.len(),
            ..Default::default()
        };

        let mut decades: HashMap<i32, usize> = HashMap::new();
        let mut unknown_year = 0;
        let mut artists: HashMap<&str, usize> = HashMap::new();
        let mut tags: HashMap<&str, usize> = HashMap::new();

        for r in releases {
            if r.wanted {
                stats.wanted += 1;
            } else {
                stats.owned += 1;
            }
            if r.is_fully_enriched() {
                stats.fully_enriched += 1;
            }
            if !r.cover_image_path.is_empty() {
                stats.with_cover += 1;
            }
            if r.year > 0 {
                *decades.entry(r.year / 10 * 10).or_default() += 1;
            } else {
                unknown_year += 1;
            }
            *artists.entry(r.artist.trim()).or_default() += 1;
            for tag in &r.tags {
                // Decade tags duplicate the decade breakdown.
                if is_decade_tag(tag) {
                    continue;
                }
                *tags.entry(tag.as_str()).or_default() += 1;
            }
        }

        let mut by_decade: Vec<(i32, usize)> = decades.into_iter().collect();
        by_decade.sort();
        stats.by_decade = by_decade
            .into_iter()
            .filter_map(|(decade, count)| {
                decade_tag(decade).map(|label| StatItem { label, count })
            })
            .collect();
        if unknown_year > 0 {
            stats.by_decade.push(StatItem {
                label: "unknown".to_string(),
                count: unknown_year,
            });
        }

        stats.top_artists = ranked(artists);
        stats.top_tags = ranked(tags);
        stats
    }
}

/// Highest count first, ties by label, truncated to [`TOP_N`].
fn ranked(counts: HashMap<&str, usize>) -> Vec<StatItem> {
    let mut items: Vec<StatItem> = counts
        .into_iter()
        .map(|(label, count)| StatItem {
            label: label.to_string(),
            count,
        })
        .collect();
    items.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    items.truncate(TOP_N);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(artist: &str, year: i32, tags: &[&str], cover: &str, wanted: bool) -> Release {
        Release {
            id: 0,
            external_id: 0,
            artist: artist.into(),
            title: "T".into(),
            year,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            cover_image_path: cover.into(),
            wanted,
        }
    }

    #[test]
    fn test_counts_and_breakdowns() {
        let releases = vec![
            release("Blur", 1994, &["Britpop", "1990s"], "1.jpg", false),
            release("Blur", 1997, &["Britpop", "1990s"], "", false),
            release("Oasis", 1995, &["Britpop"], "3.jpg", true),
            release("Can", 1971, &["Krautrock", "1970s"], "4.jpg", false),
            release("Unknown", 0, &[], "", false),
        ];
        let stats = CollectionStats::from_releases(&releases);

        assert_eq!(stats.total, 5);
        assert_eq!(stats.owned, 4);
        assert_eq!(stats.wanted, 1);
        assert_eq!(stats.fully_enriched, 3);
        assert_eq!(stats.with_cover, 3);
        assert_eq!(
            stats.by_decade,
            vec![
                StatItem { label: "1970s".into(), count: 1 },
                StatItem { label: "1990s".into(), count: 3 },
                StatItem { label: "unknown".into(), count: 1 },
            ]
        );
        assert_eq!(stats.top_artists[0], StatItem { label: "Blur".into(), count: 2 });
        assert_eq!(stats.top_tags[0], StatItem { label: "Britpop".into(), count: 3 });
        assert!(stats.top_tags.iter().all(|t| t.label != "1990s"));
    }

    #[test]
    fn test_empty_collection() {
        let stats = CollectionStats::from_releases(&[]);
        assert_eq!(stats, CollectionStats::default());
    }
}
