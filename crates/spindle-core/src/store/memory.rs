//! In-memory [`ReleaseStore`] implementation for testing.
//!
//! Rows live in a `Vec` behind `std::sync::RwLock`. Internal ids are
//! assigned sequentially from 1.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{ListOrder, NewRelease, Release, SortField};

use super::{with_tag_added, with_tag_removed, ReleaseStore};

/// In-memory release store.
pub struct InMemoryStore {
    releases: RwLock<Vec<Release>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            releases: RwLock::new(Vec::new()),
        }
    }

    /// Build a store pre-populated with `releases`, keeping their ids.
    pub fn with_releases(releases: Vec<Release>) -> Self {
        Self {
            releases: RwLock::new(releases),
        }
    }

    /// Snapshot of a release by external id.
    pub fn by_external_id(&self, external_id: i64) -> Option<Release> {
        self.read()
            .ok()?
            .iter()
            .find(|r| r.external_id == external_id)
            .cloned()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<Release>>> {
        self.releases
            .read()
            .map_err(|_| anyhow!("release store lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<Release>>> {
        self.releases
            .write()
            .map_err(|_| anyhow!("release store lock poisoned"))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted(mut releases: Vec<Release>, order: ListOrder) -> Vec<Release> {
    releases.sort_by(|a, b| {
        let ord = match order.field {
            SortField::Title => a.title.cmp(&b.title),
            SortField::Artist => a.artist.cmp(&b.artist),
            SortField::Year => a.year.cmp(&b.year),
        };
        if order.descending {
            ord.reverse()
        } else {
            ord
        }
    });
    releases
}

#[async_trait]
impl ReleaseStore for InMemoryStore {
    async fn list_releases(&self, order: ListOrder) -> Result<Vec<Release>> {
        Ok(sorted(self.read()?.clone(), order))
    }

    async fn list_needing_enrichment(&self, order: ListOrder) -> Result<Vec<Release>> {
        let pending = self
            .read()?
            .iter()
            .filter(|r| !r.is_fully_enriched())
            .cloned()
            .collect();
        Ok(sorted(pending, order))
    }

    async fn get_release(&self, id: i64) -> Result<Option<Release>> {
        Ok(self.read()?.iter().find(|r| r.id == id).cloned())
    }

    async fn fetch_tags(&self, id: i64) -> Result<Vec<String>> {
        Ok(self
            .read()?
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.tags.clone())
            .unwrap_or_default())
    }

    async fn update_tags_and_year(
        &self,
        external_id: i64,
        tags: &[String],
        year: i32,
    ) -> Result<u64> {
        let mut releases = self.write()?;
        let mut affected = 0;
        for r in releases.iter_mut().filter(|r| r.external_id == external_id) {
            r.tags = tags.to_vec();
            r.year = year;
            affected += 1;
        }
        Ok(affected)
    }

    async fn update_cover_image(&self, external_id: i64, relative_path: &str) -> Result<()> {
        let mut releases = self.write()?;
        for r in releases.iter_mut().filter(|r| r.external_id == external_id) {
            r.cover_image_path = relative_path.to_string();
        }
        Ok(())
    }

    async fn upsert_release(&self, release: &NewRelease) -> Result<i64> {
        let mut releases = self.write()?;
        if let Some(existing) = releases
            .iter_mut()
            .find(|r| r.external_id == release.external_id)
        {
            existing.artist = release.artist.clone();
            existing.title = release.title.clone();
            existing.year = release.year;
            existing.tags = release.tags.clone();
            existing.wanted = release.wanted;
            return Ok(existing.id);
        }
        let id = releases.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        releases.push(Release {
            id,
            external_id: release.external_id,
            artist: release.artist.clone(),
            title: release.title.clone(),
            year: release.year,
            tags: release.tags.clone(),
            cover_image_path: String::new(),
            wanted: release.wanted,
        });
        Ok(id)
    }

    async fn add_tag(&self, id: i64, tag: &str) -> Result<bool> {
        let mut releases = self.write()?;
        let Some(r) = releases.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        match with_tag_added(&r.tags, tag) {
            Some(tags) => {
                r.tags = tags;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_tag(&self, id: i64, tag: &str) -> Result<bool> {
        let mut releases = self.write()?;
        let Some(r) = releases.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        match with_tag_removed(&r.tags, tag) {
            Some(tags) => {
                r.tags = tags;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_wanted(&self, id: i64, wanted: bool) -> Result<bool> {
        let mut releases = self.write()?;
        let Some(r) = releases.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        r.wanted = wanted;
        Ok(true)
    }

    async fn update_details(&self, id: i64, artist: &str, title: &str) -> Result<bool> {
        let mut releases = self.write()?;
        let Some(r) = releases.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        r.artist = artist.to_string();
        r.title = title.to_string();
        Ok(true)
    }

    async fn rename_artist(&self, old: &str, new: &str) -> Result<u64> {
        let mut releases = self.write()?;
        let mut affected = 0;
        for r in releases.iter_mut().filter(|r| r.artist == old) {
            r.artist = new.to_string();
            affected += 1;
        }
        Ok(affected)
    }
}
