//! SQLite-backed [`ReleaseStore`] implementation.
//!
//! Maps each store operation onto the `releases` table created by
//! [`crate::migrate`]. Tags are persisted as a JSON array in a nullable
//! TEXT column.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use spindle_core::filter::ReleaseFilter;
use spindle_core::models::{ListOrder, NewRelease, Release};
use spindle_core::store::{with_tag_added, with_tag_removed, ReleaseStore};

const RELEASE_COLUMNS: &str = "id, external_id, artist, title, year, tags, cover_image, wanted";

/// SQLite implementation of the [`ReleaseStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn decode_tags(raw: Option<String>) -> Result<Vec<String>> {
    match raw {
        Some(json) if !json.trim().is_empty() => {
            serde_json::from_str(&json).with_context(|| format!("Invalid tags column: {}", json))
        }
        _ => Ok(Vec::new()),
    }
}

fn encode_tags(tags: &[String]) -> Result<String> {
    Ok(serde_json::to_string(tags)?)
}

fn release_from_row(row: &SqliteRow) -> Result<Release> {
    let cover: Option<String> = row.get("cover_image");
    Ok(Release {
        id: row.get("id"),
        external_id: row.get("external_id"),
        artist: row.get("artist"),
        title: row.get("title"),
        year: row.get("year"),
        tags: decode_tags(row.get("tags"))?,
        cover_image_path: cover.unwrap_or_default(),
        wanted: row.get("wanted"),
    })
}

enum SqlParam<'a> {
    Int(i32),
    Text(&'a str),
}

fn order_clause(order: ListOrder) -> String {
    format!(
        "ORDER BY {} {}, id ASC",
        order.field.column(),
        order.direction()
    )
}

#[async_trait]
impl ReleaseStore for SqliteStore {
    async fn list_releases(&self, order: ListOrder) -> Result<Vec<Release>> {
        let sql = format!(
            "SELECT {} FROM releases {}",
            RELEASE_COLUMNS,
            order_clause(order)
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(release_from_row).collect()
    }

    async fn list_needing_enrichment(&self, order: ListOrder) -> Result<Vec<Release>> {
        self.find_releases(&ReleaseFilter::NeedsEnrichment, order)
            .await
    }

    /// Wanted, year, tag and enrichment filters run in SQL. Artist and
    /// free-text search fold accents, which SQLite cannot, so they filter
    /// the full listing in Rust.
    async fn find_releases(&self, filter: &ReleaseFilter, order: ListOrder) -> Result<Vec<Release>> {
        let (condition, param) = match filter {
            ReleaseFilter::All => ("1 = 1", None),
            ReleaseFilter::NeedsEnrichment => (
                "year = 0 OR tags IS NULL OR tags = '[]' OR cover_image IS NULL OR cover_image = ''",
                None,
            ),
            ReleaseFilter::Wanted => ("wanted = 1", None),
            ReleaseFilter::Year(year) => ("year = ?", Some(SqlParam::Int(*year))),
            ReleaseFilter::Tag(tag) => (
                "EXISTS (SELECT 1 FROM json_each(releases.tags) WHERE json_each.value = ?)",
                Some(SqlParam::Text(tag.as_str())),
            ),
            ReleaseFilter::Artist(_) | ReleaseFilter::Search(_) => {
                let all = self.list_releases(order).await?;
                return Ok(all.into_iter().filter(|r| filter.matches(r)).collect());
            }
        };

        let sql = format!(
            "SELECT {} FROM releases WHERE ({}) {}",
            RELEASE_COLUMNS,
            condition,
            order_clause(order)
        );
        let query = sqlx::query(&sql);
        let query = match param {
            Some(SqlParam::Int(v)) => query.bind(v),
            Some(SqlParam::Text(v)) => query.bind(v),
            None => query,
        };
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(release_from_row).collect()
    }

    async fn get_release(&self, id: i64) -> Result<Option<Release>> {
        let sql = format!("SELECT {} FROM releases WHERE id = ?", RELEASE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(release_from_row).transpose()
    }

    async fn fetch_tags(&self, id: i64) -> Result<Vec<String>> {
        let raw: Option<Option<String>> =
            sqlx::query_scalar("SELECT tags FROM releases WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        decode_tags(raw.flatten())
    }

    async fn update_tags_and_year(
        &self,
        external_id: i64,
        tags: &[String],
        year: i32,
    ) -> Result<u64> {
        let result = sqlx::query("UPDATE releases SET tags = ?, year = ? WHERE external_id = ?")
            .bind(encode_tags(tags)?)
            .bind(year)
            .bind(external_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn update_cover_image(&self, external_id: i64, relative_path: &str) -> Result<()> {
        sqlx::query("UPDATE releases SET cover_image = ? WHERE external_id = ?")
            .bind(relative_path)
            .bind(external_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_release(&self, release: &NewRelease) -> Result<i64> {
        sqlx::query(
            r#"
            INSERT INTO releases (external_id, artist, title, year, tags, wanted)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(external_id) DO UPDATE SET
                artist = excluded.artist,
                title = excluded.title,
                year = excluded.year,
                tags = excluded.tags,
                wanted = excluded.wanted
            "#,
        )
        .bind(release.external_id)
        .bind(&release.artist)
        .bind(&release.title)
        .bind(release.year)
        .bind(encode_tags(&release.tags)?)
        .bind(release.wanted)
        .execute(&self.pool)
        .await?;

        let id: i64 = sqlx::query_scalar("SELECT id FROM releases WHERE external_id = ?")
            .bind(release.external_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    async fn add_tag(&self, id: i64, tag: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let raw: Option<Option<String>> =
            sqlx::query_scalar("SELECT tags FROM releases WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(raw) = raw else {
            return Ok(false);
        };
        let Some(tags) = with_tag_added(&decode_tags(raw)?, tag) else {
            return Ok(false);
        };
        sqlx::query("UPDATE releases SET tags = ? WHERE id = ?")
            .bind(encode_tags(&tags)?)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn remove_tag(&self, id: i64, tag: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let raw: Option<Option<String>> =
            sqlx::query_scalar("SELECT tags FROM releases WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(raw) = raw else {
            return Ok(false);
        };
        let Some(tags) = with_tag_removed(&decode_tags(raw)?, tag) else {
            return Ok(false);
        };
        sqlx::query("UPDATE releases SET tags = ? WHERE id = ?")
            .bind(encode_tags(&tags)?)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn set_wanted(&self, id: i64, wanted: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE releases SET wanted = ? WHERE id = ?")
            .bind(wanted)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_details(&self, id: i64, artist: &str, title: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE releases SET artist = ?, title = ? WHERE id = ?")
            .bind(artist)
            .bind(title)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn rename_artist(&self, old: &str, new: &str) -> Result<u64> {
        let result = sqlx::query("UPDATE releases SET artist = ? WHERE artist = ?")
            .bind(new)
            .bind(old)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
