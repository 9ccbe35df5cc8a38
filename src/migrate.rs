use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // `tags` holds a JSON array; NULL and '[]' both mean "no tags".
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS releases (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            external_id INTEGER NOT NULL UNIQUE,
            artist TEXT NOT NULL DEFAULT '',
            title TEXT NOT NULL DEFAULT '',
            year INTEGER NOT NULL DEFAULT 0,
            tags TEXT,
            cover_image TEXT,
            wanted INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Catalogs created before the wish list existed lack the column.
    let has_wanted: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('releases') WHERE name = 'wanted'",
    )
    .fetch_one(&pool)
    .await?;
    if has_wanted == 0 {
        sqlx::query("ALTER TABLE releases ADD COLUMN wanted INTEGER NOT NULL DEFAULT 0")
            .execute(&pool)
            .await?;
    }

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_releases_title ON releases(title)")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_releases_artist ON releases(artist)")
        .execute(&pool)
        .await?;

    pool.close().await;
    Ok(())
}
