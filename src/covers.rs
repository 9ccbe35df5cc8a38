//! Cover image persistence.
//!
//! Crawled cover images are written to `<covers.dir>/<external_id>.jpg`
//! and recorded in the store by their path relative to the covers
//! directory. The `.jpg` extension is fixed whatever the served image
//! type is (a PNG cover still lands in a `.jpg` file).

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const COVER_EXTENSION: &str = "jpg";

/// File name (and store path) for a release's crawled cover.
pub fn cover_file_name(external_id: i64) -> String {
    format!("{}.{}", external_id, COVER_EXTENSION)
}

/// Write `bytes` as the cover of `external_id`, creating the directory if
/// needed. Returns the relative path to record in the store.
pub fn save_cover(dir: &Path, external_id: i64, bytes: &[u8]) -> Result<String> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create covers directory: {}", dir.display()))?;

    let name = cover_file_name(external_id);
    let path: PathBuf = dir.join(&name);
    std::fs::write(&path, bytes)
        .with_context(|| format!("Failed to write cover image: {}", path.display()))?;
    Ok(name)
}
