//! Release page URL building.
//!
//! Maps a release's artist and title onto the external site's page path:
//! `<base>/music/<artist>/<title>`. Each field is trimmed, inner spaces
//! become `+`, and trailing `+` are dropped.
//!
//! No other escaping is done. Artists or titles containing `/`, `?`, `&`,
//! or non-ASCII characters can produce a URL that does not resolve to the
//! intended page.

/// Default site the crawler visits.
pub const DEFAULT_BASE_URL: &str = "https://www.last.fm";

/// Build the release page URL under `base_url` (scheme and host, e.g.
/// `https://www.last.fm`). A trailing `/` on `base_url` is ignored.
pub fn release_url(base_url: &str, artist: &str, title: &str) -> String {
    format!(
        "{}/music/{}/{}",
        base_url.trim_end_matches('/'),
        path_segment(artist),
        path_segment(title)
    )
}

fn path_segment(field: &str) -> String {
    field
        .trim()
        .replace(' ', "+")
        .trim_end_matches('+')
        .to_string()
}
