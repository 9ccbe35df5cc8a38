//! Page event extraction.
//!
//! Turns a fetched release page into raw facts for that release's
//! [`RawFactSet`], and recognizes fetched cover images.
//!
//! Three independent rules run over each page:
//!
//! | Rule | Selector | Produces |
//! |------|----------|----------|
//! | Date | `.catalogue-metadata-description` | `year:<N>` from the last space-separated word |
//! | Tags | `a[href*='/tag/']` | the anchor's trimmed text |
//! | Cover art | `a.cover-art img` | the `src`, resolved against the page base URL |
//!
//! Metadata blocks that do not end in a number (track counts, running
//! times) are skipped silently; only some of them are release dates.

use std::sync::OnceLock;

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use spindle_core::models::RawFactSet;

use crate::fetch::FetchedResource;

/// Raw facts pulled from one release page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageFacts {
    pub facts: RawFactSet,
    /// Absolute URL of the cover art image, if the page has one.
    pub cover_url: Option<String>,
}

fn metadata_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| {
        Selector::parse(".catalogue-metadata-description")
            .expect("static metadata selector is valid")
    })
}

fn tag_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("a[href*='/tag/']").expect("static tag selector is valid"))
}

fn cover_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| {
        Selector::parse("a.cover-art img").expect("static cover-art selector is valid")
    })
}

/// Apply the date, tag, and cover-art rules to a release page.
pub fn extract_page(html: &str, base_url: &Url) -> PageFacts {
    let document = Html::parse_document(html);
    let mut page = PageFacts::default();

    for node in document.select(metadata_selector()) {
        if let Some(year) = parse_release_year(&element_text(&node)) {
            page.facts.push_year(year);
        }
    }

    for anchor in document.select(tag_selector()) {
        let tag = element_text(&anchor);
        let tag = tag.trim();
        if !tag.is_empty() {
            page.facts.push_tag(tag);
        }
    }

    page.cover_url = document
        .select(cover_selector())
        .filter_map(|img| img.value().attr("src"))
        .find(|src| !src.trim().is_empty())
        .and_then(|src| resolve_cover_url(src, base_url));

    debug!(
        facts = page.facts.len(),
        cover = page.cover_url.is_some(),
        "extracted page facts"
    );
    page
}

/// Year from a metadata description such as `"21 September 1994"` or `"1994"`.
///
/// Uses the text after the last space when there is one, else the whole
/// trimmed text. Returns `None` when that is not an integer.
pub fn parse_release_year(text: &str) -> Option<i32> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let candidate = match trimmed.rsplit_once(' ') {
        Some((_, last)) => last,
        None => trimmed,
    };
    candidate.parse().ok()
}

/// Resolve a cover `src` against the site base. Absolute sources are kept.
pub fn resolve_cover_url(src: &str, base_url: &Url) -> Option<String> {
    match base_url.join(src.trim()) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            warn!(src, error = %e, "could not resolve cover image URL");
            None
        }
    }
}

/// The body of a fetched resource if its content type is `image/*`.
pub fn image_payload(resource: &FetchedResource) -> Option<&[u8]> {
    let content_type = resource.content_type.as_deref()?;
    if content_type.trim().to_ascii_lowercase().starts_with("image/") {
        Some(&resource.body)
    } else {
        None
    }
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>()
}
