//! Crawl context routing.
//!
//! Every outbound request of a crawl run (a release page, and the cover
//! image that page points at) is dispatched with a [`RequestContext`].
//! When the response comes back, [`CrawlRouter::deliver`] looks the
//! request up, finds the originating release's accumulator, and runs the
//! matching handler on it. Nothing touches an accumulator without going
//! through that lookup.
//!
//! Accumulators live in an arena keyed by external id. The orchestrator
//! opens one with [`CrawlRouter::begin`] and takes it back by value with
//! [`CrawlRouter::finish`] once the release's requests have completed.
//!
//! ```text
//! begin(ext) ──▶ dispatch(ext) ──▶ fetch ──▶ deliver(ctx, resource)
//!                                               │
//!                       ┌───────────────────────┴──────────┐
//!                       ▼                                  ▼
//!                  page handler                      image handler
//!             (facts + cover URL)                   (cover bytes)
//!                       │                                  │
//!                       └──────────────┬───────────────────┘
//!                                      ▼
//!                              finish(ext) ──▶ ReleaseCrawl
//! ```

use std::collections::HashMap;

use reqwest::Url;
use thiserror::Error;

use spindle_core::models::RawFactSet;

use crate::extract::{extract_page, image_payload};
use crate::fetch::FetchedResource;

pub type RequestId = u64;

/// Context carried by one in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestContext {
    pub request_id: RequestId,
}

/// Everything gathered for one release during a crawl run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseCrawl {
    pub external_id: i64,
    pub facts: RawFactSet,
    /// First cover image URL discovered on the release page.
    pub cover_url: Option<String>,
    /// Raw bytes of the fetched cover image.
    pub cover_image: Option<Vec<u8>>,
}

impl ReleaseCrawl {
    fn new(external_id: i64) -> Self {
        Self {
            external_id,
            ..Default::default()
        }
    }
}

/// What a delivered response turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivered {
    /// An HTML page; facts were appended. Carries the cover URL it points at.
    Page { cover_url: Option<String> },
    /// An image; bytes were stored on the accumulator.
    Image,
    /// Neither HTML nor an image; nothing was recorded.
    Ignored { content_type: String },
}

/// A response or failure that cannot be attributed to a release.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("response for request {0} has no release context")]
    UnknownRequest(RequestId),
    #[error("request {request_id} belongs to external id {external_id}, which is not being crawled")]
    ReleaseNotInFlight {
        request_id: RequestId,
        external_id: i64,
    },
}

/// Per-run mapping from in-flight requests to release accumulators.
pub struct CrawlRouter {
    base_url: Url,
    next_request: RequestId,
    requests: HashMap<RequestId, i64>,
    arena: HashMap<i64, ReleaseCrawl>,
}

impl CrawlRouter {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            next_request: 1,
            requests: HashMap::new(),
            arena: HashMap::new(),
        }
    }

    /// Open an empty accumulator for a release, replacing any leftover one.
    pub fn begin(&mut self, external_id: i64) {
        self.arena
            .insert(external_id, ReleaseCrawl::new(external_id));
    }

    /// Register an outbound request on behalf of a release.
    pub fn dispatch(&mut self, external_id: i64) -> RequestContext {
        let request_id = self.next_request;
        self.next_request += 1;
        self.requests.insert(request_id, external_id);
        RequestContext { request_id }
    }

    /// Route a completed response to its release and run the handler for
    /// its content type. Each request completes at most once.
    pub fn deliver(
        &mut self,
        ctx: RequestContext,
        resource: &FetchedResource,
    ) -> Result<Delivered, RouteError> {
        let external_id = self
            .requests
            .remove(&ctx.request_id)
            .ok_or(RouteError::UnknownRequest(ctx.request_id))?;
        let crawl = self
            .arena
            .get_mut(&external_id)
            .ok_or(RouteError::ReleaseNotInFlight {
                request_id: ctx.request_id,
                external_id,
            })?;
        if let Some(bytes) = image_payload(resource) {
            on_image(crawl, bytes);
            return Ok(Delivered::Image);
        }
        match resource.content_type.as_deref() {
            None => Ok(on_page(crawl, &resource.text(), &self.base_url)),
            Some(ct) if ct.to_ascii_lowercase().contains("html") => {
                Ok(on_page(crawl, &resource.text(), &self.base_url))
            }
            Some(ct) => Ok(Delivered::Ignored {
                content_type: ct.to_string(),
            }),
        }
    }

    /// Retire a request whose fetch failed. Returns the release it belonged to.
    pub fn fail(&mut self, ctx: RequestContext) -> Result<i64, RouteError> {
        self.requests
            .remove(&ctx.request_id)
            .ok_or(RouteError::UnknownRequest(ctx.request_id))
    }

    /// Hand a release's accumulator back, dropping any requests still
    /// registered for it.
    pub fn finish(&mut self, external_id: i64) -> Option<ReleaseCrawl> {
        self.requests.retain(|_, ext| *ext != external_id);
        self.arena.remove(&external_id)
    }

    /// Number of requests dispatched but not yet delivered or failed.
    pub fn in_flight(&self) -> usize {
        self.requests.len()
    }
}

/// Page handler: append extracted facts, remember the first cover URL.
fn on_page(crawl: &mut ReleaseCrawl, html: &str, base_url: &Url) -> Delivered {
    let page = extract_page(html, base_url);
    crawl.facts.extend(page.facts);
    if crawl.cover_url.is_none() {
        crawl.cover_url = page.cover_url.clone();
    }
    Delivered::Page {
        cover_url: page.cover_url,
    }
}

/// Image handler: keep the raw bytes for the orchestrator to persist.
fn on_image(crawl: &mut ReleaseCrawl, bytes: &[u8]) {
    crawl.cover_image = Some(bytes.to_vec());
}
