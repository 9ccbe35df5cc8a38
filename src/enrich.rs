//! Enrichment run orchestration.
//!
//! Walks a batch of releases in order and, for each one that is not yet
//! fully enriched:
//!
//! 1. builds the release page URL and fetches it through the
//!    [`CrawlRouter`], which attributes the response to the release;
//! 2. fetches the cover art the page points at (only while the release
//!    has no stored cover), saves it, and records its path;
//! 3. merges the page's raw facts with the release's stored tags, runs
//!    the tag normalizer, and writes tags and year by external id.
//!
//! Releases are processed strictly one after another, so at most one
//! request is in flight. A failure for one release is written to the
//! [`RunLog`] and the run moves on to the next release.

use anyhow::{Context, Result};
use reqwest::Url;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use spindle_core::models::{ListOrder, Release};
use spindle_core::store::ReleaseStore;
use spindle_core::tags::normalize;
use spindle_core::url::release_url;

use crate::config::Config;
use crate::covers::save_cover;
use crate::db;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::router::{CrawlRouter, Delivered, ReleaseCrawl, RequestContext};
use crate::runlog::RunLog;
use crate::sqlite_store::SqliteStore;

/// How one release's crawl ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Tags and year were written.
    Updated,
    /// The page yielded no facts, or no row matched the external id.
    Unchanged,
}

/// Drives one enrichment run against a store and a fetcher.
pub struct Enricher<'a> {
    store: &'a dyn ReleaseStore,
    fetcher: &'a dyn Fetcher,
    base_url: Url,
    covers_dir: PathBuf,
    run_deadline: Option<Duration>,
}

impl<'a> Enricher<'a> {
    pub fn new(store: &'a dyn ReleaseStore, fetcher: &'a dyn Fetcher, config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.crawler.base_url)
            .with_context(|| format!("Invalid crawler.base_url: {}", config.crawler.base_url))?;
        let run_deadline = match config.crawler.run_deadline_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Ok(Self {
            store,
            fetcher,
            base_url,
            covers_dir: config.covers.dir.clone(),
            run_deadline,
        })
    }

    /// Override the overall run deadline.
    pub fn with_run_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.run_deadline = deadline;
        self
    }

    /// Enrich `releases` in order and return the run log.
    pub async fn enrich(&self, releases: &[Release]) -> RunLog {
        let mut log = RunLog::new();
        log.start(releases.len());
        info!(queued = releases.len(), "enrichment run started");

        let started = Instant::now();
        let mut router = CrawlRouter::new(self.base_url.clone());

        for (i, release) in releases.iter().enumerate() {
            if release.is_fully_enriched() {
                debug!(external_id = release.external_id, "already enriched, skipping");
                log.stats.skipped += 1;
                continue;
            }

            if let Some(deadline) = self.run_deadline {
                if started.elapsed() >= deadline {
                    let deferred = releases[i..]
                        .iter()
                        .filter(|r| !r.is_fully_enriched())
                        .count();
                    log.stats.deferred = deferred;
                    log.note(format!(
                        "Run deadline of {}s reached; {} releases deferred to the next run",
                        deadline.as_secs(),
                        deferred
                    ));
                    warn!(deferred, "run deadline reached");
                    break;
                }
            }

            let label = release.label();
            match self.enrich_release(&mut router, release, &mut log).await {
                Ok(Outcome::Updated) => log.stats.updated += 1,
                Ok(Outcome::Unchanged) => log.stats.unchanged += 1,
                Err(e) => {
                    error!(external_id = release.external_id, error = %format!("{:#}", e), "enrichment failed");
                    log.error(&label, format!("{:#}", e));
                    log.stats.failed += 1;
                }
            }
        }

        log.finish();
        info!(
            updated = log.stats.updated,
            failed = log.stats.failed,
            "enrichment run completed"
        );
        log
    }

    async fn enrich_release(
        &self,
        router: &mut CrawlRouter,
        release: &Release,
        log: &mut RunLog,
    ) -> Result<Outcome> {
        router.begin(release.external_id);
        let crawled = self.crawl(router, release, log).await;
        let crawl = router.finish(release.external_id);
        crawled?;

        let Some(crawl) = crawl else {
            // The accumulator was dropped by an unattributable event.
            return Ok(Outcome::Unchanged);
        };
        self.persist(release, crawl, log).await
    }

    /// Fetch the release page and, when needed, its cover image.
    async fn crawl(&self, router: &mut CrawlRouter, release: &Release, log: &mut RunLog) -> Result<()> {
        let url = release_url(self.base_url.as_str(), &release.artist, &release.title);
        debug!(external_id = release.external_id, %url, "fetching release page");

        let ctx = router.dispatch(release.external_id);
        let cover_url = match self.fetch_and_deliver(router, ctx, &url, log).await? {
            Some(Delivered::Page { cover_url }) => cover_url,
            _ => None,
        };

        let Some(cover_url) = cover_url else {
            return Ok(());
        };
        if !release.cover_image_path.is_empty() {
            return Ok(());
        }

        let ctx = router.dispatch(release.external_id);
        if let Err(e) = self.fetch_and_deliver(router, ctx, &cover_url, log).await {
            // A missing cover does not invalidate the page's tags.
            warn!(external_id = release.external_id, error = %e, "cover image fetch failed");
            log.error(&release.label(), format!("cover image: {:#}", e));
        }
        Ok(())
    }

    /// Fetch `url` under `ctx` and route the response. `Ok(None)` means the
    /// response could not be attributed and was dropped.
    async fn fetch_and_deliver(
        &self,
        router: &mut CrawlRouter,
        ctx: RequestContext,
        url: &str,
        log: &mut RunLog,
    ) -> Result<Option<Delivered>> {
        let resource = match self.fetcher.fetch(url).await {
            Ok(resource) => resource,
            Err(e) => {
                if let Err(route_err) = router.fail(ctx) {
                    error!(error = %route_err, "failed request has no release context");
                    log.internal_error(&route_err);
                }
                return Err(e.context(format!("fetching {}", url)));
            }
        };

        match router.deliver(ctx, &resource) {
            Ok(delivered) => {
                if let Delivered::Ignored { content_type } = &delivered {
                    debug!(%url, content_type = %content_type, "ignoring response");
                }
                Ok(Some(delivered))
            }
            Err(route_err) => {
                error!(error = %route_err, %url, "dropping unattributed response");
                log.internal_error(format!("{} (dropped response from {})", route_err, url));
                Ok(None)
            }
        }
    }

    /// Save the cover and write normalized tags and year.
    async fn persist(&self, release: &Release, crawl: ReleaseCrawl, log: &mut RunLog) -> Result<Outcome> {
        let label = release.label();

        if let Some(bytes) = crawl.cover_image.as_deref() {
            match self.store_cover(release.external_id, bytes).await {
                Ok(path) => info!(external_id = release.external_id, path = %path, "stored cover image"),
                Err(e) => {
                    warn!(external_id = release.external_id, error = %e, "cover image not stored");
                    log.error(&label, format!("cover image: {:#}", e));
                }
            }
        }

        if crawl.facts.is_empty() {
            debug!(external_id = release.external_id, "page yielded no facts");
            return Ok(Outcome::Unchanged);
        }

        let mut raw = self
            .store
            .fetch_tags(release.id)
            .await
            .with_context(|| format!("reading stored tags of release {}", release.id))?;
        raw.extend(crawl.facts.into_vec());
        // A page without a release date keeps the year already on file;
        // a dated page always wins.
        let normalized = normalize(&raw, release.year);

        let rows = self
            .store
            .update_tags_and_year(release.external_id, &normalized.tags, normalized.year)
            .await
            .with_context(|| format!("updating tags for external id {}", release.external_id))?;

        if rows == 0 {
            warn!(external_id = release.external_id, "no release row matched external id");
            log.warning(&label, "no release row matched the external id; update skipped");
            return Ok(Outcome::Unchanged);
        }

        info!(
            external_id = release.external_id,
            year = normalized.year,
            tags = normalized.tags.len(),
            "release enriched"
        );
        Ok(Outcome::Updated)
    }

    async fn store_cover(&self, external_id: i64, bytes: &[u8]) -> Result<String> {
        let path = save_cover(&self.covers_dir, external_id, bytes)?;
        self.store
            .update_cover_image(external_id, &path)
            .await
            .with_context(|| format!("recording cover path for external id {}", external_id))?;
        Ok(path)
    }
}

/// CLI entry point: enrich every release that still needs it and print
/// the run log on stdout.
pub async fn run_enrich(config: &Config, limit: Option<usize>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let fetcher = HttpFetcher::new(&config.crawler)?;

    let mut releases = store.list_needing_enrichment(ListOrder::default()).await?;
    if let Some(lim) = limit {
        releases.truncate(lim);
    }

    let enricher = Enricher::new(&store, &fetcher, config)?;
    let log = enricher.enrich(&releases).await;
    print!("{}", log);

    store.close().await;
    Ok(())
}
