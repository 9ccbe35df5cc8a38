//! End-to-end enrichment against a local HTTP server standing in for the
//! external music site, with the real fetcher and the SQLite store.

use axum::http::header;
use axum::response::{Html, IntoResponse, Redirect};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use tempfile::TempDir;

use spindle::catalog::add_release;
use spindle::config::{Config, CoversConfig, CrawlerConfig, DbConfig};
use spindle::db;
use spindle::enrich::Enricher;
use spindle::fetch::{Fetcher, HttpFetcher};
use spindle::migrate::run_migrations;
use spindle::sqlite_store::SqliteStore;
use spindle_core::models::{ListOrder, NewRelease};
use spindle_core::store::ReleaseStore;

const COVER_BYTES: &[u8] = b"\xff\xd8\xff\xe0fake-jpeg";

async fn dummy_page() -> Html<&'static str> {
    Html(
        r#"<html><body>
        <a class="cover-art" href="/music/Portishead/Dummy/+images"><img src="/covers/dummy.jpg" alt="Dummy"></a>
        <dl>
          <dt>Length</dt><dd class="catalogue-metadata-description">11 tracks, 49:17</dd>
          <dt>Release Date</dt><dd class="catalogue-metadata-description">22 August 1994</dd>
        </dl>
        <ul class="tags-list">
          <li><a href="/tag/trip-hop">trip-hop</a></li>
          <li><a href="/tag/electronic">electronic</a></li>
          <li><a href="/tag/trip-hop">trip-hop</a></li>
          <li><a href="/tag/1990s">1990s</a></li>
        </ul>
        </body></html>"#,
    )
}

async fn offsite_cover_page() -> Html<&'static str> {
    Html(
        r#"<html><body>
        <a class="cover-art"><img src="https://elsewhere.example/cover.jpg"></a>
        <dd class="catalogue-metadata-description">1 June 2007</dd>
        <a href="/tag/electronic">electronic</a>
        </body></html>"#,
    )
}

async fn cover() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/jpeg")], COVER_BYTES)
}

async fn hung_page() -> Html<&'static str> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Html("<html><body>too late</body></html>")
}

async fn big_page() -> Html<String> {
    Html(format!("<html><body>{}</body></html>", "x".repeat(2048)))
}

async fn start_site() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Same server under a host name that is not on the allow-list.
    let offsite = format!("http://localhost:{}/offsite", addr.port());

    let app = Router::new()
        .route("/music/Portishead/Dummy", get(dummy_page))
        .route("/music/Burial/Untrue", get(offsite_cover_page))
        .route("/covers/dummy.jpg", get(cover))
        .route("/music/Slow/Sleeper", get(hung_page))
        .route("/music/Huge/Page", get(big_page))
        .route(
            "/music/Old/Name",
            get(|| async { Redirect::temporary("/music/Portishead/Dummy") }),
        )
        .route("/music/A/B", get(|| async { Redirect::temporary("/jump") }))
        .route(
            "/jump",
            get(move || async move { Redirect::temporary(&offsite) }),
        )
        .route("/offsite", get(dummy_page));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config(tmp: &TempDir, addr: SocketAddr) -> Config {
    Config {
        db: DbConfig {
            path: tmp.path().join("data/spindle.sqlite"),
        },
        crawler: CrawlerConfig {
            base_url: format!("http://{}", addr),
            allowed_domains: vec!["127.0.0.1".to_string()],
            timeout_secs: 5,
            ..CrawlerConfig::default()
        },
        covers: CoversConfig {
            dir: tmp.path().join("covers"),
        },
    }
}

async fn seeded_store(cfg: &Config) -> SqliteStore {
    store_with(
        cfg,
        &[
            (1001, "Portishead", "Dummy"),
            (1002, "Burial", "Untrue"),
            (1003, "Nobody", "Nothing Here"),
        ],
    )
    .await
}

async fn store_with(cfg: &Config, releases: &[(i64, &str, &str)]) -> SqliteStore {
    run_migrations(cfg).await.unwrap();
    let store = SqliteStore::new(db::connect(cfg).await.unwrap());
    for &(external_id, artist, title) in releases {
        add_release(
            &store,
            NewRelease {
                external_id,
                artist: artist.to_string(),
                title: title.to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }
    store
}

#[tokio::test]
async fn test_enrich_over_http_updates_catalog() {
    let addr = start_site().await;
    let tmp = TempDir::new().unwrap();
    let cfg = config(&tmp, addr);
    let store = seeded_store(&cfg).await;
    let fetcher = HttpFetcher::new(&cfg.crawler).unwrap();

    let pending = store
        .list_needing_enrichment(ListOrder::default())
        .await
        .unwrap();
    assert_eq!(pending.len(), 3);

    let log = Enricher::new(&store, &fetcher, &cfg)
        .unwrap()
        .enrich(&pending)
        .await;

    let all = store.list_releases(ListOrder::default()).await.unwrap();
    let dummy = all.iter().find(|r| r.external_id == 1001).unwrap();
    assert_eq!(dummy.year, 1994);
    assert_eq!(dummy.tags, vec!["trip-hop", "electronic", "1990s"]);
    assert_eq!(dummy.cover_image_path, "1001.jpg");
    assert_eq!(
        std::fs::read(tmp.path().join("covers/1001.jpg")).unwrap(),
        COVER_BYTES
    );
    assert!(dummy.is_fully_enriched());

    // Page facts still land when the cover is on a forbidden host.
    let untrue = all.iter().find(|r| r.external_id == 1002).unwrap();
    assert_eq!(untrue.year, 2007);
    assert_eq!(untrue.tags, vec!["electronic", "2000s"]);
    assert_eq!(untrue.cover_image_path, "");

    // No page at all: 404, nothing written.
    let nothing = all.iter().find(|r| r.external_id == 1003).unwrap();
    assert_eq!(nothing.year, 0);
    assert!(nothing.tags.is_empty());

    let errors: Vec<&String> = log.error_lines().collect();
    assert_eq!(errors.len(), 2, "log was:\n{}", log);
    assert!(errors
        .iter()
        .any(|l| l.contains("Burial - Untrue") && l.contains("Forbidden domain: elsewhere.example")));
    assert!(errors
        .iter()
        .any(|l| l.contains("Nobody - Nothing Here") && l.contains("404")));
    assert_eq!(log.stats.updated, 2);
    assert_eq!(log.stats.failed, 1);

    let text = log.to_string();
    assert!(text.ends_with("2 updated, 0 unchanged, 0 skipped, 1 failed, 0 deferred\n"));

    store.close().await;
}

#[tokio::test]
async fn test_second_run_skips_enriched_and_is_stable() {
    let addr = start_site().await;
    let tmp = TempDir::new().unwrap();
    let cfg = config(&tmp, addr);
    let store = seeded_store(&cfg).await;
    let fetcher = HttpFetcher::new(&cfg.crawler).unwrap();
    let enricher = Enricher::new(&store, &fetcher, &cfg).unwrap();

    let first = store
        .list_needing_enrichment(ListOrder::default())
        .await
        .unwrap();
    enricher.enrich(&first).await;
    let after_first = store.list_releases(ListOrder::default()).await.unwrap();

    // Dummy is complete now and drops out of the eligibility query.
    let second = store
        .list_needing_enrichment(ListOrder::default())
        .await
        .unwrap();
    assert_eq!(second.len(), 2);
    assert!(second.iter().all(|r| r.external_id != 1001));

    enricher.enrich(&after_first).await;
    let after_second = store.list_releases(ListOrder::default()).await.unwrap();
    assert_eq!(after_first, after_second);

    store.close().await;
}

#[tokio::test]
async fn test_redirect_to_forbidden_host_is_refused() {
    let addr = start_site().await;
    let tmp = TempDir::new().unwrap();
    let cfg = config(&tmp, addr);
    let fetcher = HttpFetcher::new(&cfg.crawler).unwrap();

    // /music/A/B -> /jump -> http://localhost:<port>/offsite
    let err = fetcher
        .fetch(&format!("http://{}/music/A/B", addr))
        .await
        .unwrap_err();
    let msg = format!("{:#}", err);
    assert!(msg.contains("Forbidden domain: localhost"), "error was: {}", msg);

    // Redirects that stay on an allowed host are followed.
    let page = fetcher
        .fetch(&format!("http://{}/music/Old/Name", addr))
        .await
        .unwrap();
    assert!(page.text().contains("catalogue-metadata-description"));
}

#[tokio::test]
async fn test_hung_host_times_out_as_release_error() {
    let addr = start_site().await;
    let tmp = TempDir::new().unwrap();
    let mut cfg = config(&tmp, addr);
    cfg.crawler.timeout_secs = 1;
    let store = store_with(
        &cfg,
        &[(2001, "Slow", "Sleeper"), (2002, "Portishead", "Dummy")],
    )
    .await;
    let fetcher = HttpFetcher::new(&cfg.crawler).unwrap();

    let pending = store
        .list_needing_enrichment(ListOrder::parse("artist", "desc"))
        .await
        .unwrap();
    assert_eq!(pending[0].external_id, 2001);

    let log = Enricher::new(&store, &fetcher, &cfg)
        .unwrap()
        .enrich(&pending)
        .await;

    let errors: Vec<&String> = log.error_lines().collect();
    assert_eq!(errors.len(), 1, "log was:\n{}", log);
    assert!(errors[0].contains("Slow - Sleeper"));
    assert!(errors[0].contains("timed out after 1s"));

    // The run moved on to the next release.
    let all = store.list_releases(ListOrder::default()).await.unwrap();
    let dummy = all.iter().find(|r| r.external_id == 2002).unwrap();
    assert_eq!(dummy.year, 1994);
    assert_eq!(log.stats.failed, 1);
    assert_eq!(log.stats.updated, 1);

    store.close().await;
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let addr = start_site().await;
    let tmp = TempDir::new().unwrap();
    let mut cfg = config(&tmp, addr);
    cfg.crawler.max_body_bytes = 1024;
    let fetcher = HttpFetcher::new(&cfg.crawler).unwrap();

    let err = fetcher
        .fetch(&format!("http://{}/music/Huge/Page", addr))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("exceeds the 1024 byte limit"));

    // Small pages still fit.
    fetcher
        .fetch(&format!("http://{}/music/Portishead/Dummy", addr))
        .await
        .unwrap();
}
