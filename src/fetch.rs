//! HTTP fetching for the crawler.
//!
//! The [`Fetcher`] trait is the seam between the crawl orchestrator and the
//! network: [`HttpFetcher`] talks to the real site with `reqwest`, tests
//! drive the orchestrator with scripted fetchers.
//!
//! Every fetch is bounded by the client timeout from `crawler.timeout_secs`
//! and reads at most `crawler.max_body_bytes` of body. Hosts outside
//! `crawler.allowed_domains` are refused before any request is sent, and
//! again on every redirect hop. Non-2xx responses are reported as errors.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::CrawlerConfig;

/// A fetched page or image.
#[derive(Debug, Clone)]
pub struct FetchedResource {
    pub url: String,
    pub status: u16,
    /// Value of the `Content-Type` header, if any.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedResource {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Fetches one URL at a time.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedResource>;
}

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// `reqwest`-backed fetcher with timeout, user agent, and domain filter.
pub struct HttpFetcher {
    client: reqwest::Client,
    allowed_domains: Vec<String>,
    timeout_secs: u64,
    max_body_bytes: u64,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .redirect(redirect_policy(config.allowed_domains.clone()))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            allowed_domains: config.allowed_domains.clone(),
            timeout_secs: config.timeout_secs,
            max_body_bytes: config.max_body_bytes,
        })
    }

    fn request_error(&self, err: reqwest::Error, url: &str) -> anyhow::Error {
        if err.is_timeout() {
            anyhow!("{} timed out after {}s", url, self.timeout_secs)
        } else {
            anyhow::Error::new(err).context(format!("Request to {} failed", url))
        }
    }
}

/// Follows at most [`MAX_REDIRECTS`] hops, each to an allowed host.
fn redirect_policy(allowed_domains: Vec<String>) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if !is_allowed(attempt.url(), &allowed_domains) {
            let msg = format!(
                "Forbidden domain: {}",
                attempt.url().host_str().unwrap_or("(none)")
            );
            attempt.error(msg)
        } else {
            attempt.follow()
        }
    })
}

/// Whether `url`'s host is permitted. An empty allow-list permits any host.
pub fn is_allowed(url: &reqwest::Url, allowed_domains: &[String]) -> bool {
    if allowed_domains.is_empty() {
        return true;
    }
    match url.host_str() {
        Some(host) => allowed_domains
            .iter()
            .any(|d| d.eq_ignore_ascii_case(host)),
        None => false,
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedResource> {
        let parsed = reqwest::Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
        if !is_allowed(&parsed, &self.allowed_domains) {
            bail!(
                "Forbidden domain: {}",
                parsed.host_str().unwrap_or("(none)")
            );
        }

        let mut response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| self.request_error(e, url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("{} returned HTTP {}", url, status);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if let Some(len) = response.content_length() {
            if len > self.max_body_bytes {
                bail!(
                    "{} body of {} bytes exceeds the {} byte limit",
                    url,
                    len,
                    self.max_body_bytes
                );
            }
        }
        // Content-Length may be absent or wrong; enforce the cap while reading.
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.request_error(e, url))?
        {
            if (body.len() + chunk.len()) as u64 > self.max_body_bytes {
                bail!(
                    "{} body exceeds the {} byte limit",
                    url,
                    self.max_body_bytes
                );
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchedResource {
            url: url.to_string(),
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}
