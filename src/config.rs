use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use spindle_core::url::DEFAULT_BASE_URL;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub covers: CoversConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CrawlerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Hosts the crawler may fetch from. Empty allows any host.
    #[serde(default = "default_allowed_domains")]
    pub allowed_domains: Vec<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Overall budget for one enrichment run; `0` disables it.
    #[serde(default)]
    pub run_deadline_secs: u64,
    /// Largest response body read from the site.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            allowed_domains: default_allowed_domains(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            run_deadline_secs: 0,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_allowed_domains() -> Vec<String> {
    vec![
        "www.last.fm".to_string(),
        "lastfm.freetls.fastly.net".to_string(),
    ]
}
fn default_user_agent() -> String {
    format!("spindle/{}", env!("CARGO_PKG_VERSION"))
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_body_bytes() -> u64 {
    16 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct CoversConfig {
    #[serde(default = "default_covers_dir")]
    pub dir: PathBuf,
}

impl Default for CoversConfig {
    fn default() -> Self {
        Self {
            dir: default_covers_dir(),
        }
    }
}

fn default_covers_dir() -> PathBuf {
    PathBuf::from("./web/static/covers")
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate crawler
    let base = reqwest::Url::parse(&config.crawler.base_url).with_context(|| {
        format!(
            "crawler.base_url is not a valid URL: '{}'",
            config.crawler.base_url
        )
    })?;
    if !matches!(base.scheme(), "http" | "https") {
        anyhow::bail!("crawler.base_url must use http or https");
    }
    if config.crawler.timeout_secs == 0 {
        anyhow::bail!("crawler.timeout_secs must be > 0");
    }
    if config.crawler.max_body_bytes == 0 {
        anyhow::bail!("crawler.max_body_bytes must be > 0");
    }
    if config.crawler.user_agent.trim().is_empty() {
        anyhow::bail!("crawler.user_agent must not be empty");
    }

    Ok(config)
}
