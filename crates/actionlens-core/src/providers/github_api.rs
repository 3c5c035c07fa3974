use crate::config::Settings;
use crate::reference::{
    ActionRepoMetadata, ActionRepoStore, CommitProbe, FetchResult, InMemoryActionRepoStore,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::blocking::Response;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use std::cell::RefCell;
use std::time::Duration;

const PER_PAGE: usize = 100;

/// GitHub REST client for reference-classification lookups.
///
/// All calls are synchronous and strictly sequential. Network failures retry a
/// bounded number of times with a fixed delay; HTTP error statuses do not
/// retry. Every public lookup degrades to a classified value instead of
/// propagating an error, so one unreachable repository never aborts a batch.
pub struct GitHubClient {
    client: reqwest::blocking::Client,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
    rate_limit_threshold: u64,
    rate: RefCell<RateLimitWindow>,
}

#[derive(Debug, Default, Clone, Copy)]
struct RateLimitWindow {
    remaining: Option<u64>,
    reset_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct NamedEntry {
    name: String,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_settings(token, &Settings::default())
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::with_settings(settings.token(), settings)
    }

    fn with_settings(token: Option<String>, settings: &Settings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("actionlens/0.3"));

        if let Some(ref t) = token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", t)).context("Invalid GitHub token")?,
            );
        }

        let client = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: "https://api.github.com".to_string(),
            max_retries: settings.api_max_retries,
            retry_delay: Duration::from_secs(settings.api_retry_delay_secs),
            rate_limit_threshold: settings.rate_limit_threshold,
            rate: RefCell::new(RateLimitWindow::default()),
        })
    }

    /// Fetch tag and branch listings for one `owner/repo` slug.
    pub fn fetch_repo_metadata(&self, slug: &str) -> ActionRepoMetadata {
        ActionRepoMetadata {
            tags: self.fetch_named_list(slug, "tags"),
            branches: self.fetch_named_list(slug, "branches"),
        }
    }

    fn fetch_named_list(&self, slug: &str, kind: &str) -> FetchResult {
        let mut names = Vec::new();
        let mut page = 1;

        loop {
            let url = format!(
                "{}/repos/{}/{}?per_page={}&page={}",
                self.base_url, slug, kind, PER_PAGE, page
            );
            let response = match self.get_with_retries(&url) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Warning: failed to fetch {} for {}: {}", kind, slug, e);
                    return FetchResult::failed();
                }
            };

            if !response.status().is_success() {
                eprintln!(
                    "Warning: {} listing for {} returned {}",
                    kind,
                    slug,
                    response.status()
                );
                return FetchResult::failed();
            }

            let entries: Vec<NamedEntry> = match response.json() {
                Ok(entries) => entries,
                Err(e) => {
                    eprintln!("Warning: failed to parse {} for {}: {}", kind, slug, e);
                    return FetchResult::failed();
                }
            };

            let last_page = entries.len() < PER_PAGE;
            names.extend(entries.into_iter().map(|e| e.name));
            if last_page {
                break;
            }
            page += 1;
        }

        FetchResult::ok(names)
    }

    /// Issue one GET, retrying network-class failures only.
    fn get_with_retries(&self, url: &str) -> Result<Response> {
        self.pause_if_rate_limited();

        let mut attempt = 0;
        loop {
            match self.client.get(url).send() {
                Ok(response) => {
                    self.record_rate_limit(&response);
                    return Ok(response);
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(e).with_context(|| format!("request failed: {url}"));
                    }
                    attempt += 1;
                    std::thread::sleep(self.retry_delay);
                }
            }
        }
    }

    fn record_rate_limit(&self, response: &Response) {
        let header_u64 = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
        };

        let mut rate = self.rate.borrow_mut();
        if let Some(remaining) = header_u64("x-ratelimit-remaining") {
            rate.remaining = Some(remaining);
        }
        if let Some(reset) = header_u64("x-ratelimit-reset") {
            rate.reset_at = DateTime::from_timestamp(reset as i64, 0);
        }
    }

    /// Cooperative pause: when the remaining quota is nearly spent, sleep
    /// until the window resets, then resume. Work already done stays valid.
    fn pause_if_rate_limited(&self) {
        let window = *self.rate.borrow();
        let (Some(remaining), Some(reset_at)) = (window.remaining, window.reset_at) else {
            return;
        };
        if remaining >= self.rate_limit_threshold {
            return;
        }

        if let Some(wait) = wait_until(reset_at, Utc::now()) {
            eprintln!(
                "Rate limit nearly exhausted ({} remaining); pausing {}s until reset",
                remaining,
                wait.as_secs()
            );
            std::thread::sleep(wait);
        }
        *self.rate.borrow_mut() = RateLimitWindow::default();
    }
}

/// Seconds to sleep until just past `reset_at`, or None if already past.
fn wait_until(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<Duration> {
    let seconds = (reset_at - now).num_seconds();
    if seconds < 0 {
        return None;
    }
    // One extra second so the reset has definitely landed.
    Some(Duration::from_secs(seconds as u64 + 1))
}

impl CommitProbe for GitHubClient {
    /// `GET /repos/{slug}/commits/{short_sha}`: 200 means the commit exists,
    /// 404 means it does not, anything else degrades to "not found".
    fn commit_exists(&self, slug: &str, short_sha: &str) -> bool {
        let url = format!("{}/repos/{}/commits/{}", self.base_url, slug, short_sha);
        match self.get_with_retries(&url) {
            Ok(response) => match response.status() {
                StatusCode::OK => true,
                StatusCode::NOT_FOUND => false,
                status => {
                    eprintln!("Warning: commit lookup {}@{} returned {}", slug, short_sha, status);
                    false
                }
            },
            Err(e) => {
                eprintln!("Warning: commit lookup {}@{} failed: {}", slug, short_sha, e);
                false
            }
        }
    }
}

/// Metadata store that fetches tag/branch listings on first use.
///
/// Backed by the live client, with an optional pre-fetched store consulted
/// first. Fetch results (including failures) are cached so each slug costs at
/// most one pair of listing calls per run.
pub struct CachingMetadataStore<'c> {
    client: &'c GitHubClient,
    seed: Option<InMemoryActionRepoStore>,
    cache: RefCell<std::collections::HashMap<String, ActionRepoMetadata>>,
}

impl<'c> CachingMetadataStore<'c> {
    pub fn new(client: &'c GitHubClient, seed: Option<InMemoryActionRepoStore>) -> Self {
        Self {
            client,
            seed,
            cache: RefCell::new(std::collections::HashMap::new()),
        }
    }
}

impl ActionRepoStore for CachingMetadataStore<'_> {
    fn lookup(&self, slug: &str) -> Option<ActionRepoMetadata> {
        if let Some(seed) = &self.seed {
            if let Some(meta) = seed.lookup(slug) {
                return Some(meta);
            }
        }
        if let Some(meta) = self.cache.borrow().get(slug) {
            return Some(meta.clone());
        }
        let meta = self.client.fetch_repo_metadata(slug);
        self.cache
            .borrow_mut()
            .insert(slug.to_string(), meta.clone());
        Some(meta)
    }
}
