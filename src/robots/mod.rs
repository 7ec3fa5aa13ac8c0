//! Politeness policy: robots.txt caching and per-host request pacing
//!
//! One [`PolitenessPolicy`] instance is constructed per audit run and shared
//! by every worker; there is no process-wide state. robots.txt is fetched at
//! most once per host for the lifetime of the run. Request slots are handed
//! out per host, so a slow or delay-heavy host never stalls fetches against
//! a different host.

mod parser;

pub use parser::ParsedRobots;

use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;
use url::Url;

/// Per-host politeness state
struct HostEntry {
    /// Fetched-once robots.txt; `allow_all` stands in for fetch failures
    robots: OnceCell<ParsedRobots>,
    /// Earliest instant the next request to this host may start
    next_slot: std::sync::Mutex<Instant>,
}

impl HostEntry {
    fn new() -> Self {
        Self {
            robots: OnceCell::new(),
            next_slot: std::sync::Mutex::new(Instant::now()),
        }
    }
}

/// Robots rules and per-host rate limiting for one audit run
pub struct PolitenessPolicy {
    client: Client,
    user_agent: String,
    respect_robots: bool,
    /// Configured minimum inter-request interval (None when rate_limit_rps is 0)
    default_interval: Option<Duration>,
    hosts: Mutex<HashMap<String, Arc<HostEntry>>>,
}

impl PolitenessPolicy {
    /// Creates the policy for a run
    ///
    /// # Arguments
    ///
    /// * `client` - The run's shared HTTP client (used only for robots.txt)
    /// * `user_agent` - Agent string matched against robots.txt groups
    /// * `respect_robots` - When false, `is_allowed` always returns true
    /// * `rate_limit_rps` - Requests per second per host; 0 disables pacing
    pub fn new(client: Client, user_agent: String, respect_robots: bool, rate_limit_rps: f64) -> Self {
        let default_interval = if rate_limit_rps > 0.0 {
            Some(Duration::from_secs_f64(1.0 / rate_limit_rps))
        } else {
            None
        };

        Self {
            client,
            user_agent,
            respect_robots,
            default_interval,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    async fn host_entry(&self, host: &str) -> Arc<HostEntry> {
        let mut hosts = self.hosts.lock().await;
        hosts
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(HostEntry::new()))
            .clone()
    }

    /// Fetches robots.txt for the URL's host
    ///
    /// Any failure (network error, non-2xx, unreadable body) degrades to an
    /// unrestricted host, reported at notice level.
    async fn fetch_robots(&self, url: &Url) -> ParsedRobots {
        let robots_url = match url.join("/robots.txt") {
            Ok(u) => u,
            Err(_) => return ParsedRobots::allow_all(),
        };

        match self.client.get(robots_url.clone()).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(content) => {
                    tracing::debug!("Fetched robots.txt from {}", robots_url);
                    ParsedRobots::from_content(&content)
                }
                Err(e) => {
                    tracing::info!("robots.txt body unreadable for {}: {}; treating host as unrestricted", robots_url, e);
                    ParsedRobots::allow_all()
                }
            },
            Ok(response) => {
                tracing::info!(
                    "robots.txt returned HTTP {} for {}; treating host as unrestricted",
                    response.status(),
                    robots_url
                );
                ParsedRobots::allow_all()
            }
            Err(e) => {
                tracing::info!("robots.txt fetch failed for {}: {}; treating host as unrestricted", robots_url, e);
                ParsedRobots::allow_all()
            }
        }
    }

    /// Whether the URL may be fetched under the host's robots rules
    ///
    /// The first call for a host fetches and caches its robots.txt; later
    /// calls answer from the cache.
    pub async fn is_allowed(&self, url: &Url) -> bool {
        if !self.respect_robots {
            return true;
        }

        let Some(host) = url.host_str().map(str::to_string) else {
            return true;
        };

        let entry = self.host_entry(&host).await;
        let robots = entry.robots.get_or_init(|| self.fetch_robots(url)).await;
        robots.is_allowed(url.as_str(), &self.user_agent)
    }

    /// Waits until the URL's host accepts another request, then reserves
    /// the next slot
    ///
    /// The effective interval is the host's robots `Crawl-delay` when one is
    /// declared, otherwise the configured default. With neither, requests
    /// are not paced.
    pub async fn wait_turn(&self, url: &Url) {
        let Some(host) = url.host_str().map(str::to_string) else {
            return;
        };

        let entry = self.host_entry(&host).await;

        let delay = entry
            .robots
            .get()
            .and_then(|r| r.crawl_delay(&self.user_agent))
            .map(Duration::from_secs_f64)
            .or(self.default_interval);

        let Some(delay) = delay else {
            return;
        };

        let slot = {
            let mut next_slot = entry.next_slot.lock().unwrap();
            let slot = (*next_slot).max(Instant::now());
            *next_slot = slot + delay;
            slot
        };

        if slot > Instant::now() {
            tokio::time::sleep_until(slot).await;
        }
    }

    /// Sitemap URLs declared by the host's robots.txt
    ///
    /// Fetches robots.txt if it has not been fetched yet; sitemap discovery
    /// works even when robots enforcement is disabled.
    pub async fn sitemap_hints(&self, url: &Url) -> Vec<String> {
        let Some(host) = url.host_str().map(str::to_string) else {
            return Vec::new();
        };

        let entry = self.host_entry(&host).await;
        let robots = entry.robots.get_or_init(|| self.fetch_robots(url)).await;
        robots.sitemaps()
    }
}
