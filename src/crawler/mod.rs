//! Crawl machinery: frontier, fetcher, and the worker-pool scheduler

mod fetcher;
mod frontier;
mod scheduler;

pub use fetcher::{FetchOutcome, Fetcher, RedirectHop};
pub use frontier::{ClaimedUrl, EnqueueOutcome, Frontier, FrontierCounts, UrlState};
pub use scheduler::{Accumulator, CrawlScheduler};

use crate::config::HttpConfig;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Builds the single HTTP client shared by every worker in a run
///
/// Redirects are disabled at the transport level: the fetcher follows them
/// itself so every hop lands in the recorded chain.
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.request_timeout_secs.min(10)))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}
