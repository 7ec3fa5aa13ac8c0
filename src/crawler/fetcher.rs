//! HTTP fetcher: politeness-gated requests with manual redirect handling
//!
//! The transport client never follows redirects on its own; the fetcher
//! walks them hop by hop so the full chain is captured, and aborts with a
//! redirect-loop error the moment a normalized URL recurs within a chain.
//! Transient failures (configured retryable status codes, timeouts,
//! connection errors) are retried with exponential backoff before the fetch
//! is declared failed.

use crate::config::HttpConfig;
use crate::robots::PolitenessPolicy;
use crate::url::normalize_url;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

/// One redirect response in a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectHop {
    pub url: String,
    pub status: u16,
}

/// Why a fetch never produced a terminal response
#[derive(Debug, Clone, Error)]
pub enum FetchErrorKind {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("redirect loop: {0}")]
    RedirectLoop(String),

    #[error("too many redirects ({0} hops)")]
    TooManyRedirects(usize),
}

impl FetchErrorKind {
    pub fn is_redirect_loop(&self) -> bool {
        matches!(self, Self::RedirectLoop(_))
    }
}

/// Result of one fetch attempt, consumed immediately by the scheduler
#[derive(Debug)]
pub struct FetchOutcome {
    /// URL of the terminal response, after redirects
    pub final_url: Option<Url>,
    /// Terminal status; None when the fetch failed outright
    pub status: Option<u16>,
    pub redirect_chain: Vec<RedirectHop>,
    pub content_type: Option<String>,
    pub body: Option<String>,
    pub elapsed: Duration,
    pub error: Option<FetchErrorKind>,
}

impl FetchOutcome {
    fn failed(chain: Vec<RedirectHop>, elapsed: Duration, error: FetchErrorKind) -> Self {
        Self {
            final_url: None,
            status: None,
            redirect_chain: chain,
            content_type: None,
            body: None,
            elapsed,
            error: Some(error),
        }
    }
}

/// Politeness-aware fetcher shared by all workers
pub struct Fetcher {
    client: Client,
    policy: Arc<PolitenessPolicy>,
    config: HttpConfig,
}

impl Fetcher {
    pub fn new(client: Client, policy: Arc<PolitenessPolicy>, config: HttpConfig) -> Self {
        Self {
            client,
            policy,
            config,
        }
    }

    /// Fetches a URL, following redirects manually
    ///
    /// Waits for the host's politeness slot before every request, including
    /// each redirect hop (hops may change hosts).
    pub async fn fetch(&self, start: &Url) -> FetchOutcome {
        let started = Instant::now();
        let mut chain: Vec<RedirectHop> = Vec::new();
        let mut seen = vec![chain_key(start)];
        let mut current = start.clone();

        loop {
            if chain.len() >= self.config.max_redirects {
                return FetchOutcome::failed(
                    chain,
                    started.elapsed(),
                    FetchErrorKind::TooManyRedirects(self.config.max_redirects),
                );
            }

            let response = match self.request_with_retry(&current).await {
                Ok(response) => response,
                Err(error) => return FetchOutcome::failed(chain, started.elapsed(), error),
            };

            let status = response.status();
            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);

                // A 3xx without a Location header is a terminal response
                let Some(location) = location else {
                    return self
                        .terminal_outcome(response, chain, started.elapsed())
                        .await;
                };

                chain.push(RedirectHop {
                    url: current.to_string(),
                    status: status.as_u16(),
                });

                let next = match current.join(&location) {
                    Ok(next) => next,
                    Err(e) => {
                        return FetchOutcome::failed(
                            chain,
                            started.elapsed(),
                            FetchErrorKind::Transport(format!(
                                "unresolvable Location '{}': {}",
                                location, e
                            )),
                        )
                    }
                };

                let key = chain_key(&next);
                if seen.contains(&key) {
                    tracing::warn!("Redirect loop at {} (chain of {} hops)", next, chain.len());
                    return FetchOutcome::failed(
                        chain,
                        started.elapsed(),
                        FetchErrorKind::RedirectLoop(key),
                    );
                }
                seen.push(key);
                current = next;
                continue;
            }

            return self
                .terminal_outcome(response, chain, started.elapsed())
                .await;
        }
    }

    async fn terminal_outcome(
        &self,
        response: reqwest::Response,
        chain: Vec<RedirectHop>,
        elapsed: Duration,
    ) -> FetchOutcome {
        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match response.text().await {
            Ok(body) => FetchOutcome {
                final_url: Some(final_url),
                status: Some(status),
                redirect_chain: chain,
                content_type,
                body: Some(body),
                elapsed,
                error: None,
            },
            Err(e) => FetchOutcome {
                final_url: Some(final_url),
                status: Some(status),
                redirect_chain: chain,
                content_type,
                body: None,
                elapsed,
                error: Some(FetchErrorKind::Transport(format!(
                    "failed to read body: {}",
                    e
                ))),
            },
        }
    }

    /// One request with transient-failure retries
    ///
    /// Retryable: configured status codes, timeouts, connection errors.
    /// Exhausted retries on a retryable status return the response itself:
    /// a completed fetch with a bad status is reported, not errored.
    async fn request_with_retry(
        &self,
        url: &Url,
    ) -> Result<reqwest::Response, FetchErrorKind> {
        let mut attempt: u32 = 0;

        loop {
            self.policy.wait_turn(url).await;

            let mut request = self.client.get(url.clone());
            if let (Some(user), Some(password)) =
                (&self.config.auth_username, &self.config.auth_password)
            {
                request = request.basic_auth(user, Some(password));
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if self.config.retryable_status_codes.contains(&status)
                        && attempt < self.config.retry_count
                    {
                        tracing::debug!(
                            "HTTP {} from {} (attempt {}), retrying",
                            status,
                            url,
                            attempt + 1
                        );
                        self.backoff(attempt).await;
                        attempt += 1;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.config.retry_count => {
                    tracing::debug!("{} for {} (attempt {}), retrying", e, url, attempt + 1);
                    self.backoff(attempt).await;
                    attempt += 1;
                }
                Err(e) if e.is_timeout() => return Err(FetchErrorKind::Timeout),
                Err(e) if e.is_connect() => return Err(FetchErrorKind::Connect(e.to_string())),
                Err(e) => return Err(FetchErrorKind::Transport(e.to_string())),
            }
        }
    }

    async fn backoff(&self, attempt: u32) {
        let seconds = self.config.retry_backoff_secs * 2f64.powi(attempt as i32);
        if seconds > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
        }
    }
}

/// Normalized key used for loop detection within one chain
fn chain_key(url: &Url) -> String {
    normalize_url(url.as_str())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}
