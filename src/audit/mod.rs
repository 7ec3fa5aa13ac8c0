//! Audit orchestration: crawl, aggregate, report
//!
//! [`SiteAudit`] wires one run together: a shared HTTP client, one
//! politeness policy, the scope filter, the frontier, and the worker-pool
//! scheduler. Aggregation (duplicates, link graph, sitemap, issues) starts
//! strictly after the crawl has drained, never concurrently with it, and
//! feeds the immutable report.

mod duplicates;
pub mod graph;
mod issues;
pub mod sitemap;

use crate::analyzer::{HtmlAnalyzer, LinkRenderer, PageAnalyzer};
use crate::config::{validate, AuditConfig};
use crate::crawler::{build_http_client, CrawlScheduler, Fetcher, Frontier};
use crate::report::{build_report, AuditReport, CrawlCounts, LinkEdge, ReportInputs};
use crate::robots::PolitenessPolicy;
use crate::url::{normalize_url, ScopeFilter};
use crate::{AuditError, Result};
use chrono::Utc;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// One configured audit run
pub struct SiteAudit {
    seed: Url,
    config: AuditConfig,
    analyzer: Arc<dyn PageAnalyzer>,
    renderer: Option<Arc<dyn LinkRenderer>>,
}

impl SiteAudit {
    /// Prepares an audit of the site rooted at `seed_url`
    ///
    /// Fails fast, before any fetch, on an unparsable seed or an invalid
    /// configuration.
    pub fn new(seed_url: &str, config: AuditConfig) -> Result<Self> {
        validate(&config)?;

        let seed = normalize_url(seed_url).map_err(|e| AuditError::InvalidSeed {
            url: seed_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            seed,
            config,
            analyzer: Arc::new(HtmlAnalyzer::new()),
            renderer: None,
        })
    }

    /// Replaces the default static-HTML analyzer
    pub fn with_analyzer(mut self, analyzer: Arc<dyn PageAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Installs the optional JS-rendering link-discovery collaborator
    ///
    /// Only consulted when `crawl.render_js` is enabled; without a renderer
    /// the flag degrades to static link extraction.
    pub fn with_renderer(mut self, renderer: Arc<dyn LinkRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Runs the audit to completion
    pub async fn run(self) -> Result<AuditReport> {
        self.run_with_cancellation(CancellationToken::new()).await
    }

    /// Runs the audit, honoring an external cancellation signal
    ///
    /// Cancellation stops new fetches; in-flight fetches finish or time out
    /// individually, and the crawled-so-far report is still built, flagged
    /// `partial`.
    pub async fn run_with_cancellation(self, cancel: CancellationToken) -> Result<AuditReport> {
        let started_at = Utc::now();
        let root_url = self.seed.to_string();
        tracing::info!("Starting audit of {}", root_url);

        let client = build_http_client(&self.config.http)?;
        let policy = Arc::new(PolitenessPolicy::new(
            client.clone(),
            self.config.http.user_agent.clone(),
            self.config.crawl.respect_robots,
            self.config.crawl.rate_limit_rps,
        ));
        let scope = ScopeFilter::new(&self.seed, &self.config.crawl, &self.config.filters)?;

        let mut frontier = Frontier::new(self.config.crawl.max_pages, self.config.crawl.max_depth);
        frontier.enqueue(&self.seed, self.seed.as_str(), 0, None);

        let fetcher = Fetcher::new(client.clone(), policy.clone(), self.config.http.clone());

        // Deadline arms the same token the caller can cancel
        let deadline = self.config.crawl.max_duration_secs.map(|secs| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                tracing::info!("Audit deadline of {}s reached, stopping crawl", secs);
                cancel.cancel();
            })
        });

        let scheduler = CrawlScheduler::new(
            frontier,
            fetcher,
            policy.clone(),
            scope,
            self.analyzer.clone(),
            self.renderer.clone(),
            self.config.crawl.workers,
            self.config.crawl.respect_robots,
            self.config.crawl.render_js,
            cancel.clone(),
        );

        let (accumulator, frontier) = scheduler.run().await;
        let partial = cancel.is_cancelled();
        if let Some(handle) = deadline {
            handle.abort();
        }

        // Strict barrier: everything below runs over the finished crawl
        let pages = accumulator.pages;
        let edges: Vec<LinkEdge> = accumulator.edges.into_iter().collect();
        let crawled: BTreeSet<String> = pages.iter().map(|p| p.url.clone()).collect();
        let seeds: HashSet<String> = HashSet::from([root_url.clone()]);

        tracing::info!(
            "Crawl finished: {} pages, {} edges; aggregating",
            pages.len(),
            edges.len()
        );

        let duplicate_groups = duplicates::find_duplicate_groups(&pages);
        let link_graph = graph::build_link_graph(&pages, &edges, &seeds);
        let sitemap = sitemap::reconcile(
            &client,
            &policy,
            &self.seed,
            &self.config.sitemap,
            &crawled,
        )
        .await;
        let issues = issues::derive_issues(
            &pages,
            &edges,
            &link_graph,
            &duplicate_groups,
            &sitemap,
            &self.config,
        );

        let frontier_counts = frontier.counts();
        let crawl_counts = CrawlCounts {
            discovered: frontier_counts.discovered,
            fetched: frontier_counts.fetched,
            errored: frontier_counts.errored,
            skipped_scope: frontier_counts.skipped_scope,
            skipped_robots: frontier_counts.skipped_robots,
        };

        Ok(build_report(ReportInputs {
            root_url,
            pages,
            issues,
            edges,
            duplicate_groups,
            link_graph,
            sitemap,
            config_used: self.config,
            crawl_counts,
            started_at,
            partial,
        }))
    }
}

/// Convenience wrapper: audit `seed_url` with `config`
pub async fn run_audit(seed_url: &str, config: AuditConfig) -> Result<AuditReport> {
    SiteAudit::new(seed_url, config)?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_seed_is_fatal() {
        let result = SiteAudit::new("not a url", AuditConfig::default());
        assert!(matches!(result, Err(AuditError::InvalidSeed { .. })));
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let mut config = AuditConfig::default();
        config.crawl.workers = 0;
        let result = SiteAudit::new("https://example.com/", config);
        assert!(matches!(result, Err(AuditError::Config(_))));
    }
}
