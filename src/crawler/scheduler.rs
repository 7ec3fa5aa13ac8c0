//! Worker-pool crawl scheduler
//!
//! A fixed number of tokio workers drain the shared frontier. Each worker
//! independently runs the per-URL sequence: robots check → fetch → analyze →
//! feed discovered links back into the frontier at depth + 1. The pool
//! terminates when the frontier is empty AND no worker is mid-flight; both
//! conditions are evaluated under the frontier lock, so a worker claiming
//! the last URL can never race another worker into early exit.

use crate::analyzer::{DiscoveredLink, LinkRenderer, PageAnalyzer};
use crate::crawler::frontier::{ClaimedUrl, Frontier};
use crate::crawler::Fetcher;
use crate::report::{LinkEdge, LinkRel, PageRecord};
use crate::robots::PolitenessPolicy;
use crate::url::{normalize_url, LinkScope, ScopeFilter};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Shared result sink; one lock, never held across an await
#[derive(Debug, Default)]
pub struct Accumulator {
    pub pages: Vec<PageRecord>,
    /// BTreeSet merges duplicate edges and keeps deterministic order
    pub edges: BTreeSet<LinkEdge>,
}

/// What a worker found when it asked the frontier for work
enum Claim {
    Ready(ClaimedUrl),
    Busy,
    Drained,
}

struct WorkerContext {
    frontier: Mutex<Frontier>,
    fetcher: Fetcher,
    policy: Arc<PolitenessPolicy>,
    scope: ScopeFilter,
    analyzer: Arc<dyn PageAnalyzer>,
    renderer: Option<Arc<dyn LinkRenderer>>,
    accumulator: Mutex<Accumulator>,
    in_flight: AtomicUsize,
    cancel: CancellationToken,
    respect_robots: bool,
    render_js: bool,
}

/// Bounded concurrent crawl over one frontier
pub struct CrawlScheduler {
    ctx: Arc<WorkerContext>,
    workers: usize,
}

impl CrawlScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        frontier: Frontier,
        fetcher: Fetcher,
        policy: Arc<PolitenessPolicy>,
        scope: ScopeFilter,
        analyzer: Arc<dyn PageAnalyzer>,
        renderer: Option<Arc<dyn LinkRenderer>>,
        workers: usize,
        respect_robots: bool,
        render_js: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            ctx: Arc::new(WorkerContext {
                frontier: Mutex::new(frontier),
                fetcher,
                policy,
                scope,
                analyzer,
                renderer,
                accumulator: Mutex::new(Accumulator::default()),
                in_flight: AtomicUsize::new(0),
                cancel,
                respect_robots,
                render_js,
            }),
            workers,
        }
    }

    /// Runs the crawl to completion (or cancellation) and returns the
    /// accumulated results together with the drained frontier
    pub async fn run(self) -> (Accumulator, Frontier) {
        let mut handles = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let ctx = self.ctx.clone();
            handles.push(tokio::spawn(worker_loop(ctx, worker_id)));
        }
        futures::future::join_all(handles).await;

        let ctx = Arc::try_unwrap(self.ctx)
            .unwrap_or_else(|_| unreachable!("all workers joined"));
        (
            ctx.accumulator.into_inner().unwrap_or_else(|e| e.into_inner()),
            ctx.frontier.into_inner().unwrap_or_else(|e| e.into_inner()),
        )
    }
}

async fn worker_loop(ctx: Arc<WorkerContext>, worker_id: usize) {
    tracing::debug!("Worker {} started", worker_id);

    loop {
        // Cancellation stops new fetches; in-flight work already past this
        // point completes on its own.
        if ctx.cancel.is_cancelled() {
            tracing::debug!("Worker {} stopping: cancelled", worker_id);
            break;
        }

        let claim = {
            let mut frontier = ctx.frontier.lock().unwrap();
            match frontier.next() {
                Some(claimed) => {
                    ctx.in_flight.fetch_add(1, Ordering::SeqCst);
                    Claim::Ready(claimed)
                }
                None if ctx.in_flight.load(Ordering::SeqCst) == 0 => Claim::Drained,
                None => Claim::Busy,
            }
        };

        match claim {
            Claim::Ready(claimed) => {
                process_url(&ctx, claimed).await;
                ctx.in_flight.fetch_sub(1, Ordering::SeqCst);
            }
            Claim::Busy => {
                // Another worker may still feed the frontier
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            Claim::Drained => {
                tracing::debug!("Worker {} exiting: frontier drained", worker_id);
                break;
            }
        }
    }
}

/// Full processing of one claimed URL
async fn process_url(ctx: &WorkerContext, claimed: ClaimedUrl) {
    let normalized = claimed.normalized.clone();

    if ctx.respect_robots && !ctx.policy.is_allowed(&claimed.url).await {
        tracing::info!("robots.txt disallows {}", claimed.url);
        ctx.frontier
            .lock()
            .unwrap()
            .mark_skipped_robots(&normalized);
        return;
    }

    let outcome = ctx.fetcher.fetch(&claimed.url).await;

    let mut record = PageRecord {
        url: normalized.clone(),
        depth: claimed.depth,
        order: claimed.order,
        status: outcome.status,
        final_url: outcome.final_url.as_ref().map(|u| u.to_string()),
        redirect_chain: outcome.redirect_chain.clone(),
        redirect_loop: outcome
            .error
            .as_ref()
            .map(|e| e.is_redirect_loop())
            .unwrap_or(false),
        elapsed_ms: outcome.elapsed.as_millis() as u64,
        content_type: outcome.content_type.clone(),
        fetch_error: outcome.error.as_ref().map(|e| e.to_string()),
        analyzer_error: None,
        analysis: None,
    };

    let mut links: Vec<DiscoveredLink> = Vec::new();

    let analyzable = outcome.error.is_none()
        && outcome.status.map(|s| s < 400).unwrap_or(false)
        && outcome
            .content_type
            .as_deref()
            .map(is_html_content_type)
            .unwrap_or(false);

    if analyzable {
        if let Some(body) = &outcome.body {
            let base = outcome.final_url.clone().unwrap_or_else(|| claimed.url.clone());
            match ctx.analyzer.analyze(body, &base) {
                Ok(mut analysis) => {
                    if ctx.render_js {
                        render_links(ctx, &claimed.url, &mut analysis.links).await;
                    }
                    links = analysis.links.clone();
                    record.analysis = Some(analysis);
                }
                Err(e) => {
                    tracing::warn!("Analyzer failed for {}: {}", claimed.url, e);
                    record.analyzer_error = Some(e.to_string());
                }
            }
        }
    }

    {
        let mut frontier = ctx.frontier.lock().unwrap();
        match &record.fetch_error {
            Some(error) => frontier.mark_errored(&normalized, error.clone()),
            None => frontier.mark_fetched(&normalized),
        }
    }

    eprintln!("DBG url={} status={:?} ct={:?} analyzable={} links={}", claimed.url, record.status, record.content_type, analyzable, links.len());
    // Link feedback: build edges and push in-scope targets at depth + 1
    let mut edges: Vec<LinkEdge> = Vec::new();
    let mut targets: Vec<(String, Url, LinkScope)> = Vec::new();
    for link in &links {
        let Ok(target) = normalize_url(&link.href) else {
            continue;
        };
        let scope = ctx.scope.classify(&target);
        edges.push(LinkEdge {
            source: normalized.clone(),
            target: target.to_string(),
            rel: if link.nofollow {
                LinkRel::Nofollow
            } else {
                LinkRel::Follow
            },
            scope,
        });
        targets.push((link.href.clone(), target, scope));
    }

    {
        let mut frontier = ctx.frontier.lock().unwrap();
        for (raw, target, scope) in targets {
            if ctx.scope.in_scope(&target) {
                frontier.enqueue(&target, &raw, claimed.depth + 1, Some(normalized.clone()));
            } else if scope == LinkScope::Internal {
                // On-site URL rejected by path filters: record, don't queue
                frontier.record_skipped_scope(&target, claimed.depth + 1, Some(normalized.clone()));
            }
        }
    }

    {
        let mut accumulator = ctx.accumulator.lock().unwrap();
        accumulator.pages.push(record);
        for edge in edges {
            accumulator.edges.insert(edge);
        }
    }
}

/// Replaces statically extracted links with renderer-discovered ones;
/// renderer failure keeps the static list
async fn render_links(ctx: &WorkerContext, url: &Url, links: &mut Vec<DiscoveredLink>) {
    let Some(renderer) = &ctx.renderer else {
        return;
    };
    match renderer.discover_links(url).await {
        Ok(rendered) => {
            *links = rendered
                .into_iter()
                .map(|href| DiscoveredLink {
                    href,
                    nofollow: false,
                })
                .collect();
        }
        Err(e) => {
            tracing::debug!("Renderer failed for {}: {}; keeping static links", url, e);
        }
    }
}

fn is_html_content_type(content_type: &str) -> bool {
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}
