//! Report assembly
//!
//! The [`AuditReport`] is built once after crawl + aggregation and is
//! immutable afterwards; the exporter and comparator only read it.

mod compare;
mod export;

pub use compare::{compare_reports, AuditDiff, IssueRef, ScoreDelta, StatusChange};
pub use export::{export_csv, ExportPaths};

use crate::analyzer::PageResult;
use crate::audit::graph::LinkGraphReport;
use crate::audit::sitemap::SitemapReconciliation;
use crate::config::AuditConfig;
use crate::crawler::RedirectHop;
use crate::url::LinkScope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Issue severity, ordered most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Notice,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Notice => write!(f, "notice"),
        }
    }
}

/// Issue category, mirroring the rule table's grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Http,
    Redirects,
    Content,
    Indexing,
    Links,
    Security,
    Sitemap,
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Http => "http",
            Self::Redirects => "redirects",
            Self::Content => "content",
            Self::Indexing => "indexing",
            Self::Links => "links",
            Self::Security => "security",
            Self::Sitemap => "sitemap",
        };
        write!(f, "{}", name)
    }
}

/// One derived finding; never mutated after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub url: String,
    pub code: String,
    pub title: String,
    pub severity: Severity,
    pub category: IssueCategory,
    pub details: String,
}

impl Issue {
    pub fn new(
        url: impl Into<String>,
        code: &str,
        title: &str,
        severity: Severity,
        category: IssueCategory,
        details: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            code: code.to_string(),
            title: title.to_string(),
            severity,
            category,
            details: details.into(),
        }
    }
}

/// Link relation as declared by the source page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkRel {
    Follow,
    Nofollow,
}

/// One discovered link edge; duplicates are merged by the accumulator
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkEdge {
    pub source: String,
    pub target: String,
    pub rel: LinkRel,
    pub scope: LinkScope,
}

/// Per-page crawl row: fetch metadata plus the analyzer's output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    /// Normalized URL
    pub url: String,
    /// Link depth from the seed
    pub depth: u32,
    /// Discovery order (frontier acceptance sequence)
    pub order: usize,
    /// Final HTTP status; None when the fetch never completed
    pub status: Option<u16>,
    /// URL of the terminal response when redirects were followed
    pub final_url: Option<String>,
    pub redirect_chain: Vec<RedirectHop>,
    pub redirect_loop: bool,
    pub elapsed_ms: u64,
    pub content_type: Option<String>,
    pub fetch_error: Option<String>,
    pub analyzer_error: Option<String>,
    pub analysis: Option<PageResult>,
}

/// Content dimension along which pages can duplicate each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateDimension {
    Title,
    MetaDescription,
    VisibleText,
}

impl fmt::Display for DuplicateDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Title => "title",
            Self::MetaDescription => "meta_description",
            Self::VisibleText => "visible_text",
        };
        write!(f, "{}", name)
    }
}

/// Pages sharing one normalized signature along one dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub dimension: DuplicateDimension,
    pub signature: String,
    pub urls: Vec<String>,
}

/// Issue totals by severity
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IssueCounts {
    pub errors: usize,
    pub warnings: usize,
    pub notices: usize,
}

/// Frontier bookkeeping surfaced in the summary
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CrawlCounts {
    pub discovered: usize,
    pub fetched: usize,
    pub errored: usize,
    pub skipped_scope: usize,
    pub skipped_robots: usize,
}

/// Site-level rollup rendered at the top of the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSummary {
    pub root_url: String,
    pub crawl: CrawlCounts,
    pub status_distribution: BTreeMap<String, usize>,
    pub redirect_loops: Vec<String>,
    pub issue_counts: IssueCounts,
    /// 100 minus severity-weighted issue counts, clamped to 0..=100
    pub health_score: f64,
    pub avg_page_score: Option<f64>,
    pub duplicate_group_counts: BTreeMap<String, usize>,
    pub internal_edges: usize,
    pub external_edges: usize,
    pub orphan_pages: usize,
    pub sitemap_entries: usize,
    pub sitemap_not_crawled: usize,
    pub crawled_not_in_sitemap: usize,
}

/// The complete audit output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub summary: AuditSummary,
    pub pages: Vec<PageRecord>,
    pub issues: Vec<Issue>,
    pub edges: Vec<LinkEdge>,
    pub duplicate_groups: Vec<DuplicateGroup>,
    pub link_graph: LinkGraphReport,
    pub sitemap: SitemapReconciliation,
    pub config_used: AuditConfig,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// True when the crawl was cancelled or hit its deadline; the report
    /// covers everything crawled so far
    pub partial: bool,
}

/// Everything the report builder consumes
pub(crate) struct ReportInputs {
    pub root_url: String,
    pub pages: Vec<PageRecord>,
    pub issues: Vec<Issue>,
    pub edges: Vec<LinkEdge>,
    pub duplicate_groups: Vec<DuplicateGroup>,
    pub link_graph: LinkGraphReport,
    pub sitemap: SitemapReconciliation,
    pub config_used: AuditConfig,
    pub crawl_counts: CrawlCounts,
    pub started_at: DateTime<Utc>,
    pub partial: bool,
}

/// Assembles the immutable report from crawl + aggregation outputs
pub(crate) fn build_report(inputs: ReportInputs) -> AuditReport {
    let ReportInputs {
        root_url,
        mut pages,
        mut issues,
        edges,
        duplicate_groups,
        link_graph,
        sitemap,
        config_used,
        crawl_counts,
        started_at,
        partial,
    } = inputs;

    pages.sort_by_key(|p| p.order);
    issues.sort_by(|a, b| {
        (a.severity, &a.url, &a.code).cmp(&(b.severity, &b.url, &b.code))
    });

    let mut status_distribution: BTreeMap<String, usize> = BTreeMap::new();
    for page in &pages {
        if let Some(status) = page.status {
            *status_distribution.entry(status.to_string()).or_insert(0) += 1;
        }
    }

    let redirect_loops: Vec<String> = pages
        .iter()
        .filter(|p| p.redirect_loop)
        .map(|p| p.url.clone())
        .collect();

    let mut issue_counts = IssueCounts::default();
    for issue in &issues {
        match issue.severity {
            Severity::Error => issue_counts.errors += 1,
            Severity::Warning => issue_counts.warnings += 1,
            Severity::Notice => issue_counts.notices += 1,
        }
    }

    let scores: Vec<f64> = pages
        .iter()
        .filter_map(|p| p.analysis.as_ref().map(|a| a.score))
        .collect();
    let avg_page_score = (!scores.is_empty())
        .then(|| (scores.iter().sum::<f64>() / scores.len() as f64 * 100.0).round() / 100.0);

    let mut duplicate_group_counts: BTreeMap<String, usize> = BTreeMap::new();
    for group in &duplicate_groups {
        *duplicate_group_counts
            .entry(group.dimension.to_string())
            .or_insert(0) += 1;
    }

    let internal_edges = edges.iter().filter(|e| e.scope == LinkScope::Internal).count();
    let external_edges = edges.len() - internal_edges;

    let summary = AuditSummary {
        root_url,
        crawl: crawl_counts,
        status_distribution,
        redirect_loops,
        health_score: health_score(&issue_counts),
        issue_counts,
        avg_page_score,
        duplicate_group_counts,
        internal_edges,
        external_edges,
        orphan_pages: link_graph.orphans.len(),
        sitemap_entries: sitemap.entries.len(),
        sitemap_not_crawled: sitemap.in_sitemap_not_crawled.len(),
        crawled_not_in_sitemap: sitemap.crawled_not_in_sitemap.len(),
    };

    AuditReport {
        summary,
        pages,
        issues,
        edges,
        duplicate_groups,
        link_graph,
        sitemap,
        config_used,
        started_at,
        finished_at: Utc::now(),
        partial,
    }
}

/// Severity-weighted aggregate: errors 3.0, warnings 1.5, notices 0.5
pub fn health_score(counts: &IssueCounts) -> f64 {
    let score = 100.0
        - counts.errors as f64 * 3.0
        - counts.warnings as f64 * 1.5
        - counts.notices as f64 * 0.5;
    (score.clamp(0.0, 100.0) * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_score_clean_site() {
        assert_eq!(health_score(&IssueCounts::default()), 100.0);
    }

    #[test]
    fn test_health_score_weights() {
        let counts = IssueCounts {
            errors: 2,
            warnings: 2,
            notices: 2,
        };
        // 100 - 6 - 3 - 1
        assert_eq!(health_score(&counts), 90.0);
    }

    #[test]
    fn test_health_score_floor() {
        let counts = IssueCounts {
            errors: 50,
            warnings: 0,
            notices: 0,
        };
        assert_eq!(health_score(&counts), 0.0);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error < Severity::Warning);
        assert!(Severity::Warning < Severity::Notice);
    }
}
