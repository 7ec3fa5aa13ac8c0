//! Issue derivation
//!
//! A rule table over already-computed crawl and aggregation data. Every rule
//! reads the stored `PageRecord`s, the link graph, the duplicate groups, or
//! the sitemap reconciliation; nothing here re-fetches. Rules are evaluated
//! independently; no rule's firing changes another's preconditions, so the
//! issue set is a pure function of the inputs regardless of evaluation
//! order.

use crate::audit::graph::LinkGraphReport;
use crate::audit::sitemap::SitemapReconciliation;
use crate::config::AuditConfig;
use crate::report::{
    DuplicateDimension, DuplicateGroup, Issue, IssueCategory, LinkEdge, LinkRel, PageRecord,
    Severity,
};
use crate::url::LinkScope;
use std::collections::{HashMap, HashSet};

/// Per-url cap for sitemap discrepancy issues; giant sitemaps otherwise
/// drown the report
const MAX_SITEMAP_ISSUES_PER_KIND: usize = 50;

/// Derives the full issue list for a run
pub fn derive_issues(
    pages: &[PageRecord],
    edges: &[LinkEdge],
    graph: &LinkGraphReport,
    duplicates: &[DuplicateGroup],
    sitemap: &SitemapReconciliation,
    config: &AuditConfig,
) -> Vec<Issue> {
    let mut issues = Vec::new();

    for page in pages {
        derive_page_issues(page, config, &mut issues);
    }

    derive_duplicate_issues(duplicates, &mut issues);
    derive_link_issues(pages, edges, graph, &mut issues);
    derive_sitemap_issues(sitemap, &mut issues);

    issues
}

/// Rules over a single page's fetch metadata and analysis
fn derive_page_issues(page: &PageRecord, config: &AuditConfig, issues: &mut Vec<Issue>) {
    let url = &page.url;

    // Fetch-level conditions
    if page.redirect_loop {
        let chain = page
            .redirect_chain
            .iter()
            .map(|hop| format!("{} ({})", hop.url, hop.status))
            .collect::<Vec<_>>()
            .join(" -> ");
        issues.push(Issue::new(
            url,
            "REDIRECT_LOOP",
            "Redirect loop detected",
            Severity::Error,
            IssueCategory::Redirects,
            format!("Chain revisits an earlier URL: {}", chain),
        ));
    } else if let Some(error) = &page.fetch_error {
        issues.push(Issue::new(
            url,
            "FETCH_FAILED",
            "Page could not be fetched",
            Severity::Error,
            IssueCategory::Http,
            error.clone(),
        ));
    }

    if let Some(status) = page.status {
        match status {
            404 => issues.push(Issue::new(
                url,
                "HTTP_404",
                "Page not found (404)",
                Severity::Error,
                IssueCategory::Http,
                "Return 200 or redirect to a relevant page",
            )),
            403 => issues.push(Issue::new(
                url,
                "HTTP_403",
                "Forbidden (403)",
                Severity::Error,
                IssueCategory::Http,
                "Check auth rules and access control",
            )),
            400..=499 => issues.push(Issue::new(
                url,
                "HTTP_4XX",
                "Client error",
                Severity::Error,
                IssueCategory::Http,
                format!("HTTP {}", status),
            )),
            500..=599 => issues.push(Issue::new(
                url,
                "HTTP_5XX",
                "Server error",
                Severity::Error,
                IssueCategory::Http,
                format!("HTTP {}", status),
            )),
            _ => {}
        }
    }

    if page.redirect_chain.len() > config.http.redirect_chain_threshold {
        issues.push(Issue::new(
            url,
            "REDIRECT_CHAIN",
            "Long redirect chain",
            Severity::Warning,
            IssueCategory::Redirects,
            format!(
                "{} hops before the final response; reduce to a single redirect",
                page.redirect_chain.len()
            ),
        ));
    }

    if page.redirect_chain.iter().any(|hop| hop.status == 302) {
        issues.push(Issue::new(
            url,
            "TEMP_REDIRECT_302",
            "Temporary redirect (302)",
            Severity::Notice,
            IssueCategory::Redirects,
            "Use 301 if the move is permanent",
        ));
    }

    if let (Some(first), Some(final_url)) = (page.redirect_chain.first(), &page.final_url) {
        if first.url.starts_with("https://") && final_url.starts_with("http://") {
            issues.push(Issue::new(
                url,
                "HTTPS_TO_HTTP",
                "HTTPS redirects to HTTP",
                Severity::Error,
                IssueCategory::Security,
                format!("Chain downgrades the scheme, ending at {}", final_url),
            ));
        }
    }

    if let Some(error) = &page.analyzer_error {
        issues.push(Issue::new(
            url,
            "PAGE_UNANALYZABLE",
            "Page could not be analyzed",
            Severity::Warning,
            IssueCategory::Content,
            error.clone(),
        ));
    }

    // Content rules need analyzer output
    let Some(analysis) = &page.analysis else {
        return;
    };

    if analysis.title.is_none() {
        issues.push(Issue::new(
            url,
            "MISSING_TITLE",
            "Missing title tag",
            Severity::Error,
            IssueCategory::Content,
            "Every page should have a unique, descriptive title",
        ));
    }

    if analysis.meta_description.is_none() {
        issues.push(Issue::new(
            url,
            "MISSING_META_DESC",
            "Missing meta description",
            Severity::Warning,
            IssueCategory::Content,
            "Add a compelling meta description",
        ));
    }

    if analysis.h1_count == 0 {
        issues.push(Issue::new(
            url,
            "MISSING_H1",
            "Missing H1 heading",
            Severity::Warning,
            IssueCategory::Content,
            "Add a primary H1 heading",
        ));
    } else if analysis.h1_count > 1 {
        issues.push(Issue::new(
            url,
            "MULTIPLE_H1",
            "Multiple H1 headings",
            Severity::Notice,
            IssueCategory::Content,
            format!("{} H1 headings; use a single H1 to clarify the topic", analysis.h1_count),
        ));
    }

    if analysis.word_count < 300 {
        issues.push(Issue::new(
            url,
            "LOW_WORD_COUNT",
            "Thin content",
            Severity::Notice,
            IssueCategory::Content,
            format!("{} words; consider adding more useful content", analysis.word_count),
        ));
    }

    if analysis.canonical_url.is_none() {
        issues.push(Issue::new(
            url,
            "NO_CANONICAL",
            "Missing canonical tag",
            Severity::Notice,
            IssueCategory::Indexing,
            "Add rel=canonical to guard against duplicate-content indexing",
        ));
    }

    if analysis.mixed_content {
        issues.push(Issue::new(
            url,
            "MIXED_CONTENT",
            "Mixed content on HTTPS page",
            Severity::Error,
            IssueCategory::Security,
            "Serve all assets over HTTPS",
        ));
    }

    if url.starts_with("http://") {
        issues.push(Issue::new(
            url,
            "NO_HTTPS",
            "Page not served over HTTPS",
            Severity::Warning,
            IssueCategory::Security,
            "Enable HTTPS",
        ));
    }

    if url.starts_with("https://")
        && analysis.links.iter().any(|l| l.href.starts_with("http://"))
    {
        issues.push(Issue::new(
            url,
            "HTTPS_LINKS_TO_HTTP",
            "HTTPS page links to HTTP",
            Severity::Warning,
            IssueCategory::Security,
            "Update links to HTTPS targets",
        ));
    }

    if analysis.links.is_empty() {
        issues.push(Issue::new(
            url,
            "NO_OUTGOING_LINKS",
            "Page has no outgoing links",
            Severity::Notice,
            IssueCategory::Links,
            "Consider adding contextual links",
        ));
    }
}

fn derive_duplicate_issues(duplicates: &[DuplicateGroup], issues: &mut Vec<Issue>) {
    for group in duplicates {
        let (code, title) = match group.dimension {
            DuplicateDimension::Title => ("DUPLICATE_TITLE", "Duplicate title"),
            DuplicateDimension::MetaDescription => {
                ("DUPLICATE_META_DESC", "Duplicate meta description")
            }
            DuplicateDimension::VisibleText => ("DUPLICATE_CONTENT", "Duplicate page content"),
        };

        for url in &group.urls {
            let others: Vec<&str> = group
                .urls
                .iter()
                .filter(|u| *u != url)
                .map(String::as_str)
                .take(5)
                .collect();
            issues.push(Issue::new(
                url,
                code,
                title,
                Severity::Warning,
                IssueCategory::Content,
                format!("Shared with: {}", others.join(", ")),
            ));
        }
    }
}

fn derive_link_issues(
    pages: &[PageRecord],
    edges: &[LinkEdge],
    graph: &LinkGraphReport,
    issues: &mut Vec<Issue>,
) {
    for url in &graph.orphans {
        issues.push(Issue::new(
            url,
            "ORPHAN_PAGE",
            "Orphan page (no inbound internal links)",
            Severity::Notice,
            IssueCategory::Links,
            "Add internal links pointing to this page",
        ));
    }

    // Pages whose every inbound internal link is nofollow
    let crawled: HashSet<&str> = pages.iter().map(|p| p.url.as_str()).collect();
    let mut inbound_rels: HashMap<&str, (usize, usize)> = HashMap::new();
    for edge in edges {
        if edge.scope != LinkScope::Internal || !crawled.contains(edge.target.as_str()) {
            continue;
        }
        let counts = inbound_rels.entry(edge.target.as_str()).or_insert((0, 0));
        match edge.rel {
            LinkRel::Follow => counts.0 += 1,
            LinkRel::Nofollow => counts.1 += 1,
        }
    }
    let mut nofollow_only: Vec<&str> = inbound_rels
        .iter()
        .filter(|(_, (follow, nofollow))| *follow == 0 && *nofollow > 0)
        .map(|(url, _)| *url)
        .collect();
    nofollow_only.sort_unstable();
    for url in nofollow_only {
        issues.push(Issue::new(
            url,
            "NOFOLLOW_ONLY_INBOUND",
            "Only nofollow inbound links",
            Severity::Notice,
            IssueCategory::Links,
            "Add at least one followed internal link",
        ));
    }
}

fn derive_sitemap_issues(sitemap: &SitemapReconciliation, issues: &mut Vec<Issue>) {
    if !sitemap.parsed_any {
        return;
    }

    for url in sitemap
        .in_sitemap_not_crawled
        .iter()
        .take(MAX_SITEMAP_ISSUES_PER_KIND)
    {
        issues.push(Issue::new(
            url,
            "SITEMAP_NOT_CRAWLED",
            "Sitemap entry never crawled",
            Severity::Notice,
            IssueCategory::Sitemap,
            "Declared in a sitemap but unreachable from the crawled link structure",
        ));
    }

    for url in sitemap
        .crawled_not_in_sitemap
        .iter()
        .take(MAX_SITEMAP_ISSUES_PER_KIND)
    {
        issues.push(Issue::new(
            url,
            "NOT_IN_SITEMAP",
            "Crawled page missing from sitemap",
            Severity::Notice,
            IssueCategory::Sitemap,
            "Add the page to a sitemap if it should be indexed",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{DiscoveredLink, PageResult};
    use crate::crawler::RedirectHop;

    fn bare_page(url: &str, status: Option<u16>) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            depth: 0,
            order: 0,
            status,
            final_url: None,
            redirect_chain: Vec::new(),
            redirect_loop: false,
            elapsed_ms: 1,
            content_type: Some("text/html".to_string()),
            fetch_error: None,
            analyzer_error: None,
            analysis: None,
        }
    }

    fn analyzed_page(url: &str) -> PageRecord {
        let mut page = bare_page(url, Some(200));
        page.analysis = Some(PageResult {
            title: Some("Title".to_string()),
            meta_description: Some("Desc".to_string()),
            h1_count: 1,
            heading_count: 2,
            word_count: 500,
            visible_text_hash: Some("hash".to_string()),
            top_keywords: Vec::new(),
            canonical_url: Some(format!("{}/", url)),
            links: vec![DiscoveredLink {
                href: "https://example.com/other".to_string(),
                nofollow: false,
            }],
            mixed_content: false,
            score: 100.0,
        });
        page
    }

    fn derive(pages: &[PageRecord]) -> Vec<Issue> {
        derive_issues(
            pages,
            &[],
            &LinkGraphReport::default(),
            &[],
            &SitemapReconciliation::default(),
            &AuditConfig::default(),
        )
    }

    fn codes_for<'a>(issues: &'a [Issue], url: &str) -> Vec<&'a str> {
        issues
            .iter()
            .filter(|i| i.url == url)
            .map(|i| i.code.as_str())
            .collect()
    }

    #[test]
    fn test_http_404_is_error() {
        let issues = derive(&[bare_page("https://example.com/gone", Some(404))]);
        let codes = codes_for(&issues, "https://example.com/gone");
        assert!(codes.contains(&"HTTP_404"));
        assert!(!codes.contains(&"HTTP_4XX"));
        assert_eq!(
            issues.iter().find(|i| i.code == "HTTP_404").unwrap().severity,
            Severity::Error
        );
    }

    #[test]
    fn test_http_buckets_distinct() {
        let issues = derive(&[
            bare_page("https://example.com/a", Some(403)),
            bare_page("https://example.com/b", Some(410)),
            bare_page("https://example.com/c", Some(500)),
        ]);
        assert!(codes_for(&issues, "https://example.com/a").contains(&"HTTP_403"));
        assert!(codes_for(&issues, "https://example.com/b").contains(&"HTTP_4XX"));
        assert!(codes_for(&issues, "https://example.com/c").contains(&"HTTP_5XX"));
    }

    #[test]
    fn test_redirect_loop_issue() {
        let mut page = bare_page("https://example.com/loop", None);
        page.redirect_loop = true;
        page.fetch_error = Some("redirect loop".to_string());
        page.redirect_chain = vec![
            RedirectHop {
                url: "https://example.com/loop".to_string(),
                status: 302,
            },
            RedirectHop {
                url: "https://example.com/b".to_string(),
                status: 302,
            },
        ];

        let issues = derive(&[page]);
        let codes = codes_for(&issues, "https://example.com/loop");
        assert!(codes.contains(&"REDIRECT_LOOP"));
        // Loop is not double-reported as a generic fetch failure
        assert!(!codes.contains(&"FETCH_FAILED"));
        let loop_issue = issues.iter().find(|i| i.code == "REDIRECT_LOOP").unwrap();
        assert!(loop_issue.details.contains("https://example.com/b"));
    }

    #[test]
    fn test_redirect_chain_threshold() {
        let mut page = bare_page("https://example.com/r", Some(200));
        page.redirect_chain = (0..3)
            .map(|i| RedirectHop {
                url: format!("https://example.com/hop{}", i),
                status: 301,
            })
            .collect();

        let issues = derive(&[page]);
        assert!(codes_for(&issues, "https://example.com/r").contains(&"REDIRECT_CHAIN"));
    }

    #[test]
    fn test_clean_page_has_no_content_issues() {
        let issues = derive(&[analyzed_page("https://example.com/clean")]);
        let codes = codes_for(&issues, "https://example.com/clean");
        assert!(
            codes.is_empty(),
            "expected no issues for a clean page, got {:?}",
            codes
        );
    }

    #[test]
    fn test_missing_title_and_meta() {
        let mut page = analyzed_page("https://example.com/bare");
        if let Some(analysis) = page.analysis.as_mut() {
            analysis.title = None;
            analysis.meta_description = None;
        }

        let issues = derive(&[page]);
        let codes = codes_for(&issues, "https://example.com/bare");
        assert!(codes.contains(&"MISSING_TITLE"));
        assert!(codes.contains(&"MISSING_META_DESC"));
    }

    #[test]
    fn test_duplicate_title_issue_references_group_members() {
        let groups = vec![DuplicateGroup {
            dimension: DuplicateDimension::Title,
            signature: "shared".to_string(),
            urls: vec![
                "https://example.com/a".to_string(),
                "https://example.com/b".to_string(),
            ],
        }];

        let mut issues = Vec::new();
        derive_duplicate_issues(&groups, &mut issues);

        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.code == "DUPLICATE_TITLE"));
        assert!(issues[0].details.contains("https://example.com/b"));
        assert!(issues[1].details.contains("https://example.com/a"));
    }

    #[test]
    fn test_orphan_issue_per_orphan() {
        let graph = LinkGraphReport {
            orphans: vec!["https://example.com/lonely".to_string()],
            ..LinkGraphReport::default()
        };
        let mut issues = Vec::new();
        derive_link_issues(&[], &[], &graph, &mut issues);

        let orphan_issues: Vec<_> = issues.iter().filter(|i| i.code == "ORPHAN_PAGE").collect();
        assert_eq!(orphan_issues.len(), 1);
        assert_eq!(orphan_issues[0].url, "https://example.com/lonely");
    }

    #[test]
    fn test_nofollow_only_inbound() {
        let pages = vec![analyzed_page("https://example.com/target")];
        let edges = vec![LinkEdge {
            source: "https://example.com/src".to_string(),
            target: "https://example.com/target".to_string(),
            rel: LinkRel::Nofollow,
            scope: LinkScope::Internal,
        }];
        let mut issues = Vec::new();
        derive_link_issues(&pages, &edges, &LinkGraphReport::default(), &mut issues);
        assert!(issues.iter().any(|i| i.code == "NOFOLLOW_ONLY_INBOUND"));
    }

    #[test]
    fn test_sitemap_issues_only_when_parsed() {
        let unparsed = SitemapReconciliation {
            in_sitemap_not_crawled: vec!["https://example.com/ghost".to_string()],
            parsed_any: false,
            ..SitemapReconciliation::default()
        };
        let mut issues = Vec::new();
        derive_sitemap_issues(&unparsed, &mut issues);
        assert!(issues.is_empty());

        let parsed = SitemapReconciliation {
            parsed_any: true,
            ..unparsed
        };
        derive_sitemap_issues(&parsed, &mut issues);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "SITEMAP_NOT_CRAWLED");
    }
}
