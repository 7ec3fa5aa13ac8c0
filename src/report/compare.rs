//! Report comparison
//!
//! Structural diff between two audit reports: pages appearing and
//! disappearing, issues raised and resolved (matched by `(url, code)`),
//! per-URL score deltas, and status-code changes. Both inputs are read-only
//! and the result is deterministic for a given pair.

use crate::report::{AuditReport, PageRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// An issue identity for diffing purposes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IssueRef {
    pub url: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreDelta {
    pub url: String,
    pub old: f64,
    pub new: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub url: String,
    pub old: Option<u16>,
    pub new: Option<u16>,
}

/// What changed between two audits of the same site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditDiff {
    pub added_pages: Vec<String>,
    pub removed_pages: Vec<String>,
    pub new_issues: Vec<IssueRef>,
    pub resolved_issues: Vec<IssueRef>,
    pub score_deltas: Vec<ScoreDelta>,
    pub status_changes: Vec<StatusChange>,
}

impl AuditDiff {
    pub fn is_empty(&self) -> bool {
        self.added_pages.is_empty()
            && self.removed_pages.is_empty()
            && self.new_issues.is_empty()
            && self.resolved_issues.is_empty()
            && self.score_deltas.is_empty()
            && self.status_changes.is_empty()
    }
}

/// Computes the diff from `old` to `new`
pub fn compare_reports(old: &AuditReport, new: &AuditReport) -> AuditDiff {
    let old_pages = page_map(old);
    let new_pages = page_map(new);

    let old_urls: BTreeSet<&str> = old_pages.keys().copied().collect();
    let new_urls: BTreeSet<&str> = new_pages.keys().copied().collect();

    let added_pages = new_urls
        .difference(&old_urls)
        .map(|u| u.to_string())
        .collect();
    let removed_pages = old_urls
        .difference(&new_urls)
        .map(|u| u.to_string())
        .collect();

    let old_issues = issue_set(old);
    let new_issues_set = issue_set(new);
    let new_issues = new_issues_set
        .difference(&old_issues)
        .cloned()
        .collect();
    let resolved_issues = old_issues
        .difference(&new_issues_set)
        .cloned()
        .collect();

    let mut score_deltas = Vec::new();
    let mut status_changes = Vec::new();
    for url in old_urls.intersection(&new_urls) {
        let old_page = old_pages[url];
        let new_page = new_pages[url];

        if let (Some(old_score), Some(new_score)) = (score_of(old_page), score_of(new_page)) {
            if old_score != new_score {
                score_deltas.push(ScoreDelta {
                    url: url.to_string(),
                    old: old_score,
                    new: new_score,
                    delta: new_score - old_score,
                });
            }
        }

        if old_page.status != new_page.status {
            status_changes.push(StatusChange {
                url: url.to_string(),
                old: old_page.status,
                new: new_page.status,
            });
        }
    }

    AuditDiff {
        added_pages,
        removed_pages,
        new_issues,
        resolved_issues,
        score_deltas,
        status_changes,
    }
}

fn page_map(report: &AuditReport) -> BTreeMap<&str, &PageRecord> {
    report.pages.iter().map(|p| (p.url.as_str(), p)).collect()
}

fn issue_set(report: &AuditReport) -> BTreeSet<IssueRef> {
    report
        .issues
        .iter()
        .map(|i| IssueRef {
            url: i.url.clone(),
            code: i.code.clone(),
        })
        .collect()
}

fn score_of(page: &PageRecord) -> Option<f64> {
    page.analysis.as_ref().map(|a| a.score)
}
