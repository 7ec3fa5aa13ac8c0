//! Internal link graph
//!
//! Builds in/out-degree counts per crawled internal URL from the merged
//! edge set, flags orphan pages (zero inbound links, seeds excluded), and
//! proposes internal-link sources for orphans by top-keyword overlap. The
//! suggestions are a ranked shortlist of candidates, not a correctness
//! guarantee.

use crate::report::{LinkEdge, PageRecord};
use crate::url::LinkScope;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// How many suggestions the report carries at most
const MAX_SUGGESTIONS: usize = 20;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NodeDegree {
    pub in_degree: usize,
    pub out_degree: usize,
}

/// A proposed internal link from an existing page to a poorly-linked one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSuggestion {
    pub from: String,
    pub to: String,
    /// A shared keyword usable as anchor text
    pub anchor_hint: String,
    /// Number of shared top keywords; suggestions are ranked by this
    pub shared_keywords: usize,
}

/// Link-graph portion of the audit report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkGraphReport {
    pub degrees: BTreeMap<String, NodeDegree>,
    pub orphans: Vec<String>,
    pub suggestions: Vec<LinkSuggestion>,
}

/// Builds the graph over crawled pages from the internal edge set
///
/// External edges never contribute to degrees. Inbound counts only consider
/// targets that were actually crawled.
pub fn build_link_graph(
    pages: &[PageRecord],
    edges: &[LinkEdge],
    seeds: &HashSet<String>,
) -> LinkGraphReport {
    let crawled: HashSet<&str> = pages.iter().map(|p| p.url.as_str()).collect();

    let mut degrees: BTreeMap<String, NodeDegree> = pages
        .iter()
        .map(|p| (p.url.clone(), NodeDegree::default()))
        .collect();

    for edge in edges {
        if edge.scope != LinkScope::Internal {
            continue;
        }
        if let Some(node) = degrees.get_mut(&edge.source) {
            node.out_degree += 1;
        }
        if crawled.contains(edge.target.as_str()) {
            if let Some(node) = degrees.get_mut(&edge.target) {
                node.in_degree += 1;
            }
        }
    }

    let orphans: Vec<String> = degrees
        .iter()
        .filter(|(url, degree)| degree.in_degree == 0 && !seeds.contains(*url))
        .map(|(url, _)| url.clone())
        .collect();

    let suggestions = suggest_links(pages, edges, &orphans);

    LinkGraphReport {
        degrees,
        orphans,
        suggestions,
    }
}

/// Proposes link sources for orphan pages by shared top keywords
fn suggest_links(
    pages: &[PageRecord],
    edges: &[LinkEdge],
    orphans: &[String],
) -> Vec<LinkSuggestion> {
    let keywords: HashMap<&str, HashSet<&str>> = pages
        .iter()
        .filter_map(|p| {
            p.analysis.as_ref().map(|a| {
                (
                    p.url.as_str(),
                    a.top_keywords.iter().map(String::as_str).collect(),
                )
            })
        })
        .collect();

    let existing: HashSet<(&str, &str)> = edges
        .iter()
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .collect();

    let mut suggestions: Vec<LinkSuggestion> = Vec::new();

    for target in orphans {
        let Some(target_keywords) = keywords.get(target.as_str()) else {
            continue;
        };
        if target_keywords.is_empty() {
            continue;
        }

        let mut best: Option<LinkSuggestion> = None;
        for (&source, source_keywords) in &keywords {
            if source == target.as_str() || existing.contains(&(source, target.as_str())) {
                continue;
            }

            let mut shared: Vec<&str> = target_keywords
                .intersection(source_keywords)
                .copied()
                .collect();
            if shared.is_empty() {
                continue;
            }
            shared.sort_unstable();

            let candidate = LinkSuggestion {
                from: source.to_string(),
                to: target.clone(),
                anchor_hint: shared[0].to_string(),
                shared_keywords: shared.len(),
            };

            let better = match &best {
                None => true,
                Some(current) => {
                    (candidate.shared_keywords, &current.from)
                        > (current.shared_keywords, &candidate.from)
                }
            };
            if better {
                best = Some(candidate);
            }
        }

        if let Some(suggestion) = best {
            suggestions.push(suggestion);
        }
    }

    suggestions.sort_by(|a, b| {
        b.shared_keywords
            .cmp(&a.shared_keywords)
            .then_with(|| a.to.cmp(&b.to))
    });
    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}
