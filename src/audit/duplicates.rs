//! Duplicate-content grouping
//!
//! Pages are grouped along three dimensions: normalized title, normalized
//! meta description, and the visible-text hash. A page lands in at most one
//! group per dimension; groups with a single member are discarded.

use crate::report::{DuplicateDimension, DuplicateGroup, PageRecord};
use std::collections::BTreeMap;

/// Case-folds and collapses whitespace so cosmetic differences group together
fn normalize_signature(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Finds all duplicate groups across the crawled pages
pub fn find_duplicate_groups(pages: &[PageRecord]) -> Vec<DuplicateGroup> {
    let mut groups: Vec<DuplicateGroup> = Vec::new();

    groups.extend(group_by(pages, DuplicateDimension::Title, |page| {
        page.analysis
            .as_ref()
            .and_then(|a| a.title.as_deref())
            .map(normalize_signature)
            .filter(|s| !s.is_empty())
    }));

    groups.extend(group_by(pages, DuplicateDimension::MetaDescription, |page| {
        page.analysis
            .as_ref()
            .and_then(|a| a.meta_description.as_deref())
            .map(normalize_signature)
            .filter(|s| !s.is_empty())
    }));

    groups.extend(group_by(pages, DuplicateDimension::VisibleText, |page| {
        page.analysis
            .as_ref()
            .and_then(|a| a.visible_text_hash.clone())
    }));

    groups
}

fn group_by<F>(
    pages: &[PageRecord],
    dimension: DuplicateDimension,
    signature_of: F,
) -> Vec<DuplicateGroup>
where
    F: Fn(&PageRecord) -> Option<String>,
{
    // BTreeMap keeps group order deterministic across runs
    let mut by_signature: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for page in pages {
        if let Some(signature) = signature_of(page) {
            by_signature.entry(signature).or_default().push(page.url.clone());
        }
    }

    by_signature
        .into_iter()
        .filter(|(_, urls)| urls.len() > 1)
        .map(|(signature, mut urls)| {
            urls.sort();
            DuplicateGroup {
                dimension,
                signature,
                urls,
            }
        })
        .collect()
}
