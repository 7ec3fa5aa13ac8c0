//! Per-page analyzer contract
//!
//! The engine depends on the [`PageAnalyzer`] capability contract, never on
//! a specific analyzer's internals. Analyzers must be deterministic for a
//! given document + URL and must not perform network I/O of their own; the
//! engine hands them the already-fetched body. [`HtmlAnalyzer`] is the
//! default static-HTML implementation.
//!
//! [`LinkRenderer`] is the optional JS-rendering collaborator: when
//! `render_js` is enabled and a renderer is installed, link discovery for a
//! page is delegated to it; everything downstream is oblivious to which path
//! produced the links.

mod html;

pub use html::HtmlAnalyzer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Analyzer failure for one page; downgraded to a page-level issue, never
/// fatal to the run
#[derive(Debug, Error)]
#[error("{0}")]
pub struct AnalyzerError(pub String);

/// A link discovered on a page, already resolved to an absolute URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredLink {
    pub href: String,
    pub nofollow: bool,
}

/// Structured attributes extracted from one fetched page
///
/// The engine treats this as an opaque serializable value except for the
/// fields the aggregation pipeline reads: title, meta description, the
/// visible-text hash, outbound links, canonical URL, and score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub h1_count: usize,
    pub heading_count: usize,
    pub word_count: usize,
    pub visible_text_hash: Option<String>,
    pub top_keywords: Vec<String>,
    pub canonical_url: Option<String>,
    pub links: Vec<DiscoveredLink>,
    pub mixed_content: bool,
    pub score: f64,
}

/// Capability contract for per-page analysis
///
/// `analyze` must be a pure function of `(body, url)`.
pub trait PageAnalyzer: Send + Sync {
    fn analyze(&self, body: &str, url: &Url) -> Result<PageResult, AnalyzerError>;
}

/// Optional collaborator that discovers links from a JS-rendered page
///
/// Returns the same link-list shape as static extraction. A renderer error
/// is not fatal: the engine falls back to the static path for that page.
#[async_trait]
pub trait LinkRenderer: Send + Sync {
    async fn discover_links(&self, url: &Url) -> Result<Vec<String>, AnalyzerError>;
}
