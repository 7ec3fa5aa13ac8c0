//! URL handling for the audit engine
//!
//! Provides URL normalization (the frontier's dedup key) and the scope
//! filter that decides which discovered URLs belong to the crawl.

mod normalize;
mod scope;

pub use normalize::normalize_url;
pub use scope::{LinkScope, ScopeFilter};
