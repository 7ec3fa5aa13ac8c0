//! Sitegeist: an SEO site audit engine
//!
//! This crate crawls a website politely (robots.txt, per-host rate limits),
//! runs a per-page analyzer over every fetched document, and aggregates the
//! results into a site-level report: issues with severities, duplicate-content
//! groups, an internal link graph, redirect diagnostics, and a sitemap
//! reconciliation. Reports can be exported as CSV tables and diffed against
//! each other.

pub mod analyzer;
pub mod audit;
pub mod config;
pub mod crawler;
pub mod report;
pub mod robots;
pub mod url;

use thiserror::Error;

/// Main error type for audit operations
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid seed URL {url}: {reason}")]
    InvalidSeed { url: String, reason: String },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Too many redirects from {url}")]
    RedirectLimit { url: String },

    #[error("Redirect loop detected at {url}")]
    RedirectLoop { url: String },

    #[error("Analyzer failed for {url}: {message}")]
    Analyzer { url: String, message: String },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Sitemap error for {sitemap}: {message}")]
    Sitemap { sitemap: String, message: String },

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Report serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid path filter pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use crate::analyzer::{HtmlAnalyzer, LinkRenderer, PageAnalyzer, PageResult};
pub use crate::audit::SiteAudit;
pub use crate::config::AuditConfig;
pub use crate::report::{compare_reports, export_csv, AuditDiff, AuditReport, Issue, Severity};
pub use crate::url::{normalize_url, ScopeFilter};
