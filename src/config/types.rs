use serde::{Deserialize, Serialize};

/// Main configuration structure for an audit run
///
/// Every section and field has a default, so an empty TOML file (or no file
/// at all) yields a usable configuration. The full structure is embedded in
/// the report as `config_used`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub sitemap: SitemapConfig,
}

/// Crawl limits and scheduling behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Hard cap on the number of URLs accepted into the frontier
    pub max_pages: usize,

    /// Maximum link depth from the seed (seed = 0)
    pub max_depth: u32,

    /// Number of concurrent crawl workers
    pub workers: usize,

    /// Requests per second per host; 0 disables the delay entirely
    pub rate_limit_rps: f64,

    /// Whether to honor robots.txt disallow rules
    pub respect_robots: bool,

    /// Restrict the crawl to the seed's domain
    pub same_domain_only: bool,

    /// Treat subdomains of the seed's domain as in scope
    pub include_subdomains: bool,

    /// Delegate link discovery to a JS renderer collaborator when one is set
    pub render_js: bool,

    /// Optional wall-clock deadline for the whole crawl, in seconds
    pub max_duration_secs: Option<u64>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 100,
            max_depth: 3,
            workers: 4,
            rate_limit_rps: 0.0,
            respect_robots: true,
            same_domain_only: true,
            include_subdomains: false,
            render_js: false,
            max_duration_secs: None,
        }
    }
}

/// HTTP client, retry, and redirect behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Number of retries after the initial attempt for transient failures
    pub retry_count: u32,

    /// Base backoff in seconds; attempt n sleeps base * 2^n
    pub retry_backoff_secs: f64,

    /// Status codes treated as transient and retried
    pub retryable_status_codes: Vec<u16>,

    /// Maximum redirect hops followed for a single fetch
    pub max_redirects: usize,

    /// Redirect chains longer than this raise a warning issue
    pub redirect_chain_threshold: usize,

    /// Optional basic-auth credentials
    pub auth_username: Option<String>,
    pub auth_password: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("Sitegeist/{} (+https://github.com/sitegeist/sitegeist)", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 10,
            retry_count: 2,
            retry_backoff_secs: 0.5,
            retryable_status_codes: vec![429, 500, 502, 503, 504],
            max_redirects: 10,
            redirect_chain_threshold: 2,
            auth_username: None,
            auth_password: None,
        }
    }
}

/// Path-based scope filters
///
/// Each entry is either a path prefix (`/blog/`) or, with a `re:` prefix, a
/// regular expression matched against the URL path (`re:^/docs/v\d+/`).
/// If any include filter is configured, at least one must match; an exclude
/// match always wins over an include match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub include_paths: Vec<String>,
    pub exclude_paths: Vec<String>,
}

/// Sitemap reconciliation options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SitemapConfig {
    /// Explicit sitemap URLs; empty means discover via robots.txt and
    /// the conventional /sitemap.xml locations
    pub urls: Vec<String>,

    /// Upper bound on sitemap documents fetched, including index children
    pub max_sitemaps: usize,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            max_sitemaps: 50,
        }
    }
}
