use crate::config::{CrawlConfig, FilterConfig};
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Whether a link target lives on the audited site or elsewhere
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkScope {
    Internal,
    External,
}

/// A single compiled path filter: literal prefix or `re:` regular expression
#[derive(Debug, Clone)]
enum PathFilter {
    Prefix(String),
    Pattern(regex::Regex),
}

impl PathFilter {
    fn compile(raw: &str) -> Result<Self, ConfigError> {
        if let Some(expr) = raw.strip_prefix("re:") {
            let re = regex::Regex::new(expr)
                .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", raw, e)))?;
            Ok(Self::Pattern(re))
        } else {
            Ok(Self::Prefix(raw.to_string()))
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            Self::Prefix(prefix) => path.starts_with(prefix.as_str()),
            Self::Pattern(re) => re.is_match(path),
        }
    }
}

/// Decides crawl membership for discovered URLs
///
/// Evaluation order for [`ScopeFilter::in_scope`]:
/// 1. Domain check: same host as the seed (same port too), or a subdomain of
///    it when `include_subdomains` is set. Skipped entirely when
///    `same_domain_only` is off.
/// 2. Include filters: if any are configured, at least one must match the
///    URL path. Multiple includes are an unordered any-match set.
/// 3. Exclude filters: a match excludes the URL regardless of includes.
///
/// Pure function of its inputs; no network or disk access.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    seed_host: String,
    seed_port: Option<u16>,
    same_domain_only: bool,
    include_subdomains: bool,
    include: Vec<PathFilter>,
    exclude: Vec<PathFilter>,
}

impl ScopeFilter {
    /// Builds a scope filter for one audit run
    ///
    /// Fails when a `re:` filter does not compile; prefix filters were
    /// already shape-checked by config validation.
    pub fn new(
        seed: &Url,
        crawl: &CrawlConfig,
        filters: &FilterConfig,
    ) -> Result<Self, ConfigError> {
        let seed_host = seed
            .host_str()
            .ok_or_else(|| ConfigError::Validation("seed URL has no host".to_string()))?
            .to_string();

        let include = filters
            .include_paths
            .iter()
            .map(|p| PathFilter::compile(p))
            .collect::<Result<Vec<_>, _>>()?;
        let exclude = filters
            .exclude_paths
            .iter()
            .map(|p| PathFilter::compile(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            seed_host,
            seed_port: seed.port(),
            same_domain_only: crawl.same_domain_only,
            include_subdomains: crawl.include_subdomains,
            include,
            exclude,
        })
    }

    /// Whether the URL belongs to the audited site (for link-graph scoping)
    ///
    /// Same host and port as the seed, or any subdomain of the seed host
    /// when subdomains are included. Independent of path filters.
    pub fn is_internal(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };

        if host == self.seed_host {
            return url.port() == self.seed_port;
        }

        self.include_subdomains && host.ends_with(&format!(".{}", self.seed_host))
    }

    /// Classifies a link target for edge construction
    pub fn classify(&self, url: &Url) -> LinkScope {
        if self.is_internal(url) {
            LinkScope::Internal
        } else {
            LinkScope::External
        }
    }

    /// Whether the URL's path passes the include/exclude filters
    pub fn path_allowed(&self, url: &Url) -> bool {
        let path = url.path();

        if !self.include.is_empty() && !self.include.iter().any(|f| f.matches(path)) {
            return false;
        }

        // Exclude always overrides include
        !self.exclude.iter().any(|f| f.matches(path))
    }

    /// Full scope decision: domain membership plus path filters
    pub fn in_scope(&self, url: &Url) -> bool {
        if self.same_domain_only && !self.is_internal(url) {
            return false;
        }
        self.path_allowed(url)
    }
}
