use crate::config::types::{AuditConfig, CrawlConfig, FilterConfig, HttpConfig, SitemapConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
///
/// Validation runs before any fetch; a failure here aborts the audit as a
/// fatal error rather than producing a partial report.
pub fn validate(config: &AuditConfig) -> Result<(), ConfigError> {
    validate_crawl(&config.crawl)?;
    validate_http(&config.http)?;
    validate_filters(&config.filters)?;
    validate_sitemap(&config.sitemap)?;
    Ok(())
}

fn validate_crawl(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if !config.rate_limit_rps.is_finite() || config.rate_limit_rps < 0.0 {
        return Err(ConfigError::Validation(format!(
            "rate_limit_rps must be a non-negative number, got {}",
            config.rate_limit_rps
        )));
    }

    Ok(())
}

fn validate_http(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if !config.retry_backoff_secs.is_finite() || config.retry_backoff_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "retry_backoff_secs must be a non-negative number, got {}",
            config.retry_backoff_secs
        )));
    }

    if config.max_redirects < 1 {
        return Err(ConfigError::Validation(format!(
            "max_redirects must be >= 1, got {}",
            config.max_redirects
        )));
    }

    // Credentials travel together
    if config.auth_username.is_some() != config.auth_password.is_some() {
        return Err(ConfigError::Validation(
            "auth_username and auth_password must both be set or both be absent".to_string(),
        ));
    }

    Ok(())
}

fn validate_filters(config: &FilterConfig) -> Result<(), ConfigError> {
    for pattern in config.include_paths.iter().chain(&config.exclude_paths) {
        validate_path_filter(pattern)?;
    }
    Ok(())
}

/// A path filter is a literal prefix, or a regular expression when prefixed
/// with `re:`. Regex patterns must compile; prefixes must look like paths.
fn validate_path_filter(pattern: &str) -> Result<(), ConfigError> {
    if let Some(expr) = pattern.strip_prefix("re:") {
        regex::Regex::new(expr)
            .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))?;
    } else if !pattern.starts_with('/') {
        return Err(ConfigError::InvalidPattern(format!(
            "path prefix '{}' must start with '/'",
            pattern
        )));
    }
    Ok(())
}

fn validate_sitemap(config: &SitemapConfig) -> Result<(), ConfigError> {
    for sitemap_url in &config.urls {
        Url::parse(sitemap_url).map_err(|e| {
            ConfigError::Validation(format!("Invalid sitemap URL '{}': {}", sitemap_url, e))
        })?;
    }

    if config.max_sitemaps < 1 {
        return Err(ConfigError::Validation(format!(
            "max_sitemaps must be >= 1, got {}",
            config.max_sitemaps
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(validate(&AuditConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = AuditConfig::default();
        config.crawl.workers = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_max_pages_rejected() {
        let mut config = AuditConfig::default();
        config.crawl.max_pages = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_negative_rate_limit_rejected() {
        let mut config = AuditConfig::default();
        config.crawl.rate_limit_rps = -1.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_regex_filter_rejected() {
        let mut config = AuditConfig::default();
        config.filters.exclude_paths = vec!["re:[unclosed".to_string()];
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_prefix_filter_must_be_a_path() {
        let mut config = AuditConfig::default();
        config.filters.include_paths = vec!["blog".to_string()];
        assert!(validate(&config).is_err());

        config.filters.include_paths = vec!["/blog".to_string()];
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_lone_auth_username_rejected() {
        let mut config = AuditConfig::default();
        config.http.auth_username = Some("user".to_string());
        assert!(validate(&config).is_err());

        config.http.auth_password = Some("secret".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_sitemap_url_rejected() {
        let mut config = AuditConfig::default();
        config.sitemap.urls = vec!["not a url".to_string()];
        assert!(validate(&config).is_err());
    }
}
