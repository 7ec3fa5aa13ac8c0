use crate::config::types::AuditConfig;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(AuditConfig)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use sitegeist::config::load_config;
///
/// let config = load_config(Path::new("audit.toml")).unwrap();
/// println!("Max depth: {}", config.crawl.max_depth);
/// ```
pub fn load_config(path: &Path) -> Result<AuditConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: AuditConfig = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(
            r#"
            [crawl]
            max_pages = 25
            max_depth = 2
            workers = 2

            [http]
            request_timeout_secs = 5

            [filters]
            exclude_paths = ["/admin/"]
            "#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.crawl.max_pages, 25);
        assert_eq!(config.crawl.max_depth, 2);
        assert_eq!(config.http.request_timeout_secs, 5);
        assert_eq!(config.filters.exclude_paths, vec!["/admin/"]);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config(Path::new("/nonexistent/audit.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_malformed_toml() {
        let file = create_temp_config("[crawl\nmax_pages = ");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_invalid_config() {
        let file = create_temp_config(
            r#"
            [crawl]
            workers = 0
            "#,
        );
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
