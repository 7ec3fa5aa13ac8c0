use crate::UrlError;
use url::Url;

/// Normalizes a URL into the form used as the frontier's dedup key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not HTTP(S)
/// 2. Lowercase the scheme and host (the `url` crate does this at parse time)
/// 3. Drop the default port for the scheme (also handled at parse time)
/// 4. Remove the fragment (everything after #)
/// 5. Remove the trailing slash from non-root paths
///
/// Query strings pass through untouched. The function is idempotent:
/// `normalize_url(u.as_str())` returns `u` unchanged for any of its own
/// outputs.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or unsupported scheme
///
/// # Examples
///
/// ```
/// use sitegeist::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.COM:80/page/#intro").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    // Trailing slash: "/page/" and "/page" are the same document; the root
    // path "/" stays as-is.
    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path[..path.len() - 1].to_string();
        url.set_path(&trimmed);
    }

    Ok(url)
}
