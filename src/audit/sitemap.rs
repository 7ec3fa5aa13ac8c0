//! Sitemap parsing and reconciliation
//!
//! Sitemap locations come from explicit configuration, robots.txt Sitemap
//! directives, or the conventional /sitemap.xml paths, in that order of
//! preference. Sitemap indexes are expanded recursively behind two guards: a
//! visited set (cycles) and a document count cap. Parsed entries are diffed
//! against the crawled URL set in both directions.

use crate::config::SitemapConfig;
use crate::robots::PolitenessPolicy;
use crate::url::normalize_url;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet, VecDeque};
use url::Url;

/// One URL declared by a sitemap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapEntry {
    pub url: String,
    pub lastmod: Option<String>,
    pub priority: Option<f64>,
    /// The sitemap document that declared this entry
    pub source_sitemap: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapFetchError {
    pub sitemap: String,
    pub error: String,
}

/// Sitemap portion of the audit report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SitemapReconciliation {
    /// Every sitemap URL that was attempted
    pub checked: Vec<String>,
    pub parsed_any: bool,
    pub entries: Vec<SitemapEntry>,
    pub errors: Vec<SitemapFetchError>,
    /// Declared in a sitemap, never crawled
    pub in_sitemap_not_crawled: Vec<String>,
    /// Crawled, absent from every sitemap
    pub crawled_not_in_sitemap: Vec<String>,
}

/// A parsed sitemap document
enum SitemapDoc {
    /// <sitemapindex>: child sitemap locations
    Index(Vec<String>),
    /// <urlset>: page entries
    UrlSet(Vec<RawEntry>),
}

#[derive(Debug, Default)]
struct RawEntry {
    loc: Option<String>,
    lastmod: Option<String>,
    priority: Option<f64>,
}

enum Field {
    Loc,
    Lastmod,
    Priority,
}

/// Fetches, parses, and reconciles the site's sitemaps against the crawl
pub async fn reconcile(
    client: &Client,
    policy: &PolitenessPolicy,
    seed: &Url,
    config: &SitemapConfig,
    crawled: &BTreeSet<String>,
) -> SitemapReconciliation {
    let mut result = SitemapReconciliation::default();

    let candidates = candidate_sitemaps(policy, seed, config).await;
    let mut queue: VecDeque<String> = candidates.into_iter().collect();
    let mut visited: HashSet<String> = HashSet::new();

    while let Some(sitemap_url) = queue.pop_front() {
        if !visited.insert(sitemap_url.clone()) {
            continue;
        }
        if visited.len() > config.max_sitemaps {
            tracing::warn!(
                "Sitemap limit of {} reached; remaining sitemaps skipped",
                config.max_sitemaps
            );
            break;
        }
        result.checked.push(sitemap_url.clone());

        let xml = match fetch_sitemap(client, policy, &sitemap_url).await {
            Ok(xml) => xml,
            Err(error) => {
                result.errors.push(SitemapFetchError {
                    sitemap: sitemap_url,
                    error,
                });
                continue;
            }
        };

        match parse_sitemap_xml(&xml) {
            Ok(SitemapDoc::Index(children)) => {
                result.parsed_any = true;
                for child in children {
                    queue.push_back(child);
                }
            }
            Ok(SitemapDoc::UrlSet(entries)) => {
                result.parsed_any = true;
                for entry in entries {
                    if let Some(loc) = entry.loc {
                        result.entries.push(SitemapEntry {
                            url: loc,
                            lastmod: entry.lastmod,
                            priority: entry.priority,
                            source_sitemap: sitemap_url.clone(),
                        });
                    }
                }
            }
            Err(error) => {
                result.errors.push(SitemapFetchError {
                    sitemap: sitemap_url,
                    error,
                });
            }
        }
    }

    if result.parsed_any {
        let declared: BTreeSet<String> = result
            .entries
            .iter()
            .filter_map(|e| normalize_url(&e.url).ok())
            .map(|u| u.to_string())
            .collect();

        result.in_sitemap_not_crawled = declared.difference(crawled).cloned().collect();
        result.crawled_not_in_sitemap = crawled.difference(&declared).cloned().collect();
    }

    result
}

/// Sitemap locations to try, in preference order
async fn candidate_sitemaps(
    policy: &PolitenessPolicy,
    seed: &Url,
    config: &SitemapConfig,
) -> Vec<String> {
    if !config.urls.is_empty() {
        return config.urls.clone();
    }

    let declared = policy.sitemap_hints(seed).await;
    if !declared.is_empty() {
        return declared;
    }

    ["/sitemap.xml", "/sitemap_index.xml"]
        .iter()
        .filter_map(|path| seed.join(path).ok())
        .map(|u| u.to_string())
        .collect()
}

async fn fetch_sitemap(
    client: &Client,
    policy: &PolitenessPolicy,
    sitemap_url: &str,
) -> Result<String, String> {
    let url = Url::parse(sitemap_url).map_err(|e| format!("invalid URL: {}", e))?;
    policy.wait_turn(&url).await;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| format!("fetch failed: {}", e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("http_{}", status.as_u16()));
    }

    response
        .text()
        .await
        .map_err(|e| format!("unreadable body: {}", e))
}

/// Event-driven parse of one sitemap document
fn parse_sitemap_xml(xml: &str) -> Result<SitemapDoc, String> {
    let mut reader = Reader::from_str(xml);

    let mut is_index = false;
    let mut saw_root = false;
    let mut entries: Vec<RawEntry> = Vec::new();
    let mut children: Vec<String> = Vec::new();
    let mut current = RawEntry::default();
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"sitemapindex" => {
                    is_index = true;
                    saw_root = true;
                }
                b"urlset" => {
                    is_index = false;
                    saw_root = true;
                }
                b"url" | b"sitemap" => current = RawEntry::default(),
                b"loc" => field = Some(Field::Loc),
                b"lastmod" => field = Some(Field::Lastmod),
                b"priority" => field = Some(Field::Priority),
                _ => field = None,
            },
            Ok(Event::Text(ref t)) => {
                if let Some(ref f) = field {
                    let text = t
                        .unescape()
                        .map_err(|e| format!("invalid_xml: {}", e))?
                        .trim()
                        .to_string();
                    if !text.is_empty() {
                        match f {
                            Field::Loc => current.loc = Some(text),
                            Field::Lastmod => current.lastmod = Some(text),
                            Field::Priority => current.priority = text.parse().ok(),
                        }
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"url" => entries.push(std::mem::take(&mut current)),
                b"sitemap" => {
                    if let Some(loc) = current.loc.take() {
                        children.push(loc);
                    }
                }
                _ => field = None,
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(format!("invalid_xml: {}", e)),
        }
    }

    if !saw_root {
        return Err("invalid_xml: no urlset or sitemapindex root".to_string());
    }

    if is_index {
        Ok(SitemapDoc::Index(children))
    } else {
        Ok(SitemapDoc::UrlSet(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_urlset() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url>
                <loc>https://example.com/</loc>
                <lastmod>2024-01-15</lastmod>
                <priority>0.8</priority>
              </url>
              <url><loc>https://example.com/about</loc></url>
            </urlset>"#;

        let SitemapDoc::UrlSet(entries) = parse_sitemap_xml(xml).unwrap() else {
            panic!("expected urlset");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].loc.as_deref(), Some("https://example.com/"));
        assert_eq!(entries[0].lastmod.as_deref(), Some("2024-01-15"));
        assert_eq!(entries[0].priority, Some(0.8));
        assert!(entries[1].lastmod.is_none());
    }

    #[test]
    fn test_parse_sitemapindex() {
        let xml = r#"<?xml version="1.0"?>
            <sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <sitemap><loc>https://example.com/sitemap-posts.xml</loc></sitemap>
              <sitemap><loc>https://example.com/sitemap-pages.xml</loc></sitemap>
            </sitemapindex>"#;

        let SitemapDoc::Index(children) = parse_sitemap_xml(xml).unwrap() else {
            panic!("expected index");
        };
        assert_eq!(
            children,
            vec![
                "https://example.com/sitemap-posts.xml".to_string(),
                "https://example.com/sitemap-pages.xml".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_non_sitemap_xml() {
        assert!(parse_sitemap_xml("<html><body>nope</body></html>").is_err());
        assert!(parse_sitemap_xml("not xml at all {{{").is_err());
    }

    #[test]
    fn test_namespaced_tags_handled() {
        // Some generators emit a prefixed namespace
        let xml = r#"<ns:urlset xmlns:ns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <ns:url><ns:loc>https://example.com/x</ns:loc></ns:url>
            </ns:urlset>"#;

        let SitemapDoc::UrlSet(entries) = parse_sitemap_xml(xml).unwrap() else {
            panic!("expected urlset");
        };
        assert_eq!(entries[0].loc.as_deref(), Some("https://example.com/x"));
    }
}
