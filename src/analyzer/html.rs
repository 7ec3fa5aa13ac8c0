//! Default static-HTML page analyzer
//!
//! Extracts the attribute set the aggregation pipeline consumes: title and
//! meta description, heading counts, word count, a visible-text signature,
//! top keywords, the canonical URL, outbound links, and a mixed-content
//! flag, folded into a 0-100 page score.

use crate::analyzer::{AnalyzerError, DiscoveredLink, PageAnalyzer, PageResult};
use scraper::{Html, Node, Selector};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use url::Url;

/// Keywords shorter than this carry no signal for link suggestions
const MIN_KEYWORD_LEN: usize = 4;

/// How many top keywords a page contributes to suggestion matching
const TOP_KEYWORD_COUNT: usize = 10;

/// Scraper-based analyzer working on the fetched body only
#[derive(Debug, Default)]
pub struct HtmlAnalyzer;

impl HtmlAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl PageAnalyzer for HtmlAnalyzer {
    fn analyze(&self, body: &str, url: &Url) -> Result<PageResult, AnalyzerError> {
        let document = Html::parse_document(body);

        let title = select_first_text(&document, "title");
        let meta_description = select_first_attr(&document, "meta[name='description']", "content")
            .filter(|s| !s.is_empty());

        let h1_count = count_selector(&document, "h1");
        let heading_count = count_selector(&document, "h1, h2, h3, h4, h5, h6");

        let text = visible_text(&document);
        let word_count = text.split_whitespace().count();
        let visible_text_hash = (word_count > 0).then(|| text_signature(&text));
        let top_keywords = top_keywords(&text);

        let canonical_url = select_first_attr(&document, "link[rel='canonical']", "href")
            .and_then(|href| url.join(&href).ok())
            .map(|u| u.to_string());

        let links = extract_links(&document, url);
        let mixed_content = url.scheme() == "https" && has_http_assets(&document);

        let score = page_score(
            &title,
            &meta_description,
            h1_count,
            word_count,
            &canonical_url,
            mixed_content,
        );

        Ok(PageResult {
            title,
            meta_description,
            h1_count,
            heading_count,
            word_count,
            visible_text_hash,
            top_keywords,
            canonical_url,
            links,
            mixed_content,
            score,
        })
    }
}

fn select_first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn select_first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|s| s.trim().to_string())
}

fn count_selector(document: &Html, selector: &str) -> usize {
    Selector::parse(selector)
        .map(|s| document.select(&s).count())
        .unwrap_or(0)
}

/// Concatenates text nodes under <body>, skipping non-rendered elements
fn visible_text(document: &Html) -> String {
    let Ok(body_selector) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    let mut out = String::new();
    collect_text(body, &mut out);
    out
}

fn collect_text(element: scraper::ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    out.push_str(trimmed);
                    out.push(' ');
                }
            }
            Node::Element(el) => {
                if !matches!(el.name(), "script" | "style" | "noscript" | "template") {
                    if let Some(child_element) = scraper::ElementRef::wrap(child) {
                        collect_text(child_element, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Case-folded, whitespace-collapsed SHA-256 signature of the visible text
fn text_signature(text: &str) -> String {
    let normalized = text
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

/// Most frequent meaningful words, alphabetically tie-broken for determinism
fn top_keywords(text: &str) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in text.split_whitespace() {
        let word: String = word
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if word.len() >= MIN_KEYWORD_LEN {
            *counts.entry(word).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(TOP_KEYWORD_COUNT)
        .map(|(word, _)| word)
        .collect()
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<DiscoveredLink> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(absolute) = resolve_link(href, base_url) else {
            continue;
        };

        let nofollow = element
            .value()
            .attr("rel")
            .map(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("nofollow")))
            .unwrap_or(false);

        links.push(DiscoveredLink {
            href: absolute,
            nofollow,
        });
    }
    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None for javascript:/mailto:/tel:/data: schemes, fragment-only
/// anchors, unparsable hrefs, and non-HTTP(S) results.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
        || href.starts_with('#')
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);
    Some(absolute.to_string())
}

/// True when the document references plain-HTTP assets
fn has_http_assets(document: &Html) -> bool {
    for (selector, attr) in [
        ("img[src]", "src"),
        ("script[src]", "src"),
        ("iframe[src]", "src"),
        ("link[rel='stylesheet'][href]", "href"),
    ] {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        for element in document.select(&selector) {
            if element
                .value()
                .attr(attr)
                .map(|v| v.trim_start().starts_with("http://"))
                .unwrap_or(false)
            {
                return true;
            }
        }
    }
    false
}

fn page_score(
    title: &Option<String>,
    meta_description: &Option<String>,
    h1_count: usize,
    word_count: usize,
    canonical_url: &Option<String>,
    mixed_content: bool,
) -> f64 {
    let mut score: f64 = 100.0;
    if title.is_none() {
        score -= 15.0;
    }
    if meta_description.is_none() {
        score -= 10.0;
    }
    if h1_count == 0 {
        score -= 10.0;
    }
    if word_count < 300 {
        score -= 10.0;
    }
    if canonical_url.is_none() {
        score -= 5.0;
    }
    if mixed_content {
        score -= 10.0;
    }
    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(body: &str) -> PageResult {
        let url = Url::parse("https://example.com/page").unwrap();
        HtmlAnalyzer::new().analyze(body, &url).unwrap()
    }

    #[test]
    fn test_title_and_meta_extraction() {
        let result = analyze(
            r#"<html><head>
                <title> Hello World </title>
                <meta name="description" content="A test page">
            </head><body><p>hi</p></body></html>"#,
        );
        assert_eq!(result.title.as_deref(), Some("Hello World"));
        assert_eq!(result.meta_description.as_deref(), Some("A test page"));
    }

    #[test]
    fn test_missing_title_is_none() {
        let result = analyze("<html><head></head><body><p>content</p></body></html>");
        assert!(result.title.is_none());
    }

    #[test]
    fn test_heading_counts() {
        let result = analyze(
            "<html><body><h1>A</h1><h1>B</h1><h2>C</h2><h3>D</h3></body></html>",
        );
        assert_eq!(result.h1_count, 2);
        assert_eq!(result.heading_count, 4);
    }

    #[test]
    fn test_script_text_not_counted() {
        let result = analyze(
            "<html><body><p>one two three</p><script>var x = 'lots of invisible words here';</script></body></html>",
        );
        assert_eq!(result.word_count, 3);
    }

    #[test]
    fn test_text_hash_ignores_case_and_whitespace() {
        let a = analyze("<html><body><p>Hello   World</p></body></html>");
        let b = analyze("<html><body><p>hello world</p></body></html>");
        assert_eq!(a.visible_text_hash, b.visible_text_hash);
        assert!(a.visible_text_hash.is_some());
    }

    #[test]
    fn test_link_extraction_and_rel() {
        let result = analyze(
            r##"<html><body>
                <a href="/about">About</a>
                <a href="https://other.com/x" rel="nofollow">Sponsored</a>
                <a href="mailto:hi@example.com">Mail</a>
                <a href="#section">Anchor</a>
                <a href="javascript:void(0)">JS</a>
            </body></html>"##,
        );
        assert_eq!(result.links.len(), 2);
        assert_eq!(result.links[0].href, "https://example.com/about");
        assert!(!result.links[0].nofollow);
        assert_eq!(result.links[1].href, "https://other.com/x");
        assert!(result.links[1].nofollow);
    }

    #[test]
    fn test_canonical_resolved_absolute() {
        let result = analyze(
            r#"<html><head><link rel="canonical" href="/page"></head><body></body></html>"#,
        );
        assert_eq!(
            result.canonical_url.as_deref(),
            Some("https://example.com/page")
        );
    }

    #[test]
    fn test_mixed_content_on_https_page() {
        let result = analyze(
            r#"<html><body><img src="http://cdn.example.com/pic.png"></body></html>"#,
        );
        assert!(result.mixed_content);
    }

    #[test]
    fn test_no_mixed_content_on_http_page() {
        let url = Url::parse("http://example.com/").unwrap();
        let result = HtmlAnalyzer::new()
            .analyze(
                r#"<html><body><img src="http://cdn.example.com/pic.png"></body></html>"#,
                &url,
            )
            .unwrap();
        assert!(!result.mixed_content);
    }

    #[test]
    fn test_top_keywords_ranked_by_frequency() {
        let result = analyze(
            "<html><body><p>rust rust rust crawler crawler audit tiny to</p></body></html>",
        );
        assert_eq!(result.top_keywords[0], "rust");
        assert_eq!(result.top_keywords[1], "crawler");
        // Short words never qualify
        assert!(!result.top_keywords.contains(&"to".to_string()));
    }

    #[test]
    fn test_score_decreases_with_defects() {
        let good = analyze(
            r#"<html><head><title>T</title><meta name="description" content="d">
               <link rel="canonical" href="/page"></head>
               <body><h1>H</h1><p>word</p></body></html>"#,
        );
        let bad = analyze("<html><body></body></html>");
        assert!(good.score > bad.score);
        assert!(bad.score >= 0.0);
    }

    #[test]
    fn test_deterministic() {
        let body = r#"<html><head><title>T</title></head>
            <body><h1>H</h1><p>alpha beta gamma delta</p><a href="/x">x</a></body></html>"#;
        let a = analyze(body);
        let b = analyze(body);
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }
}
