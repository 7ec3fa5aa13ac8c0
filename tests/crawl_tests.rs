//! Integration tests for crawl mechanics
//!
//! Mock-server sites exercise the frontier caps, dedup under concurrency,
//! robots handling, redirect-loop detection, and cancellation.

use sitegeist::{AuditConfig, SiteAudit};
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> AuditConfig {
    let mut config = AuditConfig::default();
    config.crawl.workers = 4;
    config.crawl.respect_robots = true;
    config.http.retry_backoff_secs = 0.0;
    config
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, route: &str, body: &str, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html_page(body))
        .expect(expected_hits)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_no_url_fetched_twice_under_concurrency() {
    let server = MockServer::start().await;
    let base = server.uri();

    // Densely cross-linked site: every page links to every other page, so
    // each URL is discovered many times by concurrent workers.
    let routes: Vec<String> = (1..=10).map(|i| format!("/page{}", i)).collect();

    let mut root_body = String::from("<html><head><title>Root</title></head><body>");
    for route in &routes {
        root_body.push_str(&format!(r#"<a href="{}{}">x</a>"#, base, route));
    }
    root_body.push_str("</body></html>");
    mount_page(&server, "/", &root_body, 1).await;

    for route in &routes {
        let mut body = format!("<html><head><title>{}</title></head><body>", route);
        for other in &routes {
            body.push_str(&format!(r#"<a href="{}{}">x</a>"#, base, other));
        }
        body.push_str(r#"<a href="/">home</a></body></html>"#);
        // The expectation is the test: exactly one fetch per page
        mount_page(&server, route, &body, 1).await;
    }

    let mut config = test_config();
    config.crawl.workers = 8;
    let report = SiteAudit::new(&base, config).unwrap().run().await.unwrap();

    assert_eq!(report.pages.len(), 11);
    let unique: HashSet<&str> = report.pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(unique.len(), 11, "every page record is a distinct URL");
    // MockServer verifies the expect(1) counts on drop
}

#[tokio::test]
async fn test_max_pages_cap_holds() {
    let server = MockServer::start().await;
    let base = server.uri();

    let mut root_body = String::from("<html><body>");
    for i in 1..=20 {
        root_body.push_str(&format!(r#"<a href="{}/p{}">x</a>"#, base, i));
    }
    root_body.push_str("</body></html>");
    mount_page(&server, "/", &root_body, 1).await;

    for i in 1..=20 {
        Mock::given(method("GET"))
            .and(path(format!("/p{}", i)))
            .respond_with(html_page("<html><body>leaf</body></html>"))
            .mount(&server)
            .await;
    }

    let mut config = test_config();
    config.crawl.max_pages = 5;
    let report = SiteAudit::new(&base, config).unwrap().run().await.unwrap();

    assert_eq!(report.pages.len(), 5);
    assert!(report.summary.crawl.fetched <= 5);
}

#[tokio::test]
async fn test_max_depth_cap_holds() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        &format!(r#"<html><body><a href="{}/d1">next</a></body></html>"#, base),
        1,
    )
    .await;
    mount_page(
        &server,
        "/d1",
        &format!(r#"<html><body><a href="{}/d2">next</a></body></html>"#, base),
        1,
    )
    .await;
    // Depth 2 exceeds the cap and must never be fetched
    Mock::given(method("GET"))
        .and(path("/d2"))
        .respond_with(html_page("<html><body>too deep</body></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = test_config();
    config.crawl.max_depth = 1;
    let report = SiteAudit::new(&base, config).unwrap().run().await.unwrap();

    assert_eq!(report.pages.len(), 2);
    assert!(report.pages.iter().all(|p| p.depth <= 1));
    assert!(report.summary.crawl.skipped_scope >= 1);
}

#[tokio::test]
async fn test_robots_disallow_respected() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"),
        )
        .mount(&server)
        .await;

    mount_page(
        &server,
        "/",
        &format!(
            r#"<html><body><a href="{0}/public">a</a><a href="{0}/private">b</a></body></html>"#,
            base
        ),
        1,
    )
    .await;
    mount_page(&server, "/public", "<html><body>open</body></html>", 1).await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(html_page("<html><body>secret</body></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let report = SiteAudit::new(&base, test_config())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(report.pages.iter().all(|p| !p.url.ends_with("/private")));
    assert_eq!(report.summary.crawl.skipped_robots, 1);
}

#[tokio::test]
async fn test_robots_disallow_ignored_when_disabled() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"),
        )
        .mount(&server)
        .await;

    mount_page(
        &server,
        "/",
        &format!(r#"<html><body><a href="{}/private">b</a></body></html>"#, base),
        1,
    )
    .await;
    mount_page(&server, "/private", "<html><body>secret</body></html>", 1).await;

    let mut config = test_config();
    config.crawl.respect_robots = false;
    let report = SiteAudit::new(&base, config).unwrap().run().await.unwrap();

    assert!(report.pages.iter().any(|p| p.url.ends_with("/private")));
    assert_eq!(report.summary.crawl.skipped_robots, 0);
}

#[tokio::test]
async fn test_redirect_loop_reported_not_retried_forever() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        &format!(r#"<html><body><a href="{}/loop-a">go</a></body></html>"#, base),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/loop-a"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop-b"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/loop-b"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop-a"))
        .expect(1)
        .mount(&server)
        .await;

    let report = SiteAudit::new(&base, test_config())
        .unwrap()
        .run()
        .await
        .unwrap();

    let loop_page = report
        .pages
        .iter()
        .find(|p| p.url.ends_with("/loop-a"))
        .expect("looping URL has a page record");
    assert!(loop_page.redirect_loop);
    assert_eq!(loop_page.redirect_chain.len(), 2, "full chain reported");

    assert!(report
        .issues
        .iter()
        .any(|i| i.code == "REDIRECT_LOOP" && i.url.ends_with("/loop-a")));
    assert_eq!(report.summary.redirect_loops.len(), 1);
    assert_eq!(report.summary.crawl.errored, 1);
}

#[tokio::test]
async fn test_cancellation_yields_partial_report() {
    let server = MockServer::start().await;
    let base = server.uri();

    let mut root_body = String::from("<html><body>");
    for i in 1..=10 {
        root_body.push_str(&format!(r#"<a href="{}/slow{}">x</a>"#, base, i));
    }
    root_body.push_str("</body></html>");
    mount_page(&server, "/", &root_body, 1).await;

    for i in 1..=10 {
        Mock::given(method("GET"))
            .and(path(format!("/slow{}", i)))
            .respond_with(
                html_page("<html><body>slow</body></html>")
                    .set_delay(Duration::from_millis(150)),
            )
            .mount(&server)
            .await;
    }

    let mut config = test_config();
    config.crawl.workers = 1;

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(400)).await;
        canceller.cancel();
    });

    let report = SiteAudit::new(&base, config)
        .unwrap()
        .run_with_cancellation(cancel)
        .await
        .unwrap();

    assert!(report.partial);
    assert!(
        report.pages.len() < 11,
        "cancelled crawl stops before visiting everything"
    );
    // The crawled-so-far report is still fully formed
    assert!(!report.pages.is_empty());
    assert_eq!(report.summary.root_url, format!("{}/", base));
}

#[tokio::test]
async fn test_non_html_pages_recorded_but_not_parsed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        &format!(r#"<html><body><a href="{}/data.json">d</a></body></html>"#, base),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"not": "html"}"#)
                .insert_header("content-type", "application/json"),
        )
        .mount(&server)
        .await;

    let report = SiteAudit::new(&base, test_config())
        .unwrap()
        .run()
        .await
        .unwrap();

    let json_page = report
        .pages
        .iter()
        .find(|p| p.url.ends_with("/data.json"))
        .expect("non-HTML URL still gets a record");
    assert_eq!(json_page.status, Some(200));
    assert!(json_page.analysis.is_none());
}
