//! Integration tests for page extraction using a mock HTTP server.
//! These tests don't require network access or external dependencies.
//!
//! Run with: cargo test -p refract-scrape --test scrape_mock_server_tests

#![allow(clippy::unwrap_used)]

use refract_scrape::{ScrapeError, Scraper};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve_html(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_fetch_extracts_title_description_and_content() {
    let long = "This paragraph is comfortably longer than forty characters in total.";
    let body = format!(
        r#"<html><head>
             <title>Release Notes</title>
             <meta name="description" content="What changed this cycle.">
           </head><body>
             <h1>Overview</h1>
             <p>{long}</p>
             <a href="/details">Details</a>
           </body></html>"#
    );
    let server = serve_html(&body).await;

    let scraper = Scraper::new();
    let page = scraper.fetch(&format!("{}/page", server.uri())).await.unwrap();

    assert_eq!(page.title, "Release Notes");
    assert_eq!(page.description, "What changed this cycle.");
    assert_eq!(page.headings.len(), 1);
    assert_eq!(page.paragraphs, vec![long.to_string()]);
    assert_eq!(page.links.len(), 1);
    assert_eq!(page.links[0].href, format!("{}/details", server.uri()));
    assert_eq!(page.source_url.as_str(), format!("{}/page", server.uri()));
}

#[tokio::test]
async fn test_fetch_sends_identifying_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(wiremock::matchers::header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let scraper = Scraper::new();
    scraper.fetch(&format!("{}/page", server.uri())).await.unwrap();
}

#[tokio::test]
async fn test_fetch_surfaces_http_status_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let scraper = Scraper::new();
    let err = scraper
        .fetch(&format!("{}/page", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::FetchFailed { status: 404 }));
}

#[tokio::test]
async fn test_fetch_surfaces_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let scraper = Scraper::new();
    let err = scraper
        .fetch(&format!("{}/page", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::FetchFailed { status: 503 }));
}

#[tokio::test]
async fn test_heading_cap_excludes_lower_levels_end_to_end() {
    // Three h1 elements and a cap of two: only the first two h1 texts
    // survive, and the h2 never appears.
    let body = r#"<html><body>
        <h1>One</h1><h1>Two</h1><h1>Three</h1>
        <h2>Subheading</h2>
    </body></html>"#;
    let server = serve_html(body).await;

    let scraper = Scraper::builder().max_items(2).build();
    let page = scraper.fetch(&format!("{}/page", server.uri())).await.unwrap();

    let texts: Vec<_> = page.headings.iter().map(|h| h.text.as_str()).collect();
    assert_eq!(texts, ["One", "Two"]);
    assert!(page.headings.iter().all(|h| h.level == 1));
}

#[tokio::test]
async fn test_counts_over_cap_truncate_to_cap_exactly() {
    let long = "z".repeat(50);
    let paragraphs: String = (0..14).map(|_| format!("<p>{long}</p>")).collect();
    let links: String = (0..14)
        .map(|i| format!(r#"<a href="/l{i}">Link {i:02}</a>"#))
        .collect();
    let body = format!("<html><body>{paragraphs}{links}</body></html>");
    let server = serve_html(&body).await;

    let scraper = Scraper::new();
    let page = scraper.fetch(&format!("{}/page", server.uri())).await.unwrap();

    assert_eq!(page.paragraphs.len(), 10);
    assert_eq!(page.links.len(), 10);
}
