//! # Page Extraction
//!
//! Fetches a web page and extracts a bounded structured summary: title,
//! meta description, headings, body paragraphs, and outbound links.
//!
//! ## Features
//!
//! - Single GET with a fixed identifying user-agent and a bounded body read
//! - Headings collected level by level (h1 before h2 before h3)
//! - Short paragraph fragments dropped (boilerplate/nav text)
//! - Links resolved against the source URL, deduplicated, and sorted by
//!   display text
//! - Every sequence capped at a configurable item limit
//!
//! ## Usage
//!
//! ```no_run
//! use refract_scrape::Scraper;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let scraper = Scraper::builder().max_items(20).build();
//! let page = scraper.fetch("https://example.com").await?;
//! println!("{}: {} links", page.title, page.links.len());
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Result type alias for extraction operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Default cap applied to headings, paragraphs, and links independently.
pub const DEFAULT_MAX_ITEMS: usize = 10;

/// Default request timeout for page fetches.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Identifying user-agent sent with every fetch.
const USER_AGENT: &str = "refract-scrape/0.1 (+https://github.com/refract-browser/refract)";

/// Response bodies are read up to this many bytes; the rest is discarded.
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Paragraphs shorter than this (in characters, after trimming) are dropped.
const MIN_PARAGRAPH_CHARS: usize = 40;

/// Errors produced while fetching or extracting a page.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// The target was empty or not an absolute URL.
    #[error("invalid target URL '{0}'")]
    InvalidTarget(String),

    /// The server answered with a non-success status.
    #[error("unexpected status code {status}")]
    FetchFailed {
        /// HTTP status code returned by the server.
        status: u16,
    },

    /// The request could not be completed (connect, timeout, read).
    #[error("fetch document: {0}")]
    Transport(#[from] reqwest::Error),

    /// The body could not be interpreted as an HTML document.
    ///
    /// The html5ever-based parser recovers from malformed input, so this
    /// only surfaces if the parsing backend changes.
    #[error("failed to parse document")]
    ParseFailed,
}

/// A heading and its level (1 through 3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    /// Heading level: 1, 2, or 3.
    pub level: u8,
    /// Trimmed heading text, never empty.
    pub text: String,
}

/// A hyperlink discovered during extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    /// Display text; falls back to the resolved href when the anchor is empty.
    pub text: String,
    /// Absolute href where resolution succeeded, the raw href otherwise.
    pub href: String,
}

/// Structured content extracted from a single page fetch.
///
/// Created once per fetch and immutable afterwards. `headings`,
/// `paragraphs`, and `links` are each bounded by the scraper's item cap.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapedPage {
    /// The absolute URL the page was fetched from.
    pub source_url: Url,
    /// Text of the first `<title>` element, trimmed; empty if absent.
    pub title: String,
    /// `content` of `<meta name="description">`, trimmed; empty if absent.
    pub description: String,
    /// Headings in level-major order (all h1, then h2, then h3).
    pub headings: Vec<Heading>,
    /// Paragraphs of at least 40 characters, in document order.
    pub paragraphs: Vec<String>,
    /// Links deduplicated by href and sorted by display text.
    pub links: Vec<Link>,
    /// When the fetch completed.
    pub fetched_at: DateTime<Utc>,
}

fn create_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Fetches pages and extracts structured content.
pub struct Scraper {
    client: reqwest::Client,
    max_items: usize,
}

impl Scraper {
    /// Create a scraper with default settings (10-item cap, 15s timeout).
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for `Scraper`.
    #[must_use]
    pub fn builder() -> ScraperBuilder {
        ScraperBuilder::default()
    }

    /// The cap applied to each extracted sequence.
    #[must_use]
    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Download `target` and extract structured content.
    ///
    /// The target must be an absolute URL. Bodies larger than 4 MiB are
    /// truncated at the cap rather than rejected.
    pub async fn fetch(&self, target: &str) -> Result<ScrapedPage> {
        let trimmed = target.trim();
        if trimmed.is_empty() {
            return Err(ScrapeError::InvalidTarget(target.to_string()));
        }

        // Url::parse only accepts absolute URLs, which covers the
        // non-absolute rejection as well.
        let url = Url::parse(trimmed)
            .map_err(|_| ScrapeError::InvalidTarget(trimmed.to_string()))?;

        tracing::debug!(url = %url, "fetching page");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        if status >= 400 {
            return Err(ScrapeError::FetchFailed { status });
        }

        let body = read_bounded(response, MAX_BODY_BYTES).await?;
        let text = String::from_utf8_lossy(&body);
        let document = Html::parse_document(&text);

        let page = ScrapedPage {
            title: extract_title(&document),
            description: extract_description(&document),
            headings: collect_headings(&document, self.max_items),
            paragraphs: collect_paragraphs(&document, self.max_items),
            links: collect_links(&document, &url, self.max_items),
            source_url: url,
            fetched_at: Utc::now(),
        };

        tracing::debug!(
            headings = page.headings.len(),
            paragraphs = page.paragraphs.len(),
            links = page.links.len(),
            "extraction complete"
        );

        Ok(page)
    }
}

impl Default for Scraper {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `Scraper`.
#[derive(Default)]
pub struct ScraperBuilder {
    max_items: Option<usize>,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

impl ScraperBuilder {
    /// Set the item cap shared by headings, paragraphs, and links.
    #[must_use]
    pub fn max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use a preconfigured HTTP client instead of the default one.
    #[must_use]
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the `Scraper`.
    #[must_use]
    pub fn build(self) -> Scraper {
        let timeout = self.timeout.unwrap_or(DEFAULT_FETCH_TIMEOUT);
        Scraper {
            client: self.client.unwrap_or_else(|| create_http_client(timeout)),
            max_items: self.max_items.unwrap_or(DEFAULT_MAX_ITEMS),
        }
    }
}

/// Read the response body up to `cap` bytes, discarding the remainder.
async fn read_bounded(mut response: reqwest::Response, cap: usize) -> Result<Vec<u8>> {
    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let remaining = cap - body.len();
        if chunk.len() >= remaining {
            body.extend_from_slice(&chunk[..remaining]);
            tracing::debug!(cap, "response body truncated at read cap");
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

#[allow(clippy::unwrap_used)] // Static CSS selector "title" is always valid
fn extract_title(document: &Html) -> String {
    let selector = Selector::parse("title").unwrap();
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

#[allow(clippy::unwrap_used)] // Static CSS selector is always valid
fn extract_description(document: &Html) -> String {
    let selector = Selector::parse(r#"meta[name="description"]"#).unwrap();
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
        .unwrap_or_default()
}

/// Collect headings level by level: every h1 in document order, then every
/// h2, then every h3, truncated to `limit`.
///
/// With a small limit the h1 block can use up the whole budget and crowd
/// out lower levels entirely. That is the defined tie-break.
#[allow(clippy::unwrap_used)] // Static "h1"/"h2"/"h3" selectors are always valid
fn collect_headings(document: &Html, limit: usize) -> Vec<Heading> {
    let mut headings = Vec::new();
    for level in 1u8..=3 {
        let selector = Selector::parse(&format!("h{level}")).unwrap();
        for element in document.select(&selector) {
            let text = element.text().collect::<String>().trim().to_string();
            if text.is_empty() {
                continue;
            }
            headings.push(Heading { level, text });
        }
    }
    headings.truncate(limit);
    headings
}

#[allow(clippy::unwrap_used)] // Static CSS selector "p" is always valid
fn collect_paragraphs(document: &Html, limit: usize) -> Vec<String> {
    let selector = Selector::parse("p").unwrap();
    let mut paragraphs = Vec::new();
    for element in document.select(&selector) {
        let text = element.text().collect::<String>().trim().to_string();
        // Short fragments are usually navigation or boilerplate.
        if text.chars().count() < MIN_PARAGRAPH_CHARS {
            continue;
        }
        paragraphs.push(text);
    }
    paragraphs.truncate(limit);
    paragraphs
}

/// Collect `<a href>` links: resolve against `base` (keeping the raw href
/// when resolution fails), dedupe by resolved href keeping the first
/// occurrence's text, truncate to `limit`, then sort by display text.
#[allow(clippy::unwrap_used)] // Static CSS selector "a[href]" is always valid
fn collect_links(document: &Html, base: &Url, limit: usize) -> Vec<Link> {
    let selector = Selector::parse("a[href]").unwrap();
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let trimmed = href.trim();
        if trimmed.is_empty() {
            continue;
        }

        let resolved = match base.join(trimmed) {
            Ok(joined) => joined.to_string(),
            Err(_) => trimmed.to_string(),
        };

        if !seen.insert(resolved.clone()) {
            continue;
        }

        let text = element.text().collect::<String>().trim().to_string();
        let text = if text.is_empty() { resolved.clone() } else { text };

        links.push(Link {
            text,
            href: resolved,
        });
    }

    // Truncation happens before the sort, so the kept set is the first
    // `limit` distinct hrefs in document order.
    links.truncate(limit);
    links.sort_by(|a, b| a.text.cmp(&b.text));
    links
}
