//! Deterministic reader rendering.
//!
//! Turns a scraped page into a self-contained HTML document with no
//! external call. This is the fallback for rate-limited compositions and
//! the primary rendering for template mode.

use askama::Template;
use refract_scrape::{Heading, Link, ScrapedPage};

/// Error produced when template rendering fails.
#[derive(Debug, thiserror::Error)]
#[error("render template: {0}")]
pub struct RenderError(#[from] askama::Error);

#[derive(Template)]
#[template(path = "page.html")]
struct PageTemplate<'a> {
    title: &'a str,
    source_url: &'a str,
    fetched_at: String,
    description: &'a str,
    headings: &'a [Heading],
    paragraphs: &'a [String],
    links: &'a [Link],
}

/// Render `page` with the built-in reader template.
pub fn render_template(page: &ScrapedPage) -> Result<String, RenderError> {
    let template = PageTemplate {
        title: &page.title,
        source_url: page.source_url.as_str(),
        fetched_at: page.fetched_at.format("%d %b %Y %H:%M UTC").to_string(),
        description: &page.description,
        headings: &page.headings,
        paragraphs: &page.paragraphs,
        links: &page.links,
    };
    Ok(template.render()?)
}
