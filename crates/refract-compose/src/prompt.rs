//! Prompt construction for the composition request.

use refract_scrape::ScrapedPage;

/// Build the user message describing an extracted page.
///
/// Deterministic and side-effect-free. Sections appear in a fixed order and
/// sections with no items are omitted entirely.
#[must_use]
pub fn build_prompt(page: &ScrapedPage) -> String {
    let mut prompt = String::new();

    prompt.push_str("You are a helpful assistant that converts scraped website data into clean HTML.\n");
    prompt.push_str(
        "Study the information, infer the primary theme or purpose of the source page, and \
         reflect it in the layout and copy.\n",
    );
    prompt.push_str(
        "Reimagine the page with modern styling and structure while faithfully preserving all \
         information, wording, lists, and outbound links.\n",
    );
    prompt.push_str(
        "Do not summarise or omit details; represent the source content in full, simply with \
         improved presentation.\n",
    );
    prompt.push_str(
        "Ensure every original link is present and clickable, and reference the original source \
         prominently.\n",
    );
    prompt.push_str("Do not wrap the output in Markdown code fences.\n\n");

    prompt.push_str("Source URL: ");
    prompt.push_str(page.source_url.as_str());
    prompt.push('\n');

    if !page.title.is_empty() {
        prompt.push_str("Title: ");
        prompt.push_str(&page.title);
        prompt.push('\n');
    }

    if !page.description.is_empty() {
        prompt.push_str("Description: ");
        prompt.push_str(&page.description);
        prompt.push('\n');
    }

    if !page.headings.is_empty() {
        prompt.push_str("Headings:\n");
        for heading in &page.headings {
            prompt.push_str(&format!("- H{} {}\n", heading.level, heading.text));
        }
    }

    if !page.paragraphs.is_empty() {
        prompt.push_str("Paragraphs:\n");
        for paragraph in &page.paragraphs {
            prompt.push_str("- ");
            prompt.push_str(paragraph);
            prompt.push('\n');
        }
    }

    if !page.links.is_empty() {
        prompt.push_str("Links:\n");
        for link in &page.links {
            prompt.push_str("- ");
            prompt.push_str(&link.text);
            prompt.push_str(" -> ");
            prompt.push_str(&link.href);
            prompt.push('\n');
        }
    }

    prompt.push_str("\nReturn only raw HTML inside <html> tags.");

    prompt
}
