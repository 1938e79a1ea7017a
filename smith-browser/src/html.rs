//! Page markup extraction
//!
//! Two passes over a page:
//! - a quick headline scan (`h1`-`h3`)
//! - a deep article pass (title plus the first substantive paragraphs of the
//!   main content region)

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use smith_core::{Document, ARTICLE_PARAGRAPH_LIMIT};

static HEADLINE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3").unwrap());

static PARAGRAPH_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());

/// Title candidates, most specific first
static TITLE_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["#firstHeading", "h1", "title"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

/// Main content region candidates, most specific first
static CONTENT_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["#mw-content-text", "main", "article", "[role=main]"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

/// Class fragments marking side content that never counts as body text
const SIDE_CONTENT_CLASSES: &[&str] = &["infobox", "sidebar"];

/// Text of every `h1`, `h2` and `h3` in document order
pub fn extract_headlines(markup: &str) -> Vec<String> {
    let document = Html::parse_document(markup);

    document
        .select(&HEADLINE_SELECTOR)
        .map(|el| element_text(&el))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Title and leading paragraphs of an article page.
///
/// Returns `None` when the page has no recognizable content region.
pub fn extract_article(url: &str, markup: &str) -> Option<Document> {
    let document = Html::parse_document(markup);

    let region = CONTENT_SELECTORS
        .iter()
        .find_map(|selector| document.select(selector).next())?;

    let title = TITLE_SELECTORS
        .iter()
        .find_map(|selector| document.select(selector).next())
        .map(|el| element_text(&el))
        .unwrap_or_default();

    let paragraphs: Vec<String> = region
        .select(&PARAGRAPH_SELECTOR)
        .filter(|p| !in_side_content(p))
        .map(|p| element_text(&p))
        .filter(|text| !text.is_empty())
        .take(ARTICLE_PARAGRAPH_LIMIT)
        .collect();

    Some(Document::new(url, &title, paragraphs.join("\n\n")))
}

/// True when any ancestor carries an infobox/sidebar class
fn in_side_content(element: &ElementRef<'_>) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .map(|el| {
                el.classes().any(|class| {
                    let class = class.to_ascii_lowercase();
                    SIDE_CONTENT_CLASSES.iter().any(|side| class.contains(side))
                })
            })
            .unwrap_or(false)
    })
}

fn element_text(element: &ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
