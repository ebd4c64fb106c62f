//! HTML → Markdown assembly for the two web adapters.
//!
//! Both adapters end up holding an HTML document: the browser adapter takes
//! the rendered DOM after scripts ran, the scraping-API adapter gets the HTML
//! the API fetched. Each keeps its own historic Markdown layout:
//!
//! * browser: text, tables, links, images in labelled sections, with links
//!   and image sources resolved against the page URL
//! * scraping API: headings, paragraphs, images, links in that order, with
//!   attribute values taken verbatim
//!
//! Within each section elements appear in document order.

use crate::model::WebScrapeResult;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::fmt::Write as _;
use url::Url;

static SEL_BROWSER_TEXT: Lazy<Selector> = Lazy::new(|| Selector::parse("h1, h2, h3, p").unwrap());
static SEL_HEADINGS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());
static SEL_P: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static SEL_TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());
static SEL_TR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static SEL_CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("th, td").unwrap());
static SEL_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static SEL_IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Assemble the browser adapter's Markdown from a rendered DOM.
pub fn browser_markdown(page_url: &str, html: &str) -> WebScrapeResult {
    let doc = Html::parse_document(html);
    let base = Url::parse(page_url).ok();
    let mut md = format!("# Extracted Content from {}\n\n", page_url);
    let mut image_urls = Vec::new();

    md.push_str("## Text Content\n\n");
    for el in doc.select(&SEL_BROWSER_TEXT) {
        let _ = write!(md, "{}\n\n", rendered_text(el));
    }

    md.push_str("## Tables\n\n");
    for (table_index, table) in doc.select(&SEL_TABLE).enumerate() {
        let _ = write!(md, "### Table {}\n\n", table_index + 1);
        for row in table.select(&SEL_TR) {
            let cells: Vec<String> = row.select(&SEL_CELL).map(rendered_text).collect();
            let _ = writeln!(md, "| {} |", cells.join(" | "));
        }
        md.push('\n');
    }

    md.push_str("## Links\n\n");
    for link in doc.select(&SEL_LINK) {
        let Some(href) = link.value().attr("href").filter(|h| !h.trim().is_empty()) else {
            continue;
        };
        let _ = writeln!(md, "- [{}]({})", rendered_text(link), resolve(base.as_ref(), href));
    }
    md.push('\n');

    md.push_str("## Images\n\n");
    let mut image_index = 0;
    for img in doc.select(&SEL_IMG) {
        let Some(src) = img.value().attr("src").filter(|s| !s.trim().is_empty()) else {
            continue;
        };
        image_index += 1;
        let absolute = resolve(base.as_ref(), src);
        let _ = writeln!(md, "![Image {}]({})", image_index, absolute);
        if is_http(&absolute) {
            image_urls.push(absolute);
        }
    }

    WebScrapeResult {
        markdown: md,
        image_urls,
    }
}

/// Assemble the scraping-API adapter's Markdown from fetched HTML.
pub fn scraping_api_markdown(html: &str) -> WebScrapeResult {
    let doc = Html::parse_document(html);
    let mut md = String::from("# Webpage Content\n\n");
    let mut image_urls = Vec::new();

    for header in doc.select(&SEL_HEADINGS) {
        let _ = write!(md, "## {}\n\n", stripped_text(header));
    }

    for para in doc.select(&SEL_P) {
        let _ = write!(md, "{}\n\n", stripped_text(para));
    }

    for img in doc.select(&SEL_IMG) {
        let Some(src) = img.value().attr("src") else {
            continue;
        };
        if src.starts_with("http") {
            let _ = write!(md, "![Image]({})\n\n", src);
            image_urls.push(src.to_string());
        }
    }

    for link in doc.select(&SEL_LINK) {
        let href = link.value().attr("href").unwrap_or_default();
        let _ = writeln!(md, "[{}]({})", stripped_text(link), href);
    }

    WebScrapeResult {
        markdown: md,
        image_urls,
    }
}

/// Text as a browser would show it: whitespace runs collapse to one space.
fn rendered_text(el: ElementRef<'_>) -> String {
    let joined: String = el.text().collect();
    RE_WHITESPACE.replace_all(joined.trim(), " ").into_owned()
}

/// Every text node trimmed, empties dropped, concatenated without separator.
fn stripped_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).filter(|t| !t.is_empty()).collect()
}

fn resolve(base: Option<&Url>, reference: &str) -> String {
    let reference = reference.trim();
    match base.and_then(|b| b.join(reference).ok()) {
        Some(url) => url.to_string(),
        None => reference.to_string(),
    }
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
