//! Listing page parser
//!
//! Extracts the entries of a server-rendered directory listing: every
//! `<a href>` in document order, filtered and resolved into [`LinkEntry`]
//! values.

use crate::url::LinkEntry;
use scraper::{Html, Selector};
use url::Url;

/// Parses a listing page into its entries
///
/// Entries keep document order. Repeated hrefs are kept as separate entries.
/// Navigational, query-string, fragment and non-http(s) links are dropped.
///
/// # Example
///
/// ```
/// use sumi_mirror::crawler::parse_listing;
/// use url::Url;
///
/// let html = r#"<a href="../">Parent</a><a href="docs/">docs/</a><a href="a.iso">a.iso</a>"#;
/// let base = Url::parse("https://example.com/pub/").unwrap();
///
/// let entries = parse_listing(html, &base);
/// assert_eq!(entries.len(), 2);
/// assert!(entries[0].is_directory);
/// assert_eq!(entries[1].resolved_url.as_str(), "https://example.com/pub/a.iso");
/// ```
pub fn parse_listing(html: &str, base_url: &Url) -> Vec<LinkEntry> {
    let document = Html::parse_document(html);

    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| LinkEntry::from_href(href, base_url))
        .collect()
}
