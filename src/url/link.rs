use crate::url::sanitize::dir_name_from_href;
use url::Url;

/// Hrefs that only navigate the listing itself
const NAVIGATIONAL_HREFS: &[&str] = &["Go up", "..", "../", "/"];

/// Schemes that never point at a mirrorable resource
const IGNORED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// One anchor extracted from a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    /// The href exactly as written in the page
    pub href_raw: String,

    /// The href joined against the page URL
    pub resolved_url: Url,

    /// Whether the href ends with `/`
    pub is_directory: bool,
}

impl LinkEntry {
    /// Builds an entry from an anchor href, or `None` if the href is filtered
    ///
    /// # Filtering Rules
    ///
    /// **Excluded:**
    /// - empty hrefs
    /// - navigational hrefs: `Go up`, `..`, `../`, `/`
    /// - anything containing `?` (sorted or filtered listing views)
    /// - fragment-only hrefs and `javascript:`, `mailto:`, `tel:`, `data:` links
    /// - hrefs that do not resolve to an http(s) URL
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_mirror::url::LinkEntry;
    /// use url::Url;
    ///
    /// let page = Url::parse("https://example.com/pub/").unwrap();
    ///
    /// let dir = LinkEntry::from_href("docs/", &page).unwrap();
    /// assert!(dir.is_directory);
    /// assert_eq!(dir.resolved_url.as_str(), "https://example.com/pub/docs/");
    ///
    /// assert!(LinkEntry::from_href("?C=M;O=A", &page).is_none());
    /// ```
    pub fn from_href(href: &str, page_url: &Url) -> Option<Self> {
        if is_filtered_href(href) {
            return None;
        }

        let resolved_url = page_url.join(href.trim()).ok()?;
        if resolved_url.scheme() != "http" && resolved_url.scheme() != "https" {
            return None;
        }

        Some(Self {
            href_raw: href.to_string(),
            resolved_url,
            is_directory: href.trim().ends_with('/'),
        })
    }

    /// Local directory name for a directory entry
    ///
    /// Returns `None` for file entries and for names that sanitize to nothing.
    pub fn dir_name(&self) -> Option<String> {
        if !self.is_directory {
            return None;
        }

        let name = dir_name_from_href(&self.href_raw);
        (!name.is_empty()).then_some(name)
    }
}

/// Whether an href carries no content for the mirror
pub fn is_filtered_href(href: &str) -> bool {
    let href = href.trim();

    if href.is_empty() || NAVIGATIONAL_HREFS.contains(&href) || href.contains('?') {
        return true;
    }

    if href.starts_with('#') {
        return true;
    }

    let lower = href.to_ascii_lowercase();
    IGNORED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}
