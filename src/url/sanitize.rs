use std::borrow::Cow;
use std::path::MAIN_SEPARATOR;
use url::Url;

/// Characters that would let a name escape its parent directory
const SEPARATORS: &[char] = &['/', '\\', MAIN_SEPARATOR, '\0'];

/// Derives a local file name from the last path segment of a URL
///
/// The segment is percent-decoded, then every path separator is removed.
/// Degenerate results (`""`, `"."`, `".."`) come back as the empty string;
/// callers must treat an empty name as "do not download".
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::sanitize_file_name;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/pub/My%20File.tar.gz").unwrap();
/// assert_eq!(sanitize_file_name(&url), "My File.tar.gz");
///
/// let url = Url::parse("https://example.com/pub/").unwrap();
/// assert_eq!(sanitize_file_name(&url), "");
/// ```
pub fn sanitize_file_name(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    let name: String = percent_decode(segment)
        .chars()
        .filter(|c| !SEPARATORS.contains(c))
        .collect();

    reject_degenerate(name)
}

/// Cleans a raw (already slash-stripped) directory segment
///
/// Removes every occurrence of `..` and every path separator. A result of
/// `"."` is degenerate and returned as the empty string.
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::sanitize_dir_name;
///
/// assert_eq!(sanitize_dir_name("../../etc"), "etc");
/// assert_eq!(sanitize_dir_name("docs"), "docs");
/// assert_eq!(sanitize_dir_name(".."), "");
/// ```
pub fn sanitize_dir_name(raw_name: &str) -> String {
    let mut name = raw_name.replace("..", "");
    name.retain(|c| !SEPARATORS.contains(&c));
    reject_degenerate(name)
}

/// Decodes a raw directory href and sanitizes it
///
/// Leading and trailing slashes are stripped before decoding, so
/// `"sub%20dir/"` becomes `"sub dir"` and `"%2e%2e/"` becomes empty.
pub fn dir_name_from_href(href: &str) -> String {
    let trimmed = href.trim().trim_matches('/');
    sanitize_dir_name(&percent_decode(trimmed))
}

/// Whether a sanitized name is usable as a path component
pub fn is_usable_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}

fn percent_decode(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

fn reject_degenerate(name: String) -> String {
    if is_usable_name(&name) {
        name
    } else {
        String::new()
    }
}
