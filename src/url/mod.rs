//! URL handling module for Sumi-Mirror
//!
//! This module turns listing hrefs into [`LinkEntry`] values and turns URLs
//! and raw link text into safe local path segments.

mod link;
mod sanitize;

// Re-export main functions
pub use link::{is_filtered_href, LinkEntry};
pub use sanitize::{dir_name_from_href, is_usable_name, sanitize_dir_name, sanitize_file_name};
