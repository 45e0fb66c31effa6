//! Utility functions for slug generation, text handling, and file system operations.
//!
//! This module provides helper functions used throughout the pipeline:
//! - Slug generation for output file names and links
//! - Whitespace normalization and truncation for extracted text and logs
//! - URL list parsing
//! - File system validation for output directories

use itertools::Itertools;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Convert arbitrary text to a filesystem- and URL-safe identifier.
///
/// The text is lower-cased, every character that is not alphanumeric,
/// whitespace or a hyphen is dropped, and each run of whitespace/hyphens
/// becomes a single hyphen. Leading and trailing hyphens never appear.
///
/// The function is idempotent: `slugify(&slugify(x)) == slugify(x)`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify("Giappone 360°"), "giappone-360");
/// assert_eq!(slugify("  Tour -- Islanda! "), "tour-islanda");
/// ```
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_separator = false;

    for c in lowered.chars() {
        if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_separator = true;
        }
    }
    slug
}

/// Derive a slug from the last non-empty path segment of a URL.
///
/// The segment is percent-decoded before slugification, so
/// `https://site/viaggi/giappone-360` yields `giappone-360`. Returns `None`
/// when the URL does not parse or has no usable segment.
pub fn slug_from_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let segment = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()?
        .to_string();
    let decoded = urlencoding::decode(&segment)
        .map(|s| s.into_owned())
        .unwrap_or(segment);
    let slug = slugify(&decoded);
    (!slug.is_empty()).then_some(slug)
}

/// Collapse every whitespace run to one space and trim the ends.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().join(" ")
}

/// Parse a URL list: one URL per line, trimmed, blank lines and `#` comments
/// ignored, duplicates dropped keeping the first occurrence.
pub fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .unique()
        .collect()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at a character boundary at or below `max` bytes with
/// an ellipsis and byte count indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
