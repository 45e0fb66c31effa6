//! Index file management for navigation.
//!
//! Two flat HTML indexes link the generated pages together:
//!
//! - **Country index** (`docs/<country>/index.html`): one entry per trip page
//! - **Global index** (`docs/index.html`): one entry per country index
//!
//! # Document Shape
//!
//! A freshly created index is a minimal skeleton with a `<title>`, one `<h1>`
//! and a single `<ul>`. Entries are `<li><a href="TARGET">LABEL</a></li>` lines
//! inserted immediately before the closing tag of the first top-level list.
//!
//! # Append Semantics
//!
//! Updates are idempotent: an entry that is already present verbatim, or whose
//! link target is already linked, leaves the document byte-for-byte unchanged.
//! Existing content is never rewritten.

use crate::models::{Country, TripRecord};
use once_cell::sync::Lazy;
use quick_xml::escape::{escape, partial_escape};
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument};

static LIST_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<(/?)ul\b[^>]*>").unwrap());
static INERT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<!--.*?-->|<script\b.*?</script\s*>").unwrap());
static BODY_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</body\s*>").unwrap());
static LINKS: Lazy<Selector> = Lazy::new(|| Selector::parse("li a[href]").unwrap());

/// One list entry of an index document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    pub href: String,
    pub label: String,
}

impl LinkEntry {
    /// Country-index entry pointing at a trip page.
    pub fn for_trip(record: &TripRecord) -> Self {
        Self {
            href: format!("{}.html", record.slug),
            label: record.title.clone(),
        }
    }

    /// Global-index entry pointing at a country index.
    pub fn for_country(country: &Country) -> Self {
        Self {
            href: format!("{}/index.html", country.code()),
            label: format!("Viaggi in {}", country.display_code()),
        }
    }

    /// The `<li>` line as it is spliced into the document.
    pub fn to_html(&self) -> String {
        format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            escape(self.href.as_str()),
            partial_escape(self.label.as_str())
        )
    }
}

/// Title and heading used when an index has to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexTitle {
    pub title: String,
    pub heading: String,
}

impl IndexTitle {
    pub fn country(country: &Country) -> Self {
        let text = format!("Viaggi in {}", country.display_code());
        Self {
            title: text.clone(),
            heading: text,
        }
    }

    pub fn global() -> Self {
        Self {
            title: "Index globale WeRoad".to_string(),
            heading: "Index globale - Viaggi per nazione".to_string(),
        }
    }
}

/// What an update did to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexChange {
    Created,
    Inserted,
    Unchanged,
}

/// Add `entry` to an index document.
///
/// `existing` is the current document, or `None` when there is none yet, in
/// which case a minimal document holding only `entry` is synthesized.
pub fn update_index(
    existing: Option<&str>,
    entry: &LinkEntry,
    new_doc_title: &IndexTitle,
) -> (String, IndexChange) {
    let line = entry.to_html();

    let Some(content) = existing else {
        return (new_document(new_doc_title, &line), IndexChange::Created);
    };

    if content.contains(&line) || links_to(content, &entry.href) {
        return (content.to_string(), IndexChange::Unchanged);
    }

    let mut updated = String::with_capacity(content.len() + line.len() + 16);
    match list_close_offset(content) {
        Some(at) => {
            updated.push_str(&content[..at]);
            updated.push_str(&line);
            updated.push_str(&content[at..]);
        }
        None => {
            // No usable list: open a new one before </body>, or at the end.
            let at = BODY_CLOSE
                .find(content)
                .map(|m| m.start())
                .unwrap_or(content.len());
            updated.push_str(&content[..at]);
            updated.push_str("<ul>");
            updated.push_str(&line);
            updated.push_str("</ul>\n");
            updated.push_str(&content[at..]);
        }
    }
    (updated, IndexChange::Inserted)
}

/// Read-modify-write an index file on disk.
///
/// Callers must serialize updates to the same path.
#[instrument(level = "info", skip_all, fields(path = %path.display(), href = %entry.href))]
pub async fn update_index_file(
    path: &Path,
    entry: &LinkEntry,
    new_doc_title: &IndexTitle,
) -> Result<IndexChange, Box<dyn Error>> {
    let existing = match fs::read_to_string(path).await {
        Ok(content) => Some(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(format!("reading index {}: {e}", path.display()).into()),
    };

    let (content, change) = update_index(existing.as_deref(), entry, new_doc_title);
    if change == IndexChange::Unchanged {
        debug!("Index already links entry");
        return Ok(change);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, content).await?;
    info!(?change, "Updated index");
    Ok(change)
}

fn new_document(title: &IndexTitle, line: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"it\">\n<head><meta charset=\"UTF-8\"><title>{}</title></head>\n<body>\n<h1>{}</h1>\n<ul>{}</ul>\n</body></html>",
        partial_escape(title.title.as_str()),
        partial_escape(title.heading.as_str()),
        line
    )
}

/// Byte offset of the `</ul>` closing the first top-level list.
///
/// List tags inside comments and scripts are not markup and are skipped. If
/// the nesting never balances, the first real `</ul>` is used.
fn list_close_offset(content: &str) -> Option<usize> {
    let inert: Vec<(usize, usize)> = INERT
        .find_iter(content)
        .map(|m| (m.start(), m.end()))
        .collect();
    let mut depth = 0usize;
    let mut first_close = None;

    for tag in LIST_TAG.captures_iter(content) {
        let whole = tag.get(0)?;
        if inert
            .iter()
            .any(|&(start, end)| whole.start() >= start && whole.start() < end)
        {
            continue;
        }
        if tag[1].is_empty() {
            depth += 1;
            continue;
        }
        first_close.get_or_insert(whole.start());
        if depth > 0 {
            depth -= 1;
            if depth == 0 {
                return Some(whole.start());
            }
        }
    }
    first_close
}

fn links_to(content: &str, href: &str) -> bool {
    Html::parse_document(content)
        .select(&LINKS)
        .any(|a| a.value().attr("href") == Some(href))
}
