//! Trip page assembly.
//!
//! The page template is plain HTML with `{{ name }}` placeholders (an optional
//! filter suffix such as `{{ day_by_day | safe }}` is accepted and ignored).
//! Every placeholder must be bound by the trip context: a placeholder with no
//! value is an error, never a silent blank.

use crate::models::{DayEntry, NOT_FOUND, TripRecord};
use once_cell::sync::Lazy;
use quick_xml::escape::partial_escape;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*(?:\|[^{}]*)?\}\}").unwrap());

/// Every key bound by [`trip_context`].
pub const CONTEXT_KEYS: &[&str] = &[
    "title",
    "heading",
    "slug",
    "summary",
    "mood",
    "physical_effort",
    "travel_requirements",
    "meeting_info",
    "day_by_day",
    "included",
    "not_included",
    "cassa_comune",
    "extras",
];

/// A loaded page template and the placeholder names it uses.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    placeholders: BTreeSet<String>,
}

/// Rendering failed because the context does not satisfy the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    MissingFields(Vec<String>),
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::MissingFields(names) => write!(
                f,
                "template placeholders without a value: {}",
                names.join(", ")
            ),
        }
    }
}

impl Error for TemplateError {}

impl Template {
    pub fn parse(source: impl Into<String>) -> Self {
        let source = source.into();
        let placeholders = PLACEHOLDER
            .captures_iter(&source)
            .map(|c| c[1].to_string())
            .collect();
        Self {
            source,
            placeholders,
        }
    }

    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let source = fs::read_to_string(path)
            .await
            .map_err(|e| format!("reading template {}: {e}", path.display()))?;
        let template = Self::parse(source);
        info!(placeholders = template.placeholders.len(), "Loaded page template");
        Ok(template)
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.placeholders.iter().map(String::as_str)
    }

    /// Placeholders that no trip context will ever bind.
    pub fn unknown_placeholders(&self) -> Vec<&str> {
        self.placeholders()
            .filter(|name| !CONTEXT_KEYS.contains(name))
            .collect()
    }

    /// Substitute every placeholder from `context`.
    ///
    /// Values are inserted verbatim. Fails, listing every unbound name, if any
    /// placeholder has no entry in `context`.
    pub fn render(&self, context: &BTreeMap<&str, String>) -> Result<String, TemplateError> {
        let missing: Vec<String> = self
            .placeholders
            .iter()
            .filter(|name| !context.contains_key(name.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(TemplateError::MissingFields(missing));
        }

        let rendered = PLACEHOLDER.replace_all(&self.source, |caps: &Captures<'_>| {
            context.get(&caps[1]).cloned().unwrap_or_default()
        });
        Ok(rendered.into_owned())
    }
}

/// Bind every [`TripRecord`] field to its template key.
pub fn trip_context(record: &TripRecord) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        ("title", record.title.clone()),
        ("heading", record.title.clone()),
        ("slug", record.slug.clone()),
        ("summary", record.summary.clone()),
        ("mood", record.mood.clone()),
        ("physical_effort", record.physical_effort.clone()),
        ("travel_requirements", record.travel_requirements.clone()),
        ("meeting_info", record.meeting_info.clone()),
        ("day_by_day", render_day_by_day(record)),
        ("included", record.included.clone()),
        ("not_included", record.not_included.clone()),
        ("cassa_comune", record.cassa_comune.clone()),
        ("extras", record.extras.clone()),
    ])
}

/// Render a trip into its final page.
pub fn assemble(template: &Template, record: &TripRecord) -> Result<String, TemplateError> {
    template.render(&trip_context(record))
}

/// The itinerary as HTML: one `<section class="giorno">` per day.
///
/// With no parsed days, the raw itinerary section markup is used if the page
/// had one, else a not-found paragraph.
pub fn render_day_by_day(record: &TripRecord) -> String {
    if record.day_by_day.is_empty() {
        return match &record.itinerary_fallback {
            Some(markup) => markup.clone(),
            None => format!("<p>{NOT_FOUND}</p>"),
        };
    }
    record
        .day_by_day
        .iter()
        .map(render_day)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_day(day: &DayEntry) -> String {
    let mut out = format!(
        "<section class=\"giorno\">\n  <h3>Giorno {}: {}</h3>\n",
        day.index,
        partial_escape(day.title.as_str())
    );
    for paragraph in &day.paragraphs {
        out.push_str(&format!("  <p>{paragraph}</p>\n"));
    }
    out.push_str("</section>");
    out
}

/// Write a rendered trip page, creating its directory if needed.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_trip_page(path: &Path, html: &str) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, html).await?;
    info!(bytes = html.len(), "Wrote trip page");
    Ok(())
}
