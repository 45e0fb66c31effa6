//! Field extraction from rendered trip pages.
//!
//! Extraction is synchronous and never fails: every lookup that misses falls
//! back to a fixed value (see [`NOT_FOUND`]) so that one odd page never aborts
//! the batch.
//!
//! # Submodules
//!
//! - [`section`]: heading-labelled sections ("Mood di viaggio", "Ritrovo", ...)
//! - [`itinerary`]: the day-by-day itinerary, across both markup variants
//! - [`modal`]: the four fixed sections of the pricing modal

pub mod itinerary;
pub mod modal;
pub mod section;

use crate::models::{DEFAULT_TITLE, ModalSections, NOT_FOUND, TripRecord};
use crate::utils::normalize_ws;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

use itinerary::extract_itinerary;
use modal::{ModalSource, extract_modal_sections, find_modal_sections, with_headings};
use section::{Collect, SectionLabels, SectionQuery, extract_section, find_section};

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static LONG_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.long-description").unwrap());
pub(crate) static H2: Lazy<Selector> = Lazy::new(|| Selector::parse("h2").unwrap());
pub(crate) static P: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

/// Heading label of the whole itinerary section, used when no day blocks parse.
const ITINERARY_LABEL: &str = "Itinerario giorno per giorno";

/// A parsed trip page.
///
/// Created once per URL or file and dropped after field extraction.
pub struct TripDocument {
    pub title: String,
    pub html: Html,
}

impl TripDocument {
    /// Parse a full HTML document and read its `<title>`.
    pub fn parse(markup: &str) -> Self {
        let html = Html::parse_document(markup);
        let title = html
            .select(&TITLE)
            .next()
            .map(text_of)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        Self { title, html }
    }

    /// Text of `div.long-description`, or [`NOT_FOUND`].
    ///
    /// Paragraphs are joined with a space so adjacent blocks never run
    /// together.
    pub fn summary(&self) -> String {
        let Some(block) = self.html.select(&LONG_DESCRIPTION).next() else {
            return NOT_FOUND.to_string();
        };
        let paragraphs: Vec<String> = block
            .select(&P)
            .map(text_of)
            .filter(|t| !t.is_empty())
            .collect();
        if paragraphs.is_empty() {
            text_of(block)
        } else {
            paragraphs.join(" ")
        }
    }
}

impl std::fmt::Debug for TripDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TripDocument")
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

/// Run every extractor over `doc` and assemble the [`TripRecord`].
///
/// `modal_text` is the modal's plain text as captured by the renderer. It is
/// used when the document has no modal container, or when the container's
/// direct children carry none of the section labels (the site often nests
/// its headings one level deeper).
#[instrument(level = "debug", skip_all, fields(%slug))]
pub fn extract_record(
    doc: &TripDocument,
    slug: &str,
    modal_text: Option<&str>,
    labels: &SectionLabels,
) -> TripRecord {
    let structured = find_modal_sections(ModalSource::Document(&doc.html))
        .filter(|sections| *sections != ModalSections::default());
    let modal = match (structured, modal_text) {
        (Some(sections), _) => sections,
        (None, Some(text)) => {
            debug!("No labelled sections in DOM modal; using captured modal text");
            with_headings(extract_modal_sections(ModalSource::Text(text)))
        }
        (None, None) => {
            debug!("No modal found");
            ModalSections::default()
        }
    };

    let day_by_day = extract_itinerary(&doc.html);
    debug!(days = day_by_day.len(), "Extracted itinerary");
    let itinerary_fallback = if day_by_day.is_empty() {
        itinerary_fallback_markup(doc)
    } else {
        None
    };

    TripRecord {
        title: doc.title.clone(),
        slug: slug.to_string(),
        summary: doc.summary(),
        mood: extract_section(&doc.html, &labels.mood),
        physical_effort: extract_section(&doc.html, &labels.physical_effort),
        travel_requirements: extract_section(&doc.html, &labels.travel_requirements),
        meeting_info: extract_section(&doc.html, &labels.meeting_info),
        day_by_day,
        itinerary_fallback,
        included: modal.included,
        not_included: modal.not_included,
        cassa_comune: modal.cassa_comune,
        extras: modal.extras,
    }
}

/// Raw markup of the itinerary section, for pages whose day blocks did not parse.
pub fn itinerary_fallback_markup(doc: &TripDocument) -> Option<String> {
    find_section(
        &doc.html,
        &SectionQuery {
            label: ITINERARY_LABEL,
            heading: &H2,
            collect: Collect::Markup,
        },
    )
}

/// Whitespace-normalized text content of an element.
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    normalize_ws(&el.text().collect::<String>())
}

/// First element after `start` in document order matching `target`.
///
/// Descendants of `start` count as "after". The walk gives up when it reaches
/// an element matching `stop`, so one block's lookup never bleeds into the
/// next block.
pub(crate) fn find_next<'a>(
    doc: &'a Html,
    start: ElementRef<'a>,
    target: &Selector,
    stop: Option<&Selector>,
) -> Option<ElementRef<'a>> {
    let mut passed = false;
    for node in doc.tree.root().descendants() {
        if node.id() == start.id() {
            passed = true;
            continue;
        }
        if !passed {
            continue;
        }
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        if stop.is_some_and(|s| s.matches(&el)) {
            return None;
        }
        if target.matches(&el) {
            return Some(el);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>  Giappone 360° </title></head>
<body>
  <div class="long-description"><p>Un viaggio   tra templi</p><p>e neon.</p></div>
  <section><h2>Mood di viaggio</h2><p>Relax</p><p>Cultura</p></section>
  <section><h2>Impegno fisico</h2><p>Medio</p></section>
  <div data-name="accordion-header"><span>1</span><h4>Tokyo</h4></div>
  <div class="wr-modal-external-container">
    <h2>Cosa è incluso</h2><ul><li>Volo</li></ul>
  </div>
</body></html>"#;

    #[test]
    fn test_parse_reads_title_and_summary() {
        let doc = TripDocument::parse(PAGE);
        assert_eq!(doc.title, "Giappone 360°");
        assert_eq!(doc.summary(), "Un viaggio tra templi e neon.");
    }

    #[test]
    fn test_parse_without_title_uses_default() {
        let doc = TripDocument::parse("<html><body><p>x</p></body></html>");
        assert_eq!(doc.title, DEFAULT_TITLE);
        assert_eq!(doc.summary(), NOT_FOUND);
    }

    #[test]
    fn test_extract_record_fills_every_field() {
        let doc = TripDocument::parse(PAGE);
        let record = extract_record(&doc, "giappone-360", None, &SectionLabels::default());

        assert_eq!(record.slug, "giappone-360");
        assert_eq!(record.mood, "Relax\nCultura");
        assert_eq!(record.physical_effort, "Medio");
        assert_eq!(record.travel_requirements, NOT_FOUND);
        assert_eq!(record.meeting_info, NOT_FOUND);
        assert_eq!(record.day_by_day.len(), 1);
        assert_eq!(record.day_by_day[0].title, "Tokyo");
        assert_eq!(record.included, "<h2>Cosa è incluso</h2><ul><li>Volo</li></ul>");
        assert_eq!(record.not_included, "");
    }

    #[test]
    fn test_extract_record_uses_modal_text_when_dom_headings_are_nested() {
        let doc = TripDocument::parse(
            r#"<html><body><div class="wr-modal-external-container">
<div><h2>Cosa è incluso</h2><ul><li>Volo</li></ul></div>
</div></body></html>"#,
        );
        let record = extract_record(
            &doc,
            "t",
            Some("Cosa è incluso\nVolo"),
            &SectionLabels::default(),
        );
        assert_eq!(record.included, "<h2>Cosa è incluso</h2>\n<p>Volo</p>\n");

        let without_text = extract_record(&doc, "t", None, &SectionLabels::default());
        assert_eq!(without_text.included, "");
    }

    #[test]
    fn test_extract_record_falls_back_to_modal_text() {
        let doc = TripDocument::parse("<html><head><title>T</title></head><body></body></html>");
        let text = "Info aggiuntive\nPortare passaporto";
        let record = extract_record(&doc, "t", Some(text), &SectionLabels::default());
        assert_eq!(
            record.extras,
            "<h2>Info aggiuntive</h2>\n<p>Portare passaporto</p>\n"
        );
        assert!(record.day_by_day.is_empty());
    }

    #[test]
    fn test_itinerary_fallback_markup() {
        let doc = TripDocument::parse(
            "<html><body><div id=\"it\"><h2>Itinerario giorno per giorno</h2><p>Giorno 1</p></div></body></html>",
        );
        let markup = itinerary_fallback_markup(&doc).unwrap();
        assert!(markup.starts_with("<div id=\"it\">"));
        assert!(markup.contains("<p>Giorno 1</p>"));
    }

    #[test]
    fn test_find_next_stops_at_boundary() {
        let html = Html::parse_document(
            r#"<div class="a"></div><div class="stop"></div><h4>late</h4>"#,
        );
        let a = Selector::parse("div.a").unwrap();
        let stop = Selector::parse("div.stop").unwrap();
        let h4 = Selector::parse("h4").unwrap();
        let start = html.select(&a).next().unwrap();
        assert!(find_next(&html, start, &h4, Some(&stop)).is_none());
        assert_eq!(
            find_next(&html, start, &h4, None).map(text_of).as_deref(),
            Some("late")
        );
    }
}
