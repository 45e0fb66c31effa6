//! Day-by-day itinerary extraction.
//!
//! The site has shipped two itinerary layouts over time:
//!
//! - **Accordion**: each day has a `div[data-name='accordion-header']` holding
//!   the day label and an `<h4>` title; the day body is the next `div` sibling
//!   of the header's parent, with a `div.description.content` block (plain
//!   text) and a `div.info` block (inline markup kept).
//! - **Substage**: day titles and `div.substage` description blocks are laid
//!   out independently and paired by position.
//!
//! [`detect_variant`] picks the layout and [`extract_itinerary`] runs the
//! matching [`ItineraryStrategy`]. A day with missing pieces keeps its slot
//! with empty fields; day indices are always `1..=n`.

use super::{P, find_next, text_of};
use crate::models::DayEntry;
use once_cell::sync::Lazy;
use quick_xml::escape::partial_escape;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

static ACCORDION_HEADER: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div[data-name='accordion-header']").unwrap());
static SPAN: Lazy<Selector> = Lazy::new(|| Selector::parse("span").unwrap());
static H4: Lazy<Selector> = Lazy::new(|| Selector::parse("h4").unwrap());
static DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.description.content").unwrap());
static INFO: Lazy<Selector> = Lazy::new(|| Selector::parse("div.info").unwrap());
static DAY_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h4.day-title, [data-name='day-title']").unwrap());
static SUBSTAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("div.substage").unwrap());

/// Which itinerary markup a page uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupVariant {
    Accordion,
    Substage,
}

/// One way of turning a page into ordered [`DayEntry`] values.
pub trait ItineraryStrategy {
    fn extract(&self, doc: &Html) -> Vec<DayEntry>;
}

/// Pairs each accordion header with its structurally adjacent body.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralPairing;

/// Zips day titles with substage blocks by position.
#[derive(Debug, Default, Clone, Copy)]
pub struct PositionalPairing;

/// Detect the itinerary layout, or `None` when the page has no itinerary.
pub fn detect_variant(doc: &Html) -> Option<MarkupVariant> {
    if doc.select(&ACCORDION_HEADER).next().is_some() {
        Some(MarkupVariant::Accordion)
    } else if doc.select(&DAY_TITLE).next().is_some() {
        Some(MarkupVariant::Substage)
    } else {
        None
    }
}

/// Extract the itinerary with whichever strategy fits the page.
pub fn extract_itinerary(doc: &Html) -> Vec<DayEntry> {
    match detect_variant(doc) {
        Some(MarkupVariant::Accordion) => StructuralPairing.extract(doc),
        Some(MarkupVariant::Substage) => PositionalPairing.extract(doc),
        None => {
            debug!("No itinerary markup found");
            Vec::new()
        }
    }
}

impl ItineraryStrategy for StructuralPairing {
    fn extract(&self, doc: &Html) -> Vec<DayEntry> {
        doc.select(&ACCORDION_HEADER)
            .enumerate()
            .map(|(i, header)| {
                let label = header
                    .select(&SPAN)
                    .next()
                    .map(text_of)
                    .filter(|l| !l.is_empty());
                let title = find_next(doc, header, &H4, Some(&ACCORDION_HEADER))
                    .map(text_of)
                    .unwrap_or_default();

                let paragraphs = match day_body(header) {
                    Some(body) => body_paragraphs(body),
                    None => {
                        debug!(day = i + 1, "Day has no body container");
                        Vec::new()
                    }
                };

                DayEntry {
                    index: i + 1,
                    label,
                    title,
                    paragraphs,
                }
            })
            .collect()
    }
}

/// The first `div` sibling after the header's parent.
fn day_body(header: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let parent = header.parent()?;
    parent
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div")
}

fn body_paragraphs(body: ElementRef<'_>) -> Vec<String> {
    let mut paragraphs = Vec::new();

    if let Some(description) = body.select(&DESCRIPTION).next() {
        paragraphs.extend(
            description
                .select(&P)
                .map(text_of)
                .filter(|t| !t.is_empty())
                .map(|t| partial_escape(t.as_str()).into_owned()),
        );
    }

    if let Some(info) = body.select(&INFO).next() {
        paragraphs.extend(
            info.select(&P)
                .map(|p| p.inner_html().trim().to_string())
                .filter(|t| !t.is_empty()),
        );
    }

    paragraphs
}

impl ItineraryStrategy for PositionalPairing {
    fn extract(&self, doc: &Html) -> Vec<DayEntry> {
        let titles: Vec<String> = doc.select(&DAY_TITLE).map(text_of).collect();
        let mut descriptions: Vec<Vec<String>> = doc
            .select(&SUBSTAGE)
            .map(|block| {
                block
                    .select(&P)
                    .map(text_of)
                    .filter(|t| !t.is_empty())
                    .map(|t| partial_escape(t.as_str()).into_owned())
                    .collect()
            })
            .collect();

        if descriptions.len() > titles.len() {
            debug!(
                titles = titles.len(),
                blocks = descriptions.len(),
                "Dropping substage blocks without a day title"
            );
            descriptions.truncate(titles.len());
        }
        let mut descriptions = descriptions.into_iter();

        titles
            .into_iter()
            .enumerate()
            .map(|(i, title)| DayEntry {
                index: i + 1,
                label: None,
                title,
                paragraphs: descriptions.next().unwrap_or_default(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{body}</body></html>"))
    }

    fn accordion_day(label: &str, title: &str, body: Option<&str>) -> String {
        let body = body.map(|b| format!("<div>{b}</div>")).unwrap_or_default();
        format!(
            "<div class=\"day\"><div class=\"head\"><div data-name=\"accordion-header\"><span>{label}</span><h4>{title}</h4></div></div>{body}</div>"
        )
    }

    #[test]
    fn test_structural_pairing_keeps_gaps() {
        let html = doc(&format!(
            "{}{}{}",
            accordion_day(
                "1",
                "Tokyo",
                Some("<div class=\"description content\"><p>Arrivo</p><p> </p></div><div class=\"info\"><p>Pernotto in <b>hotel</b></p></div>")
            ),
            accordion_day("2", "Kyoto", None),
            accordion_day(
                "3",
                "Osaka",
                Some("<div class=\"description content\"><p>Street food &amp; castello</p></div>")
            ),
        ));

        assert_eq!(detect_variant(&html), Some(MarkupVariant::Accordion));
        let days = extract_itinerary(&html);
        assert_eq!(days.len(), 3);
        assert_eq!(days.iter().map(|d| d.index).collect::<Vec<_>>(), vec![1, 2, 3]);

        assert_eq!(days[0].label.as_deref(), Some("1"));
        assert_eq!(days[0].title, "Tokyo");
        assert_eq!(
            days[0].paragraphs,
            vec!["Arrivo".to_string(), "Pernotto in <b>hotel</b>".to_string()]
        );

        assert_eq!(days[1].title, "Kyoto");
        assert!(days[1].paragraphs.is_empty());

        assert_eq!(days[2].paragraphs, vec!["Street food &amp; castello".to_string()]);
    }

    #[test]
    fn test_structural_pairing_missing_title_does_not_steal_next() {
        let html = doc(&format!(
            "<div class=\"day\"><div><div data-name=\"accordion-header\"><span>1</span></div></div></div>{}",
            accordion_day("2", "Kyoto", None)
        ));
        let days = StructuralPairing.extract(&html);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].title, "");
        assert_eq!(days[1].title, "Kyoto");
    }

    #[test]
    fn test_positional_pairing_zips_and_pads() {
        let html = doc(
            "<h4 class=\"day-title\">Reykjavik</h4>\
             <h4 class=\"day-title\">Golden Circle</h4>\
             <h4 class=\"day-title\">Laguna Blu</h4>\
             <div class=\"substage\"><p>Arrivo</p></div>\
             <div class=\"substage\"><p>Geysir</p><p>Gullfoss</p></div>",
        );
        assert_eq!(detect_variant(&html), Some(MarkupVariant::Substage));
        let days = extract_itinerary(&html);
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].paragraphs, vec!["Arrivo".to_string()]);
        assert_eq!(days[1].paragraphs, vec!["Geysir".to_string(), "Gullfoss".to_string()]);
        assert_eq!(days[2].title, "Laguna Blu");
        assert!(days[2].paragraphs.is_empty());
    }

    #[test]
    fn test_positional_pairing_drops_extra_blocks() {
        let html = doc(
            "<div data-name=\"day-title\">Unico giorno</div>\
             <div class=\"substage\"><p>A</p></div>\
             <div class=\"substage\"><p>B</p></div>",
        );
        let days = PositionalPairing.extract(&html);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].paragraphs, vec!["A".to_string()]);
    }

    #[test]
    fn test_no_itinerary() {
        let html = doc("<p>nothing here</p>");
        assert_eq!(detect_variant(&html), None);
        assert!(extract_itinerary(&html).is_empty());
    }
}
