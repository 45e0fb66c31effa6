//! Heading-labelled section lookup.
//!
//! A section is the structural parent of the first heading whose text
//! contains a label (case-insensitive). What gets collected from that parent
//! is chosen by [`Collect`].

use super::{H2, P, text_of};
use crate::models::NOT_FOUND;
use crate::utils::normalize_ws;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

/// What to take from a matched section container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collect {
    /// Text of every `<p>` descendant, newline-joined, in document order.
    ParagraphText,
    /// The container's outer HTML.
    Markup,
}

/// A labelled-section lookup.
#[derive(Debug, Clone, Copy)]
pub struct SectionQuery<'a> {
    /// Substring searched for in heading text, case-insensitively.
    pub label: &'a str,
    /// Which elements count as headings.
    pub heading: &'a Selector,
    pub collect: Collect,
}

/// Heading labels of the text sections on a trip page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionLabels {
    pub mood: String,
    pub physical_effort: String,
    pub travel_requirements: String,
    pub meeting_info: String,
}

impl Default for SectionLabels {
    fn default() -> Self {
        Self {
            mood: "Mood di viaggio".to_string(),
            physical_effort: "Impegno fisico".to_string(),
            travel_requirements: "Cosa serve".to_string(),
            meeting_info: "Ritrovo".to_string(),
        }
    }
}

/// Run a section query. The first matching heading wins.
///
/// Returns `None` when no heading matches. A matching heading whose container
/// holds no paragraphs yields `Some("")`, not `None`.
pub fn find_section(doc: &Html, query: &SectionQuery<'_>) -> Option<String> {
    let needle = query.label.to_lowercase();

    doc.select(query.heading)
        .filter(|h| normalize_ws(&h.text().collect::<String>()).to_lowercase().contains(&needle))
        .find_map(|h| h.parent().and_then(ElementRef::wrap))
        .map(|container| match query.collect {
            Collect::ParagraphText => container
                .select(&P)
                .map(text_of)
                .collect::<Vec<_>>()
                .join("\n"),
            Collect::Markup => container.html(),
        })
}

/// Paragraph text under the first `<h2>` containing `label`, or [`NOT_FOUND`].
pub fn extract_section(doc: &Html, label: &str) -> String {
    find_section(
        doc,
        &SectionQuery {
            label,
            heading: &H2,
            collect: Collect::ParagraphText,
        },
    )
    .unwrap_or_else(|| NOT_FOUND.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{body}</body></html>"))
    }

    #[test]
    fn test_extract_section_joins_paragraphs() {
        let d = doc("<div><h2>Mood di viaggio</h2><p>A</p><p>B</p></div>");
        assert_eq!(extract_section(&d, "Mood di viaggio"), "A\nB");
    }

    #[test]
    fn test_extract_section_missing_heading_is_sentinel() {
        let d = doc("<div><h2>Altro</h2><p>A</p></div>");
        assert_eq!(extract_section(&d, "Mood di viaggio"), NOT_FOUND);
    }

    #[test]
    fn test_extract_section_is_case_insensitive_substring() {
        let d = doc("<div><h2>  IL   RITROVO del gruppo </h2><div><p> Piazza\n Duomo </p></div></div>");
        assert_eq!(extract_section(&d, "ritrovo"), "Piazza Duomo");
    }

    #[test]
    fn test_extract_section_first_heading_wins() {
        let d = doc(
            "<div><h2>Cosa serve</h2><p>Passaporto</p></div>\
             <div><h2>Cosa serve davvero</h2><p>Zaino</p></div>",
        );
        assert_eq!(extract_section(&d, "cosa serve"), "Passaporto");
    }

    #[test]
    fn test_extract_section_present_but_empty_is_empty_string() {
        let d = doc("<div><h2>Impegno fisico</h2><span>3/5</span></div>");
        assert_eq!(extract_section(&d, "Impegno fisico"), "");
    }

    #[test]
    fn test_find_section_markup() {
        let d = doc("<section id=\"x\"><h2>Info</h2><p>ok</p></section>");
        let markup = find_section(
            &d,
            &SectionQuery {
                label: "info",
                heading: &H2,
                collect: Collect::Markup,
            },
        )
        .unwrap();
        assert_eq!(markup, "<section id=\"x\"><h2>Info</h2><p>ok</p></section>");
    }

    #[test]
    fn test_find_section_custom_heading_selector() {
        let h3 = Selector::parse("h3").unwrap();
        let d = doc("<div><h2>Ritrovo</h2><p>no</p></div><div><h3>Ritrovo</h3><p>yes</p></div>");
        let found = find_section(
            &d,
            &SectionQuery {
                label: "Ritrovo",
                heading: &h3,
                collect: Collect::ParagraphText,
            },
        );
        assert_eq!(found.as_deref(), Some("yes"));
    }

    #[test]
    fn test_section_labels_partial_yaml_keeps_defaults() {
        let labels: SectionLabels = serde_yaml::from_str("mood: Atmosfera\n").unwrap();
        assert_eq!(labels.mood, "Atmosfera");
        assert_eq!(labels.meeting_info, "Ritrovo");
    }
}
