//! Pricing modal extraction.
//!
//! The modal lists four fixed sections, each introduced by a heading with an
//! exact label. Content can come from the modal container in the DOM, or from
//! the modal's plain text as captured by a browser renderer.
//!
//! In DOM mode each bucket starts with its own `<h2>` heading, so a template
//! can splice a bucket in without printing the label itself. Text mode has no
//! markup to keep and emits paragraphs only.

use super::text_of;
use crate::models::ModalSections;
use once_cell::sync::Lazy;
use quick_xml::escape::partial_escape;
use scraper::{ElementRef, Html, Selector};

static MODAL_CONTAINER: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.wr-modal-external-container").unwrap());

/// The four modal sections, keyed by their heading label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalBucket {
    Included,
    NotIncluded,
    CassaComune,
    Extras,
}

impl ModalBucket {
    pub const ALL: [ModalBucket; 4] = [
        ModalBucket::Included,
        ModalBucket::NotIncluded,
        ModalBucket::CassaComune,
        ModalBucket::Extras,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ModalBucket::Included => "Cosa è incluso",
            ModalBucket::NotIncluded => "La quota viaggio non comprende",
            ModalBucket::CassaComune => "La quota della cassa comune comprende",
            ModalBucket::Extras => "Info aggiuntive",
        }
    }

    /// Exact label match.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.label() == label)
    }
}

/// Where modal content is read from.
#[derive(Clone, Copy)]
pub enum ModalSource<'a> {
    /// The rendered page; the modal container's direct children are walked.
    Document(&'a Html),
    /// The modal's plain text, one block per line.
    Text(&'a str),
}

/// Split the modal into its four sections.
///
/// Returns `None` when the document has no modal container or the text is
/// blank. Content before the first recognised heading is dropped.
pub fn find_modal_sections(source: ModalSource<'_>) -> Option<ModalSections> {
    match source {
        ModalSource::Document(doc) => doc.select(&MODAL_CONTAINER).next().map(from_container),
        ModalSource::Text(text) if text.trim().is_empty() => None,
        ModalSource::Text(text) => Some(from_text(text)),
    }
}

/// Split the modal into its four sections; all empty when there is no modal.
pub fn extract_modal_sections(source: ModalSource<'_>) -> ModalSections {
    find_modal_sections(source).unwrap_or_default()
}

fn from_container(container: ElementRef<'_>) -> ModalSections {
    let mut sections = ModalSections::default();
    let mut current = None;

    for child in container.children().filter_map(ElementRef::wrap) {
        if child.value().name() == "h2" {
            if let Some(bucket) = ModalBucket::from_label(&text_of(child)) {
                current = Some(bucket);
            }
        }
        if let Some(bucket) = current {
            sections.bucket_mut(bucket).push_str(&child.html());
        }
    }
    sections
}

fn from_text(text: &str) -> ModalSections {
    let mut sections = ModalSections::default();
    let mut current = None;

    for line in text.lines().map(str::trim) {
        if let Some(bucket) = ModalBucket::from_label(line) {
            current = Some(bucket);
        } else if let (Some(bucket), false) = (current, line.is_empty()) {
            let out = sections.bucket_mut(bucket);
            out.push_str("<p>");
            out.push_str(&partial_escape(line));
            out.push_str("</p>\n");
        }
    }
    sections
}

/// Prefix every non-empty bucket with its `<h2>` label, matching DOM mode.
pub fn with_headings(mut sections: ModalSections) -> ModalSections {
    for bucket in ModalBucket::ALL {
        let body = sections.bucket_mut(bucket);
        if !body.is_empty() {
            body.insert_str(0, &format!("<h2>{}</h2>\n", bucket.label()));
        }
    }
    sections
}

impl ModalSections {
    fn bucket_mut(&mut self, bucket: ModalBucket) -> &mut String {
        match bucket {
            ModalBucket::Included => &mut self.included,
            ModalBucket::NotIncluded => &mut self.not_included,
            ModalBucket::CassaComune => &mut self.cassa_comune,
            ModalBucket::Extras => &mut self.extras,
        }
    }
}
