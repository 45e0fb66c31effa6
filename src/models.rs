//! Data models for trip pages and their extracted representations.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`TripSource`]: Where a trip page comes from (remote URL or local file)
//! - [`TripRecord`]: The structured fields extracted from one trip page
//! - [`DayEntry`]: One day of the day-by-day itinerary
//! - [`ModalSections`]: The four fixed sections of the pricing modal
//! - [`Country`]: The validated country code a run is scoped to

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Fallback text for any field whose section could not be located.
pub const NOT_FOUND: &str = "Contenuto non trovato";

/// Fallback page title when the document has no `<title>`.
pub const DEFAULT_TITLE: &str = "viaggio";

/// The origin of a single trip page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripSource {
    /// A remote page fetched through a page renderer.
    Url(String),
    /// A pre-fetched document on disk.
    File(PathBuf),
}

impl TripSource {
    /// The string handed to a renderer for this source.
    pub fn location(&self) -> String {
        match self {
            TripSource::Url(url) => url.clone(),
            TripSource::File(path) => path.display().to_string(),
        }
    }
}

impl fmt::Display for TripSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location())
    }
}

/// The structured result of one pipeline pass over one trip page.
///
/// Every text field carries a deterministic value: sections that could not be
/// located hold [`NOT_FOUND`], modal sections that were absent hold an empty
/// string. No field is ever missing from the rendered context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub mood: String,
    pub physical_effort: String,
    pub travel_requirements: String,
    pub meeting_info: String,
    pub day_by_day: Vec<DayEntry>,
    /// Raw markup of the itinerary section when no day blocks could be parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itinerary_fallback: Option<String>,
    pub included: String,
    pub not_included: String,
    pub cassa_comune: String,
    pub extras: String,
}

/// One day of a trip itinerary.
///
/// `index` is 1-based and contiguous in document order. A day whose markup
/// was incomplete still gets its slot, with an empty `paragraphs` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayEntry {
    pub index: usize,
    /// Day label as printed by the site (e.g. "1" or "Giorno 1"), if any.
    pub label: Option<String>,
    pub title: String,
    /// Paragraph bodies as markup fragments, without the wrapping `<p>`.
    pub paragraphs: Vec<String>,
}

/// The four fixed sections of the pricing modal, as markup fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalSections {
    pub included: String,
    pub not_included: String,
    pub cassa_comune: String,
    pub extras: String,
}

/// A lower-cased country code (ISO-3-like) scoping one run.
///
/// Used as the output subdirectory name and, upper-cased, as display text in
/// synthesized index titles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Country(String);

impl Country {
    /// Validate and normalize a user-supplied country code.
    ///
    /// The code is trimmed and lower-cased; it must be 2 to 8 ASCII
    /// alphanumeric characters so it is safe as a directory name.
    pub fn parse(raw: &str) -> Result<Self, CountryError> {
        let code = raw.trim().to_lowercase();
        if code.is_empty() {
            return Err(CountryError::Empty);
        }
        if code.len() < 2 || code.len() > 8 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CountryError::Invalid(raw.to_string()));
        }
        Ok(Self(code))
    }

    /// The lower-cased code, used for paths.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// The upper-cased code, used for display.
    pub fn display_code(&self) -> String {
        self.0.to_uppercase()
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rejected country code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountryError {
    Empty,
    Invalid(String),
}

impl fmt::Display for CountryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountryError::Empty => write!(f, "country code is empty"),
            CountryError::Invalid(raw) => write!(
                f,
                "invalid country code {raw:?} (expected 2-8 ASCII letters or digits, e.g. 'jpn')"
            ),
        }
    }
}

impl Error for CountryError {}
