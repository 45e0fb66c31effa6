//! JSON export of extracted trip records.
//!
//! Each processed trip can be written next to its HTML page as structured
//! data, for consumers that want the fields without scraping our own output.
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── jpn/
//!     ├── giappone-360.json
//!     └── tour-hokkaido.json
//! ```

use crate::models::{Country, TripRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// A [`TripRecord`] with provenance, as written to disk.
#[derive(Debug, Serialize)]
pub struct RecordExport<'a> {
    pub generated_at: DateTime<Utc>,
    pub country: &'a str,
    pub source: &'a str,
    #[serde(flatten)]
    pub record: &'a TripRecord,
}

/// Write `record` to `{json_output_dir}/{country}/{slug}.json`.
///
/// Returns the path written.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir.display(), slug = %record.slug))]
pub async fn write_record(
    record: &TripRecord,
    country: &Country,
    source: &str,
    json_output_dir: &Path,
) -> Result<PathBuf, Box<dyn Error>> {
    let export = RecordExport {
        generated_at: Utc::now(),
        country: country.code(),
        source,
        record,
    };
    let json = serde_json::to_string_pretty(&export)?;

    let dir = json_output_dir.join(country.code());
    if let Err(e) = fs::create_dir_all(&dir).await {
        error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = dir.join(format!("{}.json", record.slug));
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote trip JSON");
    Ok(path)
}
