//! Run configuration.
//!
//! Settings come from three layers, highest priority first:
//!
//! 1. Command-line flags ([`Cli`])
//! 2. An optional YAML settings file (`--config`)
//! 3. Built-in defaults
//!
//! # Settings File
//!
//! ```yaml
//! docs_dir: site
//! template: templates/trip.html
//! concurrency: 3
//! labels:
//!   meeting_info: Punto di ritrovo
//! global_index_title:
//!   title: Tutti i viaggi
//!   heading: Viaggi per nazione
//! ```

use crate::cli::Cli;
use crate::extract::section::SectionLabels;
use crate::models::Country;
use crate::outputs::indexes::IndexTitle;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

const DEFAULT_DOCS_DIR: &str = "docs";
const DEFAULT_TEMPLATE: &str = "templates/template.html";
const DEFAULT_SNAPSHOT_DIR: &str = "input";
const DEFAULT_URLS: &str = "input/urls.txt";
const INDEX_FILE: &str = "index.html";
const DEFAULT_CONCURRENCY: usize = 1;
const DEFAULT_RETRIES: usize = 2;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Contents of the YAML settings file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub docs_dir: Option<PathBuf>,
    pub template: Option<PathBuf>,
    pub snapshot_dir: Option<PathBuf>,
    pub urls: Option<PathBuf>,
    pub json_output_dir: Option<PathBuf>,
    pub render_cmd: Option<String>,
    pub concurrency: Option<usize>,
    pub retries: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub labels: SectionLabels,
    pub global_index_title: Option<IndexTitle>,
}

/// Load the settings file, or defaults when no path is given.
#[instrument(level = "info", skip_all)]
pub async fn load_settings(path: Option<&Path>) -> Result<Settings, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let yaml = fs::read_to_string(path)
        .await
        .map_err(|e| format!("reading settings {}: {e}", path.display()))?;
    let settings: Settings = serde_yaml::from_str(&yaml)
        .map_err(|e| format!("parsing settings {}: {e}", path.display()))?;
    info!(path = %path.display(), "Loaded settings file");
    Ok(settings)
}

/// Where the trip documents of a run come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// A file listing one URL per line.
    Urls(PathBuf),
    /// A directory of pre-fetched `.html` documents.
    InputDir(PathBuf),
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub country: Country,
    pub source: SourceSpec,
    pub template: PathBuf,
    pub docs_dir: PathBuf,
    pub snapshot_dir: PathBuf,
    pub json_output_dir: Option<PathBuf>,
    pub render_cmd: Option<String>,
    pub clean_snapshots: bool,
    pub publish: bool,
    pub concurrency: usize,
    pub retries: usize,
    pub timeout: Duration,
    pub labels: SectionLabels,
    pub global_index_title: IndexTitle,
}

impl PipelineConfig {
    /// Merge CLI flags over `settings` over the built-in defaults.
    pub fn resolve(cli: &Cli, settings: Settings) -> Self {
        let source = match (&cli.input_dir, &cli.urls) {
            (Some(dir), _) => SourceSpec::InputDir(dir.clone()),
            (None, Some(urls)) => SourceSpec::Urls(urls.clone()),
            (None, None) => SourceSpec::Urls(
                settings
                    .urls
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_URLS)),
            ),
        };

        Self {
            country: cli.country.clone(),
            source,
            template: pick(&cli.template, settings.template, DEFAULT_TEMPLATE),
            docs_dir: pick(&cli.docs_dir, settings.docs_dir, DEFAULT_DOCS_DIR),
            snapshot_dir: pick(&cli.snapshot_dir, settings.snapshot_dir, DEFAULT_SNAPSHOT_DIR),
            json_output_dir: cli.json_output_dir.clone().or(settings.json_output_dir),
            render_cmd: cli.render_cmd.clone().or(settings.render_cmd),
            clean_snapshots: cli.clean_snapshots,
            publish: cli.publish,
            concurrency: cli
                .concurrency
                .or(settings.concurrency)
                .unwrap_or(DEFAULT_CONCURRENCY)
                .max(1),
            retries: cli.retries.or(settings.retries).unwrap_or(DEFAULT_RETRIES),
            timeout: Duration::from_secs(
                cli.timeout_secs
                    .or(settings.timeout_secs)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            labels: settings.labels,
            global_index_title: settings.global_index_title.unwrap_or_else(IndexTitle::global),
        }
    }

    /// `<docs>/<country>`
    pub fn country_dir(&self) -> PathBuf {
        self.docs_dir.join(self.country.code())
    }

    pub fn trip_page_path(&self, slug: &str) -> PathBuf {
        self.country_dir().join(format!("{slug}.html"))
    }

    pub fn country_index_path(&self) -> PathBuf {
        self.country_dir().join(INDEX_FILE)
    }

    pub fn global_index_path(&self) -> PathBuf {
        self.docs_dir.join(INDEX_FILE)
    }
}

fn pick(flag: &Option<PathBuf>, file: Option<PathBuf>, default: &str) -> PathBuf {
    flag.clone()
        .or(file)
        .unwrap_or_else(|| PathBuf::from(default))
}
