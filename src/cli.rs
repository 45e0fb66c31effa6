//! Command-line interface definitions for trip_pages.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Path and tuning options are optional here so that a settings file can fill
//! them in; see [`crate::config`] for how the two are merged.

use crate::models::Country;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the trip_pages application.
///
/// # Examples
///
/// ```sh
/// # Fetch every URL in input/urls.txt for Japan
/// trip_pages --country jpn
///
/// # Rebuild pages from previously saved snapshots
/// trip_pages -c jpn --input-dir input
///
/// # Render through a headless browser program, then push the result
/// trip_pages -c jpn --render-cmd "node render.js" --publish
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Country code the trips belong to (e.g. jpn, isl)
    #[arg(short, long, env = "TRIP_COUNTRY", value_parser = Country::parse)]
    pub country: Country,

    /// File with one trip URL per line [default: input/urls.txt]
    #[arg(short, long, conflicts_with = "input_dir")]
    pub urls: Option<PathBuf>,

    /// Directory of pre-fetched trip documents to use instead of URLs
    #[arg(short, long)]
    pub input_dir: Option<PathBuf>,

    /// Page template [default: templates/template.html]
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Root of the generated site [default: docs]
    #[arg(short, long)]
    pub docs_dir: Option<PathBuf>,

    /// Where rendered pages are saved before extraction [default: input]
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Also write each extracted trip as JSON under this directory
    #[arg(short, long)]
    pub json_output_dir: Option<PathBuf>,

    /// Optional path to a YAML settings file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of pages rendered at the same time [default: 1]
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Retries per page after a transient render failure [default: 2]
    #[arg(long)]
    pub retries: Option<usize>,

    /// Per-page render timeout in seconds [default: 60]
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// External program that renders a URL and prints the resulting HTML
    #[arg(long, env = "TRIP_RENDER_CMD")]
    pub render_cmd: Option<String>,

    /// Also save a static copy of each snapshot with site chrome removed
    #[arg(long)]
    pub clean_snapshots: bool,

    /// Commit and push the docs directory after the run
    #[arg(long)]
    pub publish: bool,
}
