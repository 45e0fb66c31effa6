//! # trip_pages
//!
//! Turns travel itinerary pages into a small static site: one HTML page per
//! trip, an index per country, and a global index linking the countries.
//!
//! ## Features
//!
//! - Renders trip pages over plain HTTP, through an external headless-browser
//!   program, or from previously saved documents
//! - Extracts the descriptive sections, the day-by-day itinerary (both markup
//!   variants the site uses) and the pricing modal
//! - Fills a user-supplied HTML template for every trip
//! - Keeps country and global indexes up to date without duplicating entries
//! - Optionally exports every trip as JSON and pushes the result with git
//!
//! ## Usage
//!
//! ```sh
//! trip_pages --country jpn --urls input/urls.txt
//! ```
//!
//! ## Architecture
//!
//! 1. **Sources**: read the URL list (or scan the input directory)
//! 2. **Rendering**: fetch pages, with retry and bounded concurrency
//! 3. **Extraction**: turn each document into a `TripRecord`
//! 4. **Output**: write the trip page, update the indexes, export JSON
//! 5. **Publishing**: optionally commit and push the docs directory

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod extract;
mod models;
mod outputs;
mod pipeline;
mod publish;
mod renderer;
mod snapshot;
mod utils;

use cli::Cli;
use config::{PipelineConfig, SourceSpec, load_settings};
use outputs::page::Template;
use pipeline::{Pipeline, collect_sources};
use publish::{GitPublisher, commit_message};
use renderer::{CommandRenderer, HttpRenderer, LocalRenderer, Renderer, RetryRenderer};
use utils::ensure_writable_dir;

/// First backoff delay between render attempts.
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("trip_pages starting up");

    // Parse CLI and settings
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");
    let settings = load_settings(args.config.as_deref()).await?;
    let config = PipelineConfig::resolve(&args, settings);
    info!(
        country = %config.country,
        docs_dir = %config.docs_dir.display(),
        concurrency = config.concurrency,
        "Resolved configuration"
    );

    // Early check: ensure the output dir is writable
    if let Err(e) = ensure_writable_dir(&config.docs_dir).await {
        error!(
            path = %config.docs_dir.display(),
            error = %e,
            "Docs directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let template = Template::load(&config.template).await?;
    let sources = collect_sources(&config.source).await?;
    if sources.is_empty() {
        warn!("No trip sources found; nothing to do");
    }

    // ---- Render and write ----
    let renderer = RetryRenderer::new(build_renderer(&config)?, config.retries, RETRY_BASE_DELAY);
    let summary = Pipeline::new(&config, &template, &renderer)
        .run(sources)
        .await;

    // ---- Publish ----
    if config.publish && summary.written() > 0 {
        let publisher = GitPublisher::new(".", vec![config.docs_dir.clone()]);
        if let Err(e) = publisher.publish(&commit_message(&config.country)).await {
            warn!(error = %e, "Publishing failed; generated files are left in place");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        written = summary.written(),
        failed = summary.failed(),
        "Execution complete"
    );

    Ok(())
}

/// Pick the renderer for this run's sources.
fn build_renderer(config: &PipelineConfig) -> Result<Renderer, Box<dyn Error>> {
    if let SourceSpec::InputDir(_) = config.source {
        info!("Reading pre-fetched documents");
        return Ok(Renderer::Local(LocalRenderer));
    }
    if let Some(line) = &config.render_cmd {
        let command = CommandRenderer::from_command_line(line, config.timeout)
            .ok_or("--render-cmd is empty")?;
        info!(command = %line, "Rendering through external program");
        return Ok(Renderer::Command(command));
    }
    info!("Rendering over plain HTTP");
    Ok(Renderer::Http(HttpRenderer::new(config.timeout)?))
}
