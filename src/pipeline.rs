//! The per-country batch pipeline.
//!
//! For every trip source, in input order:
//!
//! 1. Render the page (up to `concurrency` renders in flight)
//! 2. Save a snapshot of the rendered document (URL sources only)
//! 3. Extract a [`TripRecord`]
//! 4. Assemble and write the trip page, plus the optional JSON record
//! 5. Link the page from the country index, and the country from the global index
//!
//! Renders may overlap, but steps 2-5 run in a single consumer loop, so index
//! read-modify-writes never race. A failure on one trip is logged and the
//! batch moves on.

use crate::config::{PipelineConfig, SourceSpec};
use crate::extract::{TripDocument, extract_record};
use crate::models::{DEFAULT_TITLE, TripRecord, TripSource};
use crate::outputs::indexes::{IndexTitle, LinkEntry, update_index_file};
use crate::outputs::json::write_record;
use crate::outputs::page::{Template, assemble, write_trip_page};
use crate::renderer::{PageRenderer, RenderedPage};
use crate::snapshot::{is_static_copy, write_snapshot};
use crate::utils::{parse_url_list, slug_from_url, slugify};
use futures::stream::{self, StreamExt};
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

/// How one trip ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripStatus {
    /// The page was written. Index failures are logged but do not change this.
    Written,
    RenderFailed(String),
    TemplateFailed(String),
    WriteFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripOutcome {
    pub source: TripSource,
    pub slug: Option<String>,
    pub status: TripStatus,
}

/// Per-run totals.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<TripOutcome>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn written(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == TripStatus::Written)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.written()
    }
}

/// List the trip sources of a run.
///
/// A URL file yields its de-duplicated URLs in file order. An input directory
/// yields its `.html` documents sorted by path, skipping cleaned static copies.
#[instrument(level = "info", skip_all)]
pub async fn collect_sources(spec: &SourceSpec) -> Result<Vec<TripSource>, Box<dyn Error>> {
    let sources: Vec<TripSource> = match spec {
        SourceSpec::Urls(path) => {
            let content = fs::read_to_string(path)
                .await
                .map_err(|e| format!("reading URL list {}: {e}", path.display()))?;
            parse_url_list(&content)
                .into_iter()
                .map(TripSource::Url)
                .collect()
        }
        SourceSpec::InputDir(dir) => {
            let mut entries = fs::read_dir(dir)
                .await
                .map_err(|e| format!("reading input dir {}: {e}", dir.display()))?;
            let mut paths = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if is_html(&path) && !is_static_copy(&path) {
                    paths.push(path);
                }
            }
            paths.sort();
            paths.into_iter().map(TripSource::File).collect()
        }
    };
    info!(count = sources.len(), "Collected trip sources");
    Ok(sources)
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html"))
}

/// The output slug of a trip: the URL's last segment for remote pages, the
/// file stem for local documents, else the page title.
///
/// A snapshot saved during a URL run is named after the URL slug, so
/// rebuilding from it lands on the same page.
pub fn trip_slug(source: &TripSource, title: &str) -> String {
    let from_source = match source {
        TripSource::Url(url) => slug_from_url(url),
        TripSource::File(path) => path
            .file_stem()
            .map(|stem| slugify(&stem.to_string_lossy()))
            .filter(|s| !s.is_empty()),
    };
    from_source
        .or_else(|| Some(slugify(title)).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

/// One country's batch run.
pub struct Pipeline<'a, R> {
    config: &'a PipelineConfig,
    template: &'a Template,
    renderer: &'a R,
}

impl<'a, R> Pipeline<'a, R>
where
    R: PageRenderer,
{
    pub fn new(config: &'a PipelineConfig, template: &'a Template, renderer: &'a R) -> Self {
        let unknown = template.unknown_placeholders();
        if !unknown.is_empty() {
            warn!(
                placeholders = ?unknown,
                "Template uses placeholders no trip provides; every page will fail to render"
            );
        }
        Self {
            config,
            template,
            renderer,
        }
    }

    #[instrument(level = "info", skip_all, fields(country = %self.config.country, sources = sources.len()))]
    pub async fn run(&self, sources: Vec<TripSource>) -> RunSummary {
        let renderer = self.renderer;
        let mut rendered = std::pin::pin!(
            stream::iter(sources)
                .map(move |source| async move {
                    let result = renderer.render(&source.location()).await;
                    (source, result)
                })
                .buffered(self.config.concurrency.max(1))
        );

        let mut summary = RunSummary::default();
        while let Some((source, result)) = rendered.next().await {
            let outcome = match result {
                Ok(page) => self.process(source, page).await,
                Err(e) => {
                    warn!(source = %source, error = %e, "Render failed; skipping trip");
                    TripOutcome {
                        source,
                        slug: None,
                        status: TripStatus::RenderFailed(e.to_string()),
                    }
                }
            };
            summary.outcomes.push(outcome);
        }

        info!(
            total = summary.total(),
            written = summary.written(),
            failed = summary.failed(),
            "Batch complete"
        );
        summary
    }

    #[instrument(level = "info", skip_all, fields(source = %source))]
    async fn process(&self, source: TripSource, page: RenderedPage) -> TripOutcome {
        let doc = TripDocument::parse(&page.html);
        let slug = trip_slug(&source, &doc.title);
        debug!(%slug, title = %doc.title, "Parsed page");

        if let TripSource::Url(url) = &source {
            if let Err(e) = write_snapshot(
                &self.config.snapshot_dir,
                &slug,
                &page.html,
                page.modal_text.as_deref(),
                self.config.clean_snapshots,
            )
            .await
            {
                warn!(%url, error = %e, "Failed to save snapshot");
            }
        }

        let record = extract_record(&doc, &slug, page.modal_text.as_deref(), &self.config.labels);
        drop(doc);

        let status = self.write_outputs(&source, &record).await;
        TripOutcome {
            source,
            slug: Some(slug),
            status,
        }
    }

    async fn write_outputs(&self, source: &TripSource, record: &TripRecord) -> TripStatus {
        let html = match assemble(self.template, record) {
            Ok(html) => html,
            Err(e) => {
                error!(slug = %record.slug, error = %e, "Template rendering failed");
                return TripStatus::TemplateFailed(e.to_string());
            }
        };

        let page_path = self.config.trip_page_path(&record.slug);
        if let Err(e) = write_trip_page(&page_path, &html).await {
            error!(path = %page_path.display(), error = %e, "Failed to write trip page");
            return TripStatus::WriteFailed(e.to_string());
        }

        if let Some(dir) = &self.config.json_output_dir {
            let location = source.location();
            if let Err(e) = write_record(record, &self.config.country, &location, dir).await {
                warn!(slug = %record.slug, error = %e, "Failed to write trip JSON");
            }
        }

        self.update_indexes(record).await;
        info!(slug = %record.slug, path = %page_path.display(), "Trip published");
        TripStatus::Written
    }

    async fn update_indexes(&self, record: &TripRecord) {
        let country = &self.config.country;

        let country_index = self.config.country_index_path();
        if let Err(e) = update_index_file(
            &country_index,
            &LinkEntry::for_trip(record),
            &IndexTitle::country(country),
        )
        .await
        {
            error!(path = %country_index.display(), error = %e, "Failed to update country index");
        }

        let global_index = self.config.global_index_path();
        if let Err(e) = update_index_file(
            &global_index,
            &LinkEntry::for_country(country),
            &self.config.global_index_title,
        )
        .await
        {
            error!(path = %global_index.display(), error = %e, "Failed to update global index");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceSpec;
    use crate::extract::section::SectionLabels;
    use crate::models::Country;
    use crate::renderer::{LocalRenderer, RenderError};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    const GIAPPONE: &str = r#"<html><head><title>Giappone 360</title></head><body>
<div class="long-description">Templi e neon</div>
<div><h2>Mood di viaggio</h2><p>Relax e cultura</p></div>
<div><h2>Ritrovo</h2><p>Tokyo</p></div>
</body></html>"#;

    const ISLANDA: &str = r#"<html><head><title>Islanda & aurore</title></head><body></body></html>"#;

    /// Serves canned pages; unknown locations fail with 404.
    struct FakeRenderer {
        pages: HashMap<String, String>,
    }

    impl PageRenderer for FakeRenderer {
        async fn render(&self, location: &str) -> Result<RenderedPage, RenderError> {
            let html = self.pages.get(location).ok_or(RenderError::Status(404))?;
            Ok(RenderedPage {
                location: location.to_string(),
                html: html.clone(),
                modal_text: Some("Cosa è incluso\nVolo A/R".to_string()),
            })
        }
    }

    fn config(root: &Path) -> PipelineConfig {
        PipelineConfig {
            country: Country::parse("jpn").unwrap(),
            source: SourceSpec::Urls(root.join("urls.txt")),
            template: root.join("template.html"),
            docs_dir: root.join("docs"),
            snapshot_dir: root.join("input"),
            json_output_dir: Some(root.join("json")),
            render_cmd: None,
            clean_snapshots: true,
            publish: false,
            concurrency: 2,
            retries: 0,
            timeout: Duration::from_secs(5),
            labels: SectionLabels::default(),
            global_index_title: IndexTitle::global(),
        }
    }

    fn renderer() -> FakeRenderer {
        FakeRenderer {
            pages: HashMap::from([
                (
                    "https://www.weroad.it/viaggi/giappone-360".to_string(),
                    GIAPPONE.to_string(),
                ),
                (
                    "https://www.weroad.it/viaggi/islanda-aurore/".to_string(),
                    ISLANDA.to_string(),
                ),
            ]),
        }
    }

    fn sources() -> Vec<TripSource> {
        [
            "https://www.weroad.it/viaggi/giappone-360",
            "https://www.weroad.it/viaggi/perduto",
            "https://www.weroad.it/viaggi/islanda-aurore/",
        ]
        .into_iter()
        .map(|u| TripSource::Url(u.to_string()))
        .collect()
    }

    fn read(path: PathBuf) -> String {
        std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
    }

    #[test]
    fn test_trip_slug() {
        let url = TripSource::Url("https://www.weroad.it/viaggi/giappone-360/".to_string());
        assert_eq!(trip_slug(&url, "Ignored"), "giappone-360");
        let file = TripSource::File(PathBuf::from("input/Tour Hokkaido.html"));
        assert_eq!(trip_slug(&file, "Ignored | WeRoad"), "tour-hokkaido");
        let unnamed = TripSource::File(PathBuf::from("input/!!!.html"));
        assert_eq!(trip_slug(&unnamed, "Giappone 360"), "giappone-360");
        assert_eq!(trip_slug(&unnamed, "!!!"), "viaggio");
    }

    #[tokio::test]
    async fn test_run_writes_pages_and_indexes() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let template = Template::parse(
            "<title>{{ title }}</title><p>{{ mood }}</p><p>{{ meeting_info }}</p><div>{{ included | safe }}</div>{{ day_by_day }}",
        );
        let renderer = renderer();
        let pipeline = Pipeline::new(&config, &template, &renderer);

        let summary = pipeline.run(sources()).await;
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.written(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(
            summary.outcomes[1].status,
            TripStatus::RenderFailed("server answered with HTTP 404".to_string())
        );

        let page = read(config.trip_page_path("giappone-360"));
        assert!(page.contains("<title>Giappone 360</title>"));
        assert!(page.contains("<p>Relax e cultura</p><p>Tokyo</p>"));
        assert!(page.contains("<p>Volo A/R</p>"));
        assert!(page.contains("<p>Contenuto non trovato</p>"));

        let country_index = read(config.country_index_path());
        assert!(country_index.contains("<title>Viaggi in JPN</title>"));
        assert!(country_index.contains("<li><a href=\"giappone-360.html\">Giappone 360</a></li>\n"));
        assert!(country_index.contains("<li><a href=\"islanda-aurore.html\">Islanda &amp; aurore</a></li>\n"));
        assert!(country_index.find("giappone-360").unwrap() < country_index.find("islanda-aurore").unwrap());

        let global_index = read(config.global_index_path());
        assert!(global_index.contains("<h1>Index globale - Viaggi per nazione</h1>"));
        assert_eq!(global_index.matches("jpn/index.html").count(), 1);

        assert!(tmp.path().join("input/giappone-360.html").exists());
        assert!(tmp.path().join("input/giappone-360.static.html").exists());
        assert!(tmp.path().join("json/jpn/giappone-360.json").exists());
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let template = Template::parse("<h1>{{ heading }}</h1>");
        let renderer = renderer();
        let pipeline = Pipeline::new(&config, &template, &renderer);

        pipeline.run(sources()).await;
        let first_country = read(config.country_index_path());
        let first_global = read(config.global_index_path());

        pipeline.run(sources()).await;
        assert_eq!(read(config.country_index_path()), first_country);
        assert_eq!(read(config.global_index_path()), first_global);
    }

    #[tokio::test]
    async fn test_rebuild_from_snapshots_matches_url_run() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let template = Template::parse("<h1>{{ title }}</h1>{{ included }}");
        let titled = FakeRenderer {
            pages: HashMap::from([(
                "https://www.weroad.it/viaggi/giappone-360".to_string(),
                GIAPPONE.replace("Giappone 360", "Giappone 360 | WeRoad"),
            )]),
        };
        let urls = vec![TripSource::Url(
            "https://www.weroad.it/viaggi/giappone-360".to_string(),
        )];

        Pipeline::new(&config, &template, &titled).run(urls).await;
        let page = read(config.trip_page_path("giappone-360"));
        let country_index = read(config.country_index_path());
        assert!(page.contains("<p>Volo A/R</p>"));

        let local = collect_sources(&SourceSpec::InputDir(config.snapshot_dir.clone()))
            .await
            .unwrap();
        assert_eq!(local.len(), 1);
        let summary = Pipeline::new(&config, &template, &LocalRenderer)
            .run(local)
            .await;
        assert_eq!(summary.written(), 1);

        let mut pages: Vec<String> = std::fs::read_dir(config.country_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        pages.sort();
        assert_eq!(pages, vec!["giappone-360.html", "index.html"]);
        assert_eq!(read(config.trip_page_path("giappone-360")), page);
        assert_eq!(read(config.country_index_path()), country_index);
    }

    #[tokio::test]
    async fn test_template_failure_skips_only_that_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let template = Template::parse("{{ title }} {{ price }}");
        let renderer = renderer();
        let pipeline = Pipeline::new(&config, &template, &renderer);

        let summary = pipeline.run(sources()).await;
        assert_eq!(summary.written(), 0);
        assert!(matches!(summary.outcomes[0].status, TripStatus::TemplateFailed(_)));
        assert!(!config.trip_page_path("giappone-360").exists());
        assert!(!config.country_index_path().exists());
    }

    #[tokio::test]
    async fn test_collect_sources() {
        let tmp = tempfile::tempdir().unwrap();
        let urls = tmp.path().join("urls.txt");
        std::fs::write(&urls, "https://a/x\n\n  https://a/y \nhttps://a/x\n").unwrap();
        let sources = collect_sources(&SourceSpec::Urls(urls)).await.unwrap();
        assert_eq!(
            sources,
            vec![
                TripSource::Url("https://a/x".to_string()),
                TripSource::Url("https://a/y".to_string()),
            ]
        );

        let dir = tmp.path().join("input");
        std::fs::create_dir(&dir).unwrap();
        for name in ["b.html", "a.html", "a.static.html", "a.modal.txt", "urls.txt"] {
            std::fs::write(dir.join(name), "").unwrap();
        }
        let sources = collect_sources(&SourceSpec::InputDir(dir.clone())).await.unwrap();
        assert_eq!(
            sources,
            vec![
                TripSource::File(dir.join("a.html")),
                TripSource::File(dir.join("b.html")),
            ]
        );

        assert!(collect_sources(&SourceSpec::Urls(tmp.path().join("none.txt"))).await.is_err());
    }
}
