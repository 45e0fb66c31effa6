//! Rendered-page snapshots.
//!
//! Every rendered URL is kept on disk as `<slug>.html` so a later run can
//! rebuild the site from local files (`--input-dir`) without fetching again.
//! Optionally a static copy `<slug>.static.html` is written with site chrome,
//! scripts and overlays stripped.

use crate::renderer::local::modal_sidecar;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

/// Elements that never belong in a static copy.
const CHROME: &[&str] = &[
    "header",
    "footer",
    "nav",
    "script",
    "style",
    "noscript",
    "svg",
    "head",
    "link[rel='stylesheet']",
    "#iubenda-cs-banner",
    "[data-testid='trustpilot-wrapper']",
    "[class*='Navbar']",
    "div[data-testid='floating-buttons']",
    "[role='alert']",
    "[role='banner']",
    "[role='alertdialog']",
    "[role='region'][aria-label*='skip' i]",
];

static CHROME_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    CHROME
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});
static DIALOG: Lazy<Selector> = Lazy::new(|| Selector::parse("div[role='dialog']").unwrap());

/// Strip chrome and non-modal dialogs from a rendered document.
///
/// Dialogs marked `aria-modal="true"` (the pricing modal) are kept.
pub fn clean_document(markup: &str) -> String {
    let mut doc = Html::parse_document(markup);

    let mut doomed: Vec<_> = CHROME_SELECTORS
        .iter()
        .flat_map(|sel| doc.select(sel).map(|el| el.id()).collect::<Vec<_>>())
        .collect();
    doomed.extend(
        doc.select(&DIALOG)
            .filter(|el| el.value().attr("aria-modal") != Some("true"))
            .map(|el| el.id()),
    );
    debug!(removed = doomed.len(), "Cleaning snapshot");

    for id in doomed {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
    doc.html()
}

/// Write the rendered page (and optionally its cleaned copy) for `slug`.
///
/// Captured modal text goes to the sidecar that [`LocalRenderer`] reads, so a
/// rebuild from the snapshot sees the same modal. Returns the path of the raw
/// snapshot.
///
/// [`LocalRenderer`]: crate::renderer::LocalRenderer
#[instrument(level = "info", skip(markup, modal_text), fields(dir = %dir.display()))]
pub async fn write_snapshot(
    dir: &Path,
    slug: &str,
    markup: &str,
    modal_text: Option<&str>,
    clean: bool,
) -> Result<PathBuf, Box<dyn Error>> {
    fs::create_dir_all(dir).await?;

    let raw_path = dir.join(format!("{slug}.html"));
    fs::write(&raw_path, markup).await?;
    info!(path = %raw_path.display(), "Saved page snapshot");

    if let Some(text) = modal_text {
        let sidecar = modal_sidecar(&raw_path);
        fs::write(&sidecar, text).await?;
        debug!(path = %sidecar.display(), "Saved modal text");
    }

    if clean {
        let static_path = dir.join(format!("{slug}.static.html"));
        fs::write(&static_path, clean_document(markup)).await?;
        info!(path = %static_path.display(), "Saved static snapshot");
    }
    Ok(raw_path)
}

/// Whether `path` is a cleaned copy rather than a source document.
pub fn is_static_copy(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".static.html"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>T</title><style>p{}</style></head><body>
<header>menu</header>
<div id="iubenda-cs-banner">cookie</div>
<div class="TopNavbar">nav</div>
<div role="dialog">popup</div>
<div role="dialog" aria-modal="true"><h2>Cosa è incluso</h2></div>
<main><h2>Mood di viaggio</h2><p>Relax</p><script>track()</script></main>
<div role="region" aria-label="Skip to content">skip</div>
<footer>bye</footer>
</body></html>"#;

    #[test]
    fn test_clean_document() {
        let cleaned = clean_document(PAGE);
        for gone in ["menu", "cookie", ">nav<", "popup", "track()", "skip", "bye", "<title>", "p{}"] {
            assert!(!cleaned.contains(gone), "{gone:?} survived: {cleaned}");
        }
        assert!(cleaned.contains("<h2>Mood di viaggio</h2><p>Relax</p>"));
        assert!(cleaned.contains("aria-modal=\"true\""));
    }

    #[tokio::test]
    async fn test_write_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let raw = write_snapshot(tmp.path(), "giappone-360", PAGE, Some("Cosa è incluso\nVolo"), true)
            .await
            .unwrap();
        assert_eq!(raw, tmp.path().join("giappone-360.html"));
        assert_eq!(std::fs::read_to_string(&raw).unwrap(), PAGE);

        let static_copy = tmp.path().join("giappone-360.static.html");
        assert!(static_copy.exists());
        assert!(is_static_copy(&static_copy));
        assert!(!is_static_copy(&raw));
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("giappone-360.modal.txt")).unwrap(),
            "Cosa è incluso\nVolo"
        );
    }
}
