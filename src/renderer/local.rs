//! Renderer for pre-fetched documents on disk.
//!
//! A sidecar file `<stem>.modal.txt` next to the document, if present,
//! supplies the pricing modal's plain text.

use super::{PageRenderer, RenderError, RenderedPage};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalRenderer;

/// Path of the modal text sidecar for `document`.
pub fn modal_sidecar(document: &Path) -> PathBuf {
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    document.with_file_name(format!("{stem}.modal.txt"))
}

impl PageRenderer for LocalRenderer {
    #[instrument(level = "info", skip(self))]
    async fn render(&self, location: &str) -> Result<RenderedPage, RenderError> {
        let path = Path::new(location);
        let html = fs::read_to_string(path)
            .await
            .map_err(|e| RenderError::Io(format!("{location}: {e}")))?;

        let sidecar = modal_sidecar(path);
        let modal_text = fs::read_to_string(&sidecar).await.ok();
        if modal_text.is_some() {
            debug!(sidecar = %sidecar.display(), "Loaded modal text sidecar");
        }

        Ok(RenderedPage {
            location: location.to_string(),
            html,
            modal_text,
        })
    }
}
