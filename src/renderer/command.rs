//! External program renderer.
//!
//! Runs a headless-browser program once per URL, with the URL appended as the
//! last argument. The program prints the rendered document on stdout. If it
//! also captured the pricing modal's text, it prints [`MODAL_TEXT_MARKER`] on
//! its own line after the document, followed by that text.

use super::{PageRenderer, RenderError, RenderedPage};
use crate::utils::truncate_for_log;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument};

/// Separates the document from the modal text in the program's output.
pub const MODAL_TEXT_MARKER: &str = "<!--trip-pages:modal-text-->";

#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Build from a whitespace-separated command line such as `node render.js`.
    pub fn from_command_line(line: &str, timeout: Duration) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect(), timeout))
    }
}

impl PageRenderer for CommandRenderer {
    #[instrument(level = "info", skip(self), fields(program = %self.program))]
    async fn render(&self, location: &str) -> Result<RenderedPage, RenderError> {
        let run = Command::new(&self.program)
            .args(&self.args)
            .arg(location)
            .kill_on_drop(true)
            .output();

        let output = timeout(self.timeout, run)
            .await
            .map_err(|_| RenderError::Timeout)?
            .map_err(|e| RenderError::Command(format!("spawning {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderError::Command(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                truncate_for_log(stderr.trim(), 300)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (html, modal_text) = split_modal_text(&stdout);
        debug!(bytes = html.len(), has_modal = modal_text.is_some(), "Renderer program finished");
        Ok(RenderedPage {
            location: location.to_string(),
            html,
            modal_text,
        })
    }
}

fn split_modal_text(output: &str) -> (String, Option<String>) {
    let marker_line = output
        .match_indices(MODAL_TEXT_MARKER)
        .find(|(at, _)| *at == 0 || output[..*at].ends_with('\n'));

    match marker_line {
        Some((at, _)) => {
            let html = output[..at].trim_end().to_string();
            let text = output[at + MODAL_TEXT_MARKER.len()..].trim().to_string();
            (html, (!text.is_empty()).then_some(text))
        }
        None => (output.to_string(), None),
    }
}
