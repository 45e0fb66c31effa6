//! Plain HTTP renderer.
//!
//! Fetches the page with a single GET. Nothing on the page is executed, so
//! content the site only injects after user interaction will be missing; the
//! extractors fall back for those fields.

use super::{PageRenderer, RenderError, RenderedPage};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    /// Build a renderer whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, RenderError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("trip_pages/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RenderError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

impl PageRenderer for HttpRenderer {
    #[instrument(level = "info", skip(self))]
    async fn render(&self, location: &str) -> Result<RenderedPage, RenderError> {
        let response = self.client.get(location).send().await.map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Status(status.as_u16()));
        }
        let html = response.text().await.map_err(classify)?;
        debug!(bytes = html.len(), "Fetched page");
        Ok(RenderedPage {
            location: location.to_string(),
            html,
            modal_text: None,
        })
    }
}

fn classify(e: reqwest::Error) -> RenderError {
    if e.is_timeout() {
        RenderError::Timeout
    } else {
        RenderError::Transport(e.to_string())
    }
}
