//! Page renderers: turn a trip location into rendered HTML.
//!
//! Rendering is the only suspending step of the pipeline. Everything after it
//! (extraction, assembly, index updates) is synchronous on the returned HTML.
//!
//! # Implementations
//!
//! | Renderer | Module | Source | Notes |
//! |----------|--------|--------|-------|
//! | [`HttpRenderer`] | [`http`] | Remote URL | Plain GET, no script execution |
//! | [`CommandRenderer`] | [`command`] | Remote URL | External headless browser program |
//! | [`LocalRenderer`] | [`local`] | File path | Pre-fetched documents |
//! | [`RetryRenderer`] | [`retry`] | Any | Exponential backoff around another renderer |
//!
//! Page interactions the site needs before its content is complete (dismissing
//! the cookie banner, expanding the itinerary accordions, opening the pricing
//! modal) belong to the external program driven by [`CommandRenderer`].

pub mod command;
pub mod http;
pub mod local;
pub mod retry;

use std::error::Error;
use std::fmt;

pub use command::CommandRenderer;
pub use http::HttpRenderer;
pub use local::LocalRenderer;
pub use retry::RetryRenderer;

/// The output of one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// The location that was rendered.
    pub location: String,
    /// The full document markup.
    pub html: String,
    /// Plain text of the pricing modal, when the renderer captured it.
    pub modal_text: Option<String>,
}

/// Why a page could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The fetch or the renderer program exceeded its time budget.
    Timeout,
    /// The server answered with a non-success status.
    Status(u16),
    /// Connection-level failure.
    Transport(String),
    /// Reading a local document failed.
    Io(String),
    /// The external renderer program failed.
    Command(String),
}

impl RenderError {
    /// Whether trying again could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            RenderError::Timeout | RenderError::Transport(_) | RenderError::Command(_) => true,
            RenderError::Status(code) => *code == 429 || *code >= 500,
            RenderError::Io(_) => false,
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Timeout => write!(f, "render timed out"),
            RenderError::Status(code) => write!(f, "server answered with HTTP {code}"),
            RenderError::Transport(e) => write!(f, "transport error: {e}"),
            RenderError::Io(e) => write!(f, "i/o error: {e}"),
            RenderError::Command(e) => write!(f, "renderer command failed: {e}"),
        }
    }
}

impl Error for RenderError {}

/// Trait for anything that can produce rendered HTML for a location.
pub trait PageRenderer {
    /// Render `location` (a URL or a file path, depending on the renderer).
    async fn render(&self, location: &str) -> Result<RenderedPage, RenderError>;
}

/// The renderer selected for a run.
#[derive(Debug)]
pub enum Renderer {
    Http(HttpRenderer),
    Command(CommandRenderer),
    Local(LocalRenderer),
}

impl PageRenderer for Renderer {
    async fn render(&self, location: &str) -> Result<RenderedPage, RenderError> {
        match self {
            Renderer::Http(r) => r.render(location).await,
            Renderer::Command(r) => r.render(location).await,
            Renderer::Local(r) => r.render(location).await,
        }
    }
}
