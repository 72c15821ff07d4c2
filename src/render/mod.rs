//! Page rendering abstraction.
//!
//! The watcher only needs "give me the HTML behind this URL". Anything able to
//! do that, from a plain HTTP fetch to a headless browser session, plugs in
//! through [`PageRenderer`].

pub mod http;

use async_trait::async_trait;

use crate::error::Result;

pub use http::HttpRenderer;

/// How long to let a page settle after navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// An artist's event index
    Index,
    /// A single event page
    Event,
}

/// Capability that turns a URL into rendered HTML.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Navigate to `url` and return the rendered document.
    async fn render(&self, url: &str, kind: PageKind) -> Result<String>;

    /// Keep a copy of a rendered page for inspection.
    ///
    /// Called only when debug capture is enabled. The default does nothing.
    async fn capture_debug(&self, _label: &str, _html: &str) -> Result<()> {
        Ok(())
    }
}
