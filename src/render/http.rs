//! HTTP-backed renderer.
//!
//! Fetches the server-rendered document with `reqwest`. Navigation is bounded
//! by the client timeout; each load is followed by the configured settle wait,
//! which also spaces out consecutive requests to the site.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::RendererConfig;
use crate::render::{PageKind, PageRenderer};
use crate::utils::http::create_page_client;

/// Renderer that performs one GET per page.
pub struct HttpRenderer {
    client: reqwest::Client,
    index_settle: Duration,
    event_settle: Duration,
    debug_dir: Option<PathBuf>,
}

impl HttpRenderer {
    pub fn new(config: &RendererConfig) -> Result<Self> {
        Ok(Self {
            client: create_page_client(config)?,
            index_settle: Duration::from_millis(config.index_settle_ms),
            event_settle: Duration::from_millis(config.event_settle_ms),
            debug_dir: None,
        })
    }

    /// Write debug captures under `dir`.
    pub fn with_debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }

    fn settle_for(&self, kind: PageKind) -> Duration {
        match kind {
            PageKind::Index => self.index_settle,
            PageKind::Event => self.event_settle,
        }
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, url: &str, kind: PageKind) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::render(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::render(url, format!("HTTP {status}")));
        }

        let html = response.text().await.map_err(|e| AppError::render(url, e))?;

        let settle = self.settle_for(kind);
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        Ok(html)
    }

    async fn capture_debug(&self, label: &str, html: &str) -> Result<()> {
        let Some(dir) = &self.debug_dir else {
            return Ok(());
        };

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{label}.html"));
        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(html.as_bytes()).await?;
        file.flush().await?;

        log::debug!("Saved debug capture to {}", path.display());
        Ok(())
    }
}
