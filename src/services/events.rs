// src/services/events.rs

//! Event discovery on artist index pages.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Artist, EventDescriptor, WatchConfig};
use crate::render::{PageKind, PageRenderer};
use crate::utils::{first_line, resolve_url};

/// Finds the event pages linked from an artist's index.
pub struct ListingExtractor {
    base_url: Url,
    artist_ids: BTreeMap<String, u32>,
    link_sel: Selector,
}

impl ListingExtractor {
    pub fn new(config: &WatchConfig) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(&config.base_url)?,
            artist_ids: config.artist_ids.clone(),
            link_sel: super::parse_selector("a[href]")?,
        })
    }

    /// Resolve a display name to its site key.
    pub fn resolve(&self, name: &str) -> Option<Artist> {
        self.artist_ids
            .get(name)
            .map(|&site_id| Artist::new(name, site_id))
    }

    /// Absolute URL of the artist's event index.
    pub fn index_url(&self, artist: &Artist) -> String {
        resolve_url(&self.base_url, &artist.index_path())
    }

    /// Render the artist's index page and list its events.
    pub async fn fetch_events(
        &self,
        renderer: &dyn PageRenderer,
        artist: &Artist,
        debug: bool,
    ) -> Result<Vec<EventDescriptor>> {
        let url = self.index_url(artist);
        log::info!("  Event index: {url}");

        let html = renderer.render(&url, PageKind::Index).await?;

        if debug {
            let label = format!("events_{}", artist.site_id);
            if let Err(e) = renderer.capture_debug(&label, &html).await {
                log::warn!("Debug capture failed for {label}: {e}");
            }
        }

        let events = self.extract(artist, &html)?;
        for event in &events {
            log::info!("    Event: {}", event.name);
        }
        Ok(events)
    }

    /// Extract event descriptors from index HTML, in document order.
    ///
    /// Only hrefs starting with `/events/artist/{key}/{digits}` are kept; a
    /// repeated href yields a single descriptor.
    pub fn extract(&self, artist: &Artist, html: &str) -> Result<Vec<EventDescriptor>> {
        let pattern = format!(r"^{}/\d+", regex::escape(&artist.index_path()));
        let event_href =
            Regex::new(&pattern).map_err(|e| AppError::config(format!("{pattern}: {e}")))?;

        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut events = Vec::new();

        for link in document.select(&self.link_sel) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if !event_href.is_match(href) || !seen.insert(href.to_string()) {
                continue;
            }

            events.push(EventDescriptor {
                name: first_line(&link),
                url: resolve_url(&self.base_url, href),
                path: href.to_string(),
            });
        }

        Ok(events)
    }
}
