//! A newly seen listing, ready for delivery.

use serde::Serialize;

use crate::models::{Artist, DedupKey, EventDescriptor, PerformanceListing};

/// Join of artist, event and performance for a key not yet notified.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub artist: Artist,
    pub event: EventDescriptor,
    pub listing: PerformanceListing,
}

impl Finding {
    pub fn key(&self) -> DedupKey {
        DedupKey::for_listing(&self.event, &self.listing)
    }

    /// Format the finding for display using a template.
    ///
    /// Supported placeholders:
    /// - `{artist}`, `{event}`, `{url}`
    /// - `{date}`, `{venue}`, `{tickets}`, `{method}`
    ///
    /// Values are substituted in one pass, so placeholder text inside scraped
    /// values is left as is. Unknown placeholders are kept verbatim.
    pub fn format(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            let Some(close) = tail.find('}') else {
                rest = tail;
                break;
            };
            let name = &tail[1..close];
            match self.placeholder(name) {
                Some(value) => out.push_str(&value),
                None => out.push_str(&tail[..=close]),
            }
            rest = &tail[close + 1..];
        }
        out.push_str(rest);
        out
    }

    fn placeholder(&self, name: &str) -> Option<String> {
        let value = match name {
            "artist" => self.artist.name.clone(),
            "event" => self.event.name.clone(),
            "url" => self.event.url.clone(),
            "date" => self.listing.date.clone(),
            "venue" => self.listing.venue.clone(),
            "tickets" => self.listing.ticket_summary(),
            "method" => self.listing.detection_method.as_str().to_string(),
            _ => return None,
        };
        Some(value)
    }
}
