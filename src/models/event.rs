// src/models/event.rs

use serde::{Deserialize, Serialize};

/// A watched performer and its numeric key on the resale site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
    pub site_id: u32,
}

impl Artist {
    pub fn new(name: impl Into<String>, site_id: u32) -> Self {
        Self {
            name: name.into(),
            site_id,
        }
    }

    /// Site-relative path of the artist's event index.
    pub fn index_path(&self) -> String {
        format!("/events/artist/{}", self.site_id)
    }
}

/// An event linked from an artist's index page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescriptor {
    /// First line of the link's visible text
    pub name: String,

    /// Absolute URL of the event page
    pub url: String,

    /// Raw site-relative href; stable across hosts and polls
    pub path: String,
}
