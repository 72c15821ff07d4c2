// src/models/listing.rs

//! Performances detected as purchasable and their dedup identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::EventDescriptor;

/// Placeholder for a date or venue the page did not expose.
pub const UNKNOWN: &str = "unknown";

/// Which heuristic produced a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionMethod {
    /// A ticket quantity control was present
    #[serde(rename = "select")]
    Select,
    /// The performance block was not marked inactive
    #[serde(rename = "active")]
    ActiveBlock,
    /// A purchase continuation button was present
    #[serde(rename = "button")]
    ButtonText,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::Select => "select",
            DetectionMethod::ActiveBlock => "active",
            DetectionMethod::ButtonText => "button",
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One performance of an event with resale tickets on offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceListing {
    pub date: String,
    pub venue: String,
    /// Selectable quantity labels; empty when the method cannot enumerate them
    pub ticket_labels: Vec<String>,
    pub detection_method: DetectionMethod,
}

impl PerformanceListing {
    pub fn new(
        date: impl Into<String>,
        venue: impl Into<String>,
        ticket_labels: Vec<String>,
        detection_method: DetectionMethod,
    ) -> Self {
        Self {
            date: date.into(),
            venue: venue.into(),
            ticket_labels,
            detection_method,
        }
    }

    /// A listing whose date and venue could not be read.
    pub fn unknown(detection_method: DetectionMethod) -> Self {
        Self::new(UNKNOWN, UNKNOWN, Vec::new(), detection_method)
    }

    /// Ticket labels as `"(a, b)"`, or empty when none were read.
    pub fn ticket_summary(&self) -> String {
        if self.ticket_labels.is_empty() {
            String::new()
        } else {
            format!("({})", self.ticket_labels.join(", "))
        }
    }
}

/// Identity of a performance's resale slot: `{path}|{date}|{venue}`.
///
/// Ticket labels and detection method are not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn new(event_path: &str, date: &str, venue: &str) -> Self {
        Self(format!("{event_path}|{date}|{venue}"))
    }

    pub fn for_listing(event: &EventDescriptor, listing: &PerformanceListing) -> Self {
        Self::new(&event.path, &listing.date, &listing.venue)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DedupKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> EventDescriptor {
        EventDescriptor {
            name: "Live Tour".to_string(),
            url: "https://relief-ticket.jp/events/artist/38/101".to_string(),
            path: "/events/artist/38/101".to_string(),
        }
    }

    #[test]
    fn test_key_format() {
        let listing = PerformanceListing::new("12/25", "Hall A", vec![], DetectionMethod::Select);
        let key = DedupKey::for_listing(&event(), &listing);
        assert_eq!(key.as_str(), "/events/artist/38/101|12/25|Hall A");
    }

    #[test]
    fn test_key_ignores_tickets_and_method() {
        let a = PerformanceListing::new(
            "12/25",
            "Hall A",
            vec!["1枚".into(), "2枚".into()],
            DetectionMethod::Select,
        );
        let b = PerformanceListing::new("12/25", "Hall A", vec![], DetectionMethod::ActiveBlock);
        assert_eq!(
            DedupKey::for_listing(&event(), &a),
            DedupKey::for_listing(&event(), &b)
        );
    }

    #[test]
    fn test_ticket_summary() {
        let mut listing = PerformanceListing::unknown(DetectionMethod::ButtonText);
        assert_eq!(listing.ticket_summary(), "");
        listing.ticket_labels = vec!["1枚".into(), "2枚".into()];
        assert_eq!(listing.ticket_summary(), "(1枚, 2枚)");
    }
}
