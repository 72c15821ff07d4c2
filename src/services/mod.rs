//! Service layer for the watcher.
//!
//! This module contains the page interpretation logic:
//! - Event discovery on artist index pages (`ListingExtractor`)
//! - Resale availability detection on event pages (`AvailabilityDetector`)

mod availability;
mod events;

pub use availability::{
    ActiveBlockStrategy, AvailabilityDetector, DetectionStrategy, PurchaseButtonStrategy,
    SelectControlStrategy,
};
pub use events::ListingExtractor;

use scraper::Selector;

use crate::error::{AppError, Result};

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
