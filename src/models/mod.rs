// src/models/mod.rs

//! Domain models for the watcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod event;
mod finding;
mod listing;
mod selectors;

// Re-export all public types
pub use config::{Config, NotifierConfig, RendererConfig, WatchConfig};
pub use event::{Artist, EventDescriptor};
pub use finding::Finding;
pub use listing::{DedupKey, DetectionMethod, PerformanceListing, UNKNOWN};
pub use selectors::DetectorSelectors;
