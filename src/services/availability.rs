// src/services/availability.rs

//! Resale availability detection for a single event page.
//!
//! The site signals "sold out" vs "on sale" through small markup differences
//! that have shifted over time. Detection therefore runs an ordered list of
//! strategies, from most to least structured, and stops at the first one that
//! reports anything:
//!
//! 1. [`SelectControlStrategy`]: a ticket quantity control inside a performance block
//! 2. [`ActiveBlockStrategy`]: a performance block without the inactive marker class
//! 3. [`PurchaseButtonStrategy`]: a purchase continuation button anywhere on the page

use scraper::{ElementRef, Html, Selector};

use crate::error::Result;
use crate::models::{
    DetectionMethod, DetectorSelectors, EventDescriptor, PerformanceListing, UNKNOWN,
};
use crate::render::{PageKind, PageRenderer};
use crate::utils::{element_text, safe_file_stem};

use super::parse_selector;

/// One heuristic for finding purchasable performances in a document.
pub trait DetectionStrategy: Send + Sync {
    fn method(&self) -> DetectionMethod;

    /// Listings in document order; empty when the heuristic finds nothing.
    fn detect(&self, document: &Html) -> Vec<PerformanceListing>;
}

/// Reads the date and venue lines of a performance block.
#[derive(Debug, Clone)]
struct BlockReader {
    date_sel: Selector,
    venue_sel: Selector,
}

impl BlockReader {
    fn new(selectors: &DetectorSelectors) -> Result<Self> {
        Ok(Self {
            date_sel: parse_selector(&selectors.date)?,
            venue_sel: parse_selector(&selectors.venue)?,
        })
    }

    fn read(&self, block: &ElementRef) -> (String, String) {
        (
            Self::first_text(block, &self.date_sel),
            Self::first_text(block, &self.venue_sel),
        )
    }

    fn first_text(block: &ElementRef, sel: &Selector) -> String {
        block
            .select(sel)
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_else(|| UNKNOWN.to_string())
    }
}

/// Performances that expose a ticket quantity control.
///
/// Sold-out blocks never carry the control, so this strategy cannot fire on
/// them whatever their classes say.
pub struct SelectControlStrategy {
    control_sel: Selector,
    option_sel: Selector,
    block_sel: Selector,
    reader: BlockReader,
}

impl SelectControlStrategy {
    pub fn new(selectors: &DetectorSelectors) -> Result<Self> {
        Ok(Self {
            control_sel: parse_selector(&selectors.quantity_select)?,
            option_sel: parse_selector(&selectors.quantity_option)?,
            block_sel: parse_selector(&selectors.performance_block)?,
            reader: BlockReader::new(selectors)?,
        })
    }

    fn enclosing_block<'a>(&self, control: &ElementRef<'a>) -> Option<ElementRef<'a>> {
        control
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| self.block_sel.matches(el))
    }
}

impl DetectionStrategy for SelectControlStrategy {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::Select
    }

    fn detect(&self, document: &Html) -> Vec<PerformanceListing> {
        document
            .select(&self.control_sel)
            .filter_map(|control| {
                let block = self.enclosing_block(&control)?;
                let (date, venue) = self.reader.read(&block);
                let labels = control
                    .select(&self.option_sel)
                    .map(|opt| element_text(&opt))
                    .collect();
                Some(PerformanceListing::new(date, venue, labels, self.method()))
            })
            .collect()
    }
}

/// Performance blocks not marked inactive.
///
/// Presence only; quantities are not enumerated.
pub struct ActiveBlockStrategy {
    block_sel: Selector,
    inactive_class: String,
    reader: BlockReader,
}

impl ActiveBlockStrategy {
    pub fn new(selectors: &DetectorSelectors) -> Result<Self> {
        Ok(Self {
            block_sel: parse_selector(&selectors.active_block)?,
            inactive_class: selectors.inactive_class.clone(),
            reader: BlockReader::new(selectors)?,
        })
    }
}

impl DetectionStrategy for ActiveBlockStrategy {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::ActiveBlock
    }

    fn detect(&self, document: &Html) -> Vec<PerformanceListing> {
        document
            .select(&self.block_sel)
            .filter(|block| !block.value().classes().any(|c| c == self.inactive_class))
            .map(|block| {
                let (date, venue) = self.reader.read(&block);
                PerformanceListing::new(date, venue, Vec::new(), self.method())
            })
            .collect()
    }
}

/// A purchase continuation button somewhere on the page.
///
/// Yields at most one listing with unknown date and venue.
pub struct PurchaseButtonStrategy {
    button_sel: Selector,
    phrase: String,
}

impl PurchaseButtonStrategy {
    pub fn new(selectors: &DetectorSelectors) -> Result<Self> {
        Ok(Self {
            button_sel: parse_selector(&selectors.purchase_button)?,
            phrase: selectors.purchase_phrase.clone(),
        })
    }

    fn label(button: &ElementRef) -> String {
        let text = element_text(button);
        if !text.is_empty() {
            return text;
        }
        // <input type="submit"> carries its caption in `value`
        button
            .value()
            .attr("value")
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }
}

impl DetectionStrategy for PurchaseButtonStrategy {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::ButtonText
    }

    fn detect(&self, document: &Html) -> Vec<PerformanceListing> {
        let found = document
            .select(&self.button_sel)
            .any(|button| Self::label(&button).contains(&self.phrase));

        if found {
            vec![PerformanceListing::unknown(self.method())]
        } else {
            Vec::new()
        }
    }
}

/// Runs detection strategies in priority order.
pub struct AvailabilityDetector {
    strategies: Vec<Box<dyn DetectionStrategy>>,
}

impl AvailabilityDetector {
    /// Standard strategy chain: select control, active block, purchase button.
    pub fn new(selectors: &DetectorSelectors) -> Result<Self> {
        Ok(Self::with_strategies(vec![
            Box::new(SelectControlStrategy::new(selectors)?),
            Box::new(ActiveBlockStrategy::new(selectors)?),
            Box::new(PurchaseButtonStrategy::new(selectors)?),
        ]))
    }

    pub fn with_strategies(strategies: Vec<Box<dyn DetectionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Listings from the first strategy that finds any.
    pub fn detect(&self, html: &str) -> Vec<PerformanceListing> {
        let document = Html::parse_document(html);
        self.detect_document(&document)
    }

    pub fn detect_document(&self, document: &Html) -> Vec<PerformanceListing> {
        for strategy in &self.strategies {
            let listings = strategy.detect(document);
            if !listings.is_empty() {
                log::debug!(
                    "Strategy '{}' found {} performance(s)",
                    strategy.method(),
                    listings.len()
                );
                return listings;
            }
        }
        Vec::new()
    }

    /// Render an event page and detect its purchasable performances.
    pub async fn check_event(
        &self,
        renderer: &dyn PageRenderer,
        event: &EventDescriptor,
        debug: bool,
    ) -> Result<Vec<PerformanceListing>> {
        log::info!("  Checking tickets: {}", event.name);

        let html = renderer.render(&event.url, PageKind::Event).await?;

        if debug {
            let label = format!("tickets_{}", safe_file_stem(&event.name));
            if let Err(e) = renderer.capture_debug(&label, &html).await {
                log::warn!("Debug capture failed for {label}: {e}");
            }
        }

        Ok(self.detect(&html))
    }
}
