// src/models/selectors.rs

//! Markup hooks used to read an event page.

use serde::{Deserialize, Serialize};

/// CSS selectors and markers for detecting resale availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorSelectors {
    /// Block enclosing a ticket quantity control
    #[serde(default = "defaults::performance_block")]
    pub performance_block: String,

    /// Performance block scanned by the active-block fallback, any tag
    #[serde(default = "defaults::active_block")]
    pub active_block: String,

    /// Class present on sold-out performance blocks
    #[serde(default = "defaults::inactive_class")]
    pub inactive_class: String,

    /// Selector for the ticket quantity control
    #[serde(default = "defaults::quantity_select")]
    pub quantity_select: String,

    /// Selector for selectable quantity options inside the control
    #[serde(default = "defaults::quantity_option")]
    pub quantity_option: String,

    /// Selector for the date line within a block
    #[serde(default = "defaults::date")]
    pub date: String,

    /// Selector for the venue line within a block
    #[serde(default = "defaults::venue")]
    pub venue: String,

    /// Selector for clickable purchase elements
    #[serde(default = "defaults::purchase_button")]
    pub purchase_button: String,

    /// Text that marks a purchase continuation button
    #[serde(default = "defaults::purchase_phrase")]
    pub purchase_phrase: String,
}

impl Default for DetectorSelectors {
    fn default() -> Self {
        Self {
            performance_block: defaults::performance_block(),
            active_block: defaults::active_block(),
            inactive_class: defaults::inactive_class(),
            quantity_select: defaults::quantity_select(),
            quantity_option: defaults::quantity_option(),
            date: defaults::date(),
            venue: defaults::venue(),
            purchase_button: defaults::purchase_button(),
            purchase_phrase: defaults::purchase_phrase(),
        }
    }
}

mod defaults {
    pub fn performance_block() -> String {
        "div.perform-list".into()
    }
    pub fn active_block() -> String {
        ".perform-list".into()
    }
    pub fn inactive_class() -> String {
        "text-muted".into()
    }
    pub fn quantity_select() -> String {
        ".ticket-select".into()
    }
    pub fn quantity_option() -> String {
        "option[data-ticket-no]".into()
    }
    pub fn date() -> String {
        ".lead".into()
    }
    pub fn venue() -> String {
        "p".into()
    }
    pub fn purchase_button() -> String {
        "button, input[type=submit], a.btn".into()
    }
    pub fn purchase_phrase() -> String {
        "購入手続き".into()
    }
}
