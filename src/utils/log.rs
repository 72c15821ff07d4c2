// src/utils/log.rs

//! Banner and summary helpers on top of the `log` facade.
//!
//! Timestamps and level prefixes come from the installed logger.

/// Width of separator lines.
const RULE_WIDTH: usize = 50;

/// Log a separator line
pub fn separator() {
    log::info!("{}", "─".repeat(RULE_WIDTH));
}

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(RULE_WIDTH);
    log::info!("{border}");
    log::info!("  {title}");
    log::info!("{border}");
}

/// Log a section title such as `--- SixTONES ---`
pub fn section(title: &str) {
    log::info!("--- {title} ---");
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    log::info!("    {message}");
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {title}");
    for (key, value) in items {
        log::info!("    {key}: {value}");
    }
}
