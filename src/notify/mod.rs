//! Notification delivery.
//!
//! - `LineNotifier`: LINE Messaging API push
//! - `ConsoleNotifier`: logs the message when no push channel is configured

mod console;
mod line;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::NotifierConfig;

pub use console::ConsoleNotifier;
pub use line::LineNotifier;

/// Best-effort, fire-and-forget message delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name for logs.
    fn name(&self) -> &str;

    /// Deliver one message.
    ///
    /// `Ok(false)` means the channel answered with a non-success status;
    /// `Err` means the message never reached it.
    async fn deliver(&self, message: &str) -> Result<bool>;
}

/// Build the notifier selected by the configuration.
pub fn from_config(config: &NotifierConfig) -> Result<Box<dyn Notifier>> {
    if config.line_configured() {
        Ok(Box::new(LineNotifier::new(config)?))
    } else {
        log::warn!(
            "LINE is not configured (LINE_CHANNEL_ACCESS_TOKEN / LINE_USER_ID); notifications go to the log"
        );
        Ok(Box::new(ConsoleNotifier))
    }
}
