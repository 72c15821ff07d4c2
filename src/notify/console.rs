use async_trait::async_trait;

use crate::error::Result;
use crate::notify::Notifier;

/// Writes each message to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn name(&self) -> &str {
        "console"
    }

    async fn deliver(&self, message: &str) -> Result<bool> {
        for line in message.lines() {
            log::info!("[notify] {line}");
        }
        Ok(true)
    }
}
