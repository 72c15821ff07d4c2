//! Notification state persistence.
//!
//! The state file records every dedup key that has been notified and when:
//!
//! ```text
//! {
//!   "notified": {
//!     "/events/artist/38/101|12/25|Hall A": "2026-10-19T09:00:00Z"
//!   },
//!   "last_check": "2026-10-19T09:01:12Z"
//! }
//! ```
//!
//! It is loaded once at the start of a poll cycle and fully rewritten at the end.

pub mod local;
mod state;

use async_trait::async_trait;

use crate::error::Result;

pub use local::LocalStateStore;
pub use state::{NotificationState, StateFile, DEFAULT_RETENTION_DAYS, MAX_RETENTION_DAYS};

/// Trait for notification state backends.
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Load the persisted state; a missing store yields an empty state.
    async fn load(&self) -> Result<NotificationState>;

    /// Replace the persisted state.
    async fn save(&self, state: &NotificationState) -> Result<()>;
}
