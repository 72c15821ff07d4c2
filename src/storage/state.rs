//! In-memory notification state: dedup membership and retention.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::DedupKey;

/// Retention applied when none is configured.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Longest retention accepted from configuration.
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// Keys already notified, each with the time of its first notification.
///
/// Entries are inserted once, never updated, and leave only through
/// [`NotificationState::prune`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationState {
    notified: BTreeMap<DedupKey, DateTime<Utc>>,
    last_check: Option<DateTime<Utc>>,
}

impl NotificationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` has not been notified (or has since been pruned).
    pub fn is_new(&self, key: &DedupKey) -> bool {
        !self.notified.contains_key(key)
    }

    /// Record the first notification of `key`.
    ///
    /// Returns `false` and keeps the original timestamp if the key is present.
    pub fn mark_notified(&mut self, key: DedupKey, at: DateTime<Utc>) -> bool {
        if self.notified.contains_key(&key) {
            return false;
        }
        self.notified.insert(key, at);
        true
    }

    /// Remove entries not strictly newer than `now - retention`.
    ///
    /// Returns the number of removed entries. A window reaching past the
    /// representable range keeps everything.
    pub fn prune(&mut self, now: DateTime<Utc>, retention: Duration) -> usize {
        let Some(cutoff) = now.checked_sub_signed(retention) else {
            return 0;
        };
        let before = self.notified.len();
        self.notified.retain(|_, at| *at > cutoff);
        before - self.notified.len()
    }

    pub fn notified_at(&self, key: &DedupKey) -> Option<DateTime<Utc>> {
        self.notified.get(key).copied()
    }

    pub fn last_check(&self) -> Option<DateTime<Utc>> {
        self.last_check
    }

    /// Stamp the completion time of a cycle.
    pub fn set_last_check(&mut self, at: DateTime<Utc>) {
        self.last_check = Some(at);
    }

    pub fn len(&self) -> usize {
        self.notified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notified.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &DedupKey> {
        self.notified.keys()
    }
}

/// On-disk layout of the state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(default)]
    pub notified: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check: Option<String>,
}

impl From<&NotificationState> for StateFile {
    fn from(state: &NotificationState) -> Self {
        Self {
            notified: state
                .notified
                .iter()
                .map(|(key, at)| (key.to_string(), format_timestamp(at)))
                .collect(),
            last_check: state.last_check.as_ref().map(format_timestamp),
        }
    }
}

impl From<StateFile> for NotificationState {
    /// Entries with unreadable timestamps are dropped, so they may notify again.
    fn from(file: StateFile) -> Self {
        let mut notified = BTreeMap::new();
        for (key, raw) in file.notified {
            match parse_timestamp(&raw) {
                Some(at) => {
                    notified.insert(DedupKey::from(key.as_str()), at);
                }
                None => log::warn!("Dropping state entry '{key}' with invalid timestamp '{raw}'"),
            }
        }

        Self {
            notified,
            last_check: file.last_check.as_deref().and_then(parse_timestamp),
        }
    }
}

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse RFC 3339, or an offset-less ISO-8601 timestamp taken as local time.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    let naive: NaiveDateTime = raw.parse().ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
}
