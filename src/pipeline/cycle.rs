// src/pipeline/cycle.rs

//! One poll cycle.
//!
//! ```text
//! IDLE → RENDERING_LIST → RENDERING_EVENT (loop) → DEDUPING
//!      → DELIVERING → PRUNING → PERSISTED → IDLE
//! ```
//!
//! Failures are isolated per unit: an artist whose index cannot be rendered,
//! or an event whose page cannot be rendered, contributes nothing this cycle
//! and the rest of the cycle carries on. Delivery is best-effort; the state is
//! committed whether or not a notification went through.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Artist, Config, DedupKey, EventDescriptor, Finding};
use crate::notify::{self, Notifier};
use crate::render::{HttpRenderer, PageRenderer};
use crate::services::{AvailabilityDetector, ListingExtractor};
use crate::storage::{LocalStateStore, NotificationState, StateStorage};
use crate::utils::{log, truncate_graphemes};

/// Stages of a poll cycle, logged at debug level as they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    RenderingList,
    RenderingEvent,
    Deduping,
    Delivering,
    Pruning,
    Persisted,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CyclePhase::Idle => "IDLE",
            CyclePhase::RenderingList => "RENDERING_LIST",
            CyclePhase::RenderingEvent => "RENDERING_EVENT",
            CyclePhase::Deduping => "DEDUPING",
            CyclePhase::Delivering => "DELIVERING",
            CyclePhase::Pruning => "PRUNING",
            CyclePhase::Persisted => "PERSISTED",
        };
        f.write_str(name)
    }
}

fn enter(phase: CyclePhase) {
    ::log::debug!("Cycle phase: {phase}");
}

/// Summary of a poll cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// New listings found (and delivered, best-effort) this cycle
    pub findings: Vec<Finding>,
    pub artists_checked: usize,
    pub unknown_artists: usize,
    pub artist_failures: usize,
    pub events_checked: usize,
    pub event_failures: usize,
    pub deliveries_failed: usize,
    pub pruned: usize,
}

/// Polls the configured artists and notifies each new listing once.
pub struct Watcher {
    config: Arc<Config>,
    extractor: ListingExtractor,
    detector: AvailabilityDetector,
    renderer: Box<dyn PageRenderer>,
    notifier: Box<dyn Notifier>,
    store: Box<dyn StateStorage>,
}

impl Watcher {
    pub fn new(
        config: Arc<Config>,
        renderer: Box<dyn PageRenderer>,
        notifier: Box<dyn Notifier>,
        store: Box<dyn StateStorage>,
    ) -> Result<Self> {
        Ok(Self {
            extractor: ListingExtractor::new(&config.watch)?,
            detector: AvailabilityDetector::new(&config.detector)?,
            config,
            renderer,
            notifier,
            store,
        })
    }

    /// Wire the HTTP renderer, the configured notifier and the local state file.
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        let mut renderer = HttpRenderer::new(&config.renderer)?;
        if config.watch.debug {
            renderer = renderer.with_debug_dir(&config.watch.debug_dir);
        }
        let notifier = notify::from_config(&config.notifier)?;
        let store = LocalStateStore::new(&config.watch.state_file);

        Self::new(config, Box::new(renderer), notifier, Box::new(store))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one cycle stamped with the current time.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle, recording new keys and pruning relative to `now`.
    ///
    /// Only loading or saving the state can fail the cycle.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        enter(CyclePhase::Idle);
        let mut state = self.store.load().await?;
        let mut report = CycleReport::default();

        for name in &self.config.watch.artists {
            log::section(name);

            let Some(artist) = self.extractor.resolve(name) else {
                ::log::warn!("  Unknown artist (no site id configured): {name}");
                report.unknown_artists += 1;
                continue;
            };
            report.artists_checked += 1;

            let events = match self.list_events(&artist).await {
                Ok(events) => events,
                Err(e) => {
                    ::log::warn!("  Failed to load event index for {name}: {e}");
                    report.artist_failures += 1;
                    continue;
                }
            };

            if events.is_empty() {
                ::log::info!("  No events");
                continue;
            }

            for event in &events {
                self.check_event(&artist, event, &mut state, now, &mut report)
                    .await;
            }
        }

        enter(CyclePhase::Delivering);
        for finding in &report.findings {
            if !self.deliver(finding).await {
                report.deliveries_failed += 1;
            }
        }

        if report.findings.is_empty() {
            ::log::info!("No changes");
        } else {
            ::log::info!(
                "=== {} new resale listing(s) detected! ===",
                report.findings.len()
            );
        }

        enter(CyclePhase::Pruning);
        report.pruned = state.prune(now, self.config.watch.retention());
        if report.pruned > 0 {
            ::log::info!("Pruned {} notification record(s)", report.pruned);
        }

        state.set_last_check(Utc::now());
        self.store.save(&state).await?;
        enter(CyclePhase::Persisted);

        Ok(report)
    }

    async fn list_events(&self, artist: &Artist) -> Result<Vec<EventDescriptor>> {
        enter(CyclePhase::RenderingList);
        self.extractor
            .fetch_events(self.renderer.as_ref(), artist, self.config.watch.debug)
            .await
    }

    /// Detect one event and queue findings for keys not yet notified.
    async fn check_event(
        &self,
        artist: &Artist,
        event: &EventDescriptor,
        state: &mut NotificationState,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) {
        enter(CyclePhase::RenderingEvent);
        report.events_checked += 1;

        let listings = match self
            .detector
            .check_event(self.renderer.as_ref(), event, self.config.watch.debug)
            .await
        {
            Ok(listings) => listings,
            Err(e) => {
                ::log::warn!("  Error ({}): {}", event.name, e);
                report.event_failures += 1;
                return;
            }
        };

        if listings.is_empty() {
            log::sub_item("No resale tickets");
            return;
        }

        enter(CyclePhase::Deduping);
        for listing in listings {
            let key = DedupKey::for_listing(event, &listing);
            if !state.is_new(&key) {
                ::log::debug!("Already notified: {key}");
                continue;
            }

            state.mark_notified(key, now);
            log::sub_item(&format!(
                "New: {} {} [{}]",
                listing.date, listing.venue, listing.detection_method
            ));
            report.findings.push(Finding {
                artist: artist.clone(),
                event: event.clone(),
                listing,
            });
        }
    }

    /// Deliver one finding; `false` when the channel did not accept it.
    async fn deliver(&self, finding: &Finding) -> bool {
        let message = finding.format(&self.config.notifier.message_template);
        ::log::info!(
            "Sending notification via {}: {}...",
            self.notifier.name(),
            truncate_graphemes(&message, 60).replace('\n', " ")
        );

        match self.notifier.deliver(&message).await {
            Ok(true) => true,
            Ok(false) => {
                ::log::warn!("Notification for {} was not accepted", finding.key());
                false
            }
            Err(e) => {
                ::log::warn!("Notification for {} failed: {}", finding.key(), e);
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use tempfile::TempDir;

    use crate::error::AppError;
    use crate::models::DetectionMethod;
    use crate::render::PageKind;

    const BASE: &str = "https://relief-ticket.jp";

    /// Serves canned pages; unknown URLs fail to render.
    #[derive(Clone, Default)]
    pub(crate) struct FakeRenderer {
        pages: Arc<Mutex<HashMap<String, String>>>,
        rendered: Arc<Mutex<Vec<String>>>,
    }

    impl FakeRenderer {
        pub(crate) fn set(&self, path: &str, html: &str) {
            self.pages
                .lock()
                .unwrap()
                .insert(format!("{BASE}{path}"), html.to_string());
        }

        pub(crate) fn rendered(&self) -> Vec<String> {
            self.rendered.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageRenderer for FakeRenderer {
        async fn render(&self, url: &str, _kind: PageKind) -> Result<String> {
            self.rendered.lock().unwrap().push(url.to_string());
            self.pages
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| AppError::render(url, "navigation timeout"))
        }
    }

    /// Records delivered messages; messages containing a poisoned word fail.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingNotifier {
        sent: Arc<Mutex<Vec<String>>>,
        poison: Arc<Mutex<HashSet<String>>>,
    }

    impl RecordingNotifier {
        pub(crate) fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }

        fn fail_on(&self, word: &str) {
            self.poison.lock().unwrap().insert(word.to_string());
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &str {
            "recording"
        }

        async fn deliver(&self, message: &str) -> Result<bool> {
            let poisoned = self
                .poison
                .lock()
                .unwrap()
                .iter()
                .any(|w| message.contains(w.as_str()));
            if poisoned {
                return Err(AppError::delivery("recording", "connection reset"));
            }
            self.sent.lock().unwrap().push(message.to_string());
            Ok(true)
        }
    }

    pub(crate) fn index_page(links: &[(&str, &str)]) -> String {
        let items: String = links
            .iter()
            .map(|(href, name)| format!(r#"<li><a href="{href}">{name}</a></li>"#))
            .collect();
        format!("<html><body><ul>{items}</ul></body></html>")
    }

    pub(crate) fn event_page(blocks: &[(&str, &str, bool)]) -> String {
        let body: String = blocks
            .iter()
            .map(|(date, venue, muted)| {
                let class = if *muted {
                    "perform-list text-muted"
                } else {
                    "perform-list"
                };
                format!(r#"<div class="{class}"><div class="lead">{date}</div><p>{venue}</p></div>"#)
            })
            .collect();
        format!("<html><body>{body}</body></html>")
    }

    fn select_page(date: &str, venue: &str) -> String {
        format!(
            r#"<div class="perform-list text-muted"><div class="lead">{date}</div><p>{venue}</p>
               <select class="ticket-select"><option data-ticket-no="2">2枚</option></select></div>"#
        )
    }

    pub(crate) fn test_config(artists: &[&str]) -> Config {
        let mut config = Config::default();
        config.watch.artists = artists.iter().map(|a| a.to_string()).collect();
        config.notifier.message_template = "{artist}|{event}|{date}|{venue}|{tickets}".to_string();
        config
    }

    pub(crate) struct Harness {
        pub(crate) watcher: Watcher,
        pub(crate) renderer: FakeRenderer,
        pub(crate) notifier: RecordingNotifier,
        pub(crate) store: LocalStateStore,
        _tmp: TempDir,
    }

    pub(crate) fn harness(config: Config) -> Harness {
        let tmp = TempDir::new().unwrap();
        let renderer = FakeRenderer::default();
        let notifier = RecordingNotifier::default();
        let store = LocalStateStore::new(tmp.path().join("state.json"));
        let watcher = Watcher::new(
            Arc::new(config),
            Box::new(renderer.clone()),
            Box::new(notifier.clone()),
            Box::new(store.clone()),
        )
        .unwrap();

        Harness {
            watcher,
            renderer,
            notifier,
            store,
            _tmp: tmp,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_notifies_once() {
        let h = harness(test_config(&["Travis Japan"]));
        h.renderer.set(
            "/events/artist/38",
            &index_page(&[("/events/artist/38/101", "Winter Tour")]),
        );
        h.renderer.set("/events/artist/38/101", &select_page("12/25", "Hall A"));

        // Cycle 1: new listing
        let report = h.watcher.run_cycle_at(now()).await.unwrap();
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].listing.detection_method, DetectionMethod::Select);
        assert_eq!(h.notifier.sent(), vec!["Travis Japan|Winter Tour|12/25|Hall A|(2枚)"]);

        let key = DedupKey::new("/events/artist/38/101", "12/25", "Hall A");
        let state = h.store.load().await.unwrap();
        assert_eq!(state.notified_at(&key), Some(now()));
        assert!(state.last_check().is_some());

        // Cycle 2: unchanged page
        let report = h.watcher.run_cycle_at(now()).await.unwrap();
        assert!(report.findings.is_empty());
        assert_eq!(h.notifier.sent().len(), 1);
        assert_eq!(h.store.load().await.unwrap().len(), 1);

        // Cycle 3: control gone, block now merely active; same key
        h.renderer.set(
            "/events/artist/38/101",
            &event_page(&[("12/25", "Hall A", false)]),
        );
        let report = h.watcher.run_cycle_at(now()).await.unwrap();
        assert!(report.findings.is_empty());
        assert_eq!(h.notifier.sent().len(), 1);
        assert_eq!(h.store.load().await.unwrap().notified_at(&key), Some(now()));
    }

    #[tokio::test]
    async fn test_failing_event_is_isolated() {
        let h = harness(test_config(&["Travis Japan"]));
        h.renderer.set(
            "/events/artist/38",
            &index_page(&[
                ("/events/artist/38/1", "A"),
                ("/events/artist/38/2", "B"),
                ("/events/artist/38/3", "C"),
            ]),
        );
        h.renderer.set("/events/artist/38/1", &event_page(&[("1/1", "Hall A", false)]));
        // event 2 has no page and fails to render
        h.renderer.set("/events/artist/38/3", &event_page(&[("3/3", "Hall C", false)]));

        let report = h.watcher.run_cycle_at(now()).await.unwrap();

        assert_eq!(report.events_checked, 3);
        assert_eq!(report.event_failures, 1);
        assert_eq!(report.findings.len(), 2);

        let state = h.store.load().await.unwrap();
        assert!(!state.is_new(&DedupKey::new("/events/artist/38/1", "1/1", "Hall A")));
        assert!(!state.is_new(&DedupKey::new("/events/artist/38/3", "3/3", "Hall C")));
        assert!(
            h.renderer
                .rendered()
                .contains(&format!("{BASE}/events/artist/38/3"))
        );
    }

    #[tokio::test]
    async fn test_unknown_and_failing_artists_are_skipped() {
        let h = harness(test_config(&["Nobody", "SixTONES", "Travis Japan"]));
        // SixTONES index is missing and fails to render
        h.renderer.set(
            "/events/artist/38",
            &index_page(&[("/events/artist/38/101", "Winter Tour")]),
        );
        h.renderer.set("/events/artist/38/101", &event_page(&[("12/25", "Hall A", false)]));

        let report = h.watcher.run_cycle_at(now()).await.unwrap();

        assert_eq!(report.unknown_artists, 1);
        assert_eq!(report.artist_failures, 1);
        assert_eq!(report.artists_checked, 2);
        assert_eq!(report.findings.len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_block_others_or_state() {
        let h = harness(test_config(&["Travis Japan"]));
        h.notifier.fail_on("Hall A");
        h.renderer.set(
            "/events/artist/38",
            &index_page(&[("/events/artist/38/101", "Winter Tour")]),
        );
        h.renderer.set(
            "/events/artist/38/101",
            &event_page(&[("12/25", "Hall A", false), ("12/26", "Hall B", false)]),
        );

        let report = h.watcher.run_cycle_at(now()).await.unwrap();

        assert_eq!(report.findings.len(), 2);
        assert_eq!(report.deliveries_failed, 1);
        assert_eq!(h.notifier.sent(), vec!["Travis Japan|Winter Tour|12/26|Hall B|"]);
        assert_eq!(h.store.load().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sold_out_event_produces_nothing() {
        let h = harness(test_config(&["Travis Japan"]));
        h.renderer.set(
            "/events/artist/38",
            &index_page(&[("/events/artist/38/101", "Winter Tour")]),
        );
        h.renderer.set(
            "/events/artist/38/101",
            &event_page(&[("12/25", "Hall A", true), ("12/26", "Hall B", true)]),
        );

        let report = h.watcher.run_cycle_at(now()).await.unwrap();

        assert!(report.findings.is_empty());
        assert!(h.notifier.sent().is_empty());
        assert!(h.store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_entries_pruned_and_renotified() {
        let h = harness(test_config(&["Travis Japan"]));
        h.renderer.set(
            "/events/artist/38",
            &index_page(&[("/events/artist/38/101", "Winter Tour")]),
        );
        h.renderer.set("/events/artist/38/101", &event_page(&[("12/25", "Hall A", false)]));

        let first = now() - chrono::Duration::days(40);
        h.watcher.run_cycle_at(first).await.unwrap();
        assert_eq!(h.notifier.sent().len(), 1);

        // Sold out now; the 40-day-old record is pruned
        h.renderer.set("/events/artist/38/101", &event_page(&[("12/25", "Hall A", true)]));
        let report = h.watcher.run_cycle_at(now()).await.unwrap();
        assert_eq!(report.pruned, 1);
        assert!(h.store.load().await.unwrap().is_empty());

        // Back on sale: notified again
        h.renderer.set("/events/artist/38/101", &event_page(&[("12/25", "Hall A", false)]));
        let report = h.watcher.run_cycle_at(now()).await.unwrap();
        assert_eq!(report.findings.len(), 1);
        assert_eq!(h.notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_huge_retention_keeps_records_without_panicking() {
        let mut config = test_config(&["Travis Japan"]);
        config.watch.retention_days = 200_000_000_000_000;
        let h = harness(config);
        h.renderer.set(
            "/events/artist/38",
            &index_page(&[("/events/artist/38/101", "Winter Tour")]),
        );
        h.renderer.set("/events/artist/38/101", &event_page(&[("12/25", "Hall A", false)]));

        h.watcher
            .run_cycle_at(now() - chrono::Duration::days(400))
            .await
            .unwrap();
        let report = h.watcher.run_cycle_at(now()).await.unwrap();

        assert_eq!(report.pruned, 0);
        assert!(report.findings.is_empty());
        assert_eq!(h.store.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_performance_in_one_page_notifies_once() {
        let h = harness(test_config(&["Travis Japan"]));
        h.renderer.set(
            "/events/artist/38",
            &index_page(&[("/events/artist/38/101", "Winter Tour")]),
        );
        h.renderer.set(
            "/events/artist/38/101",
            &event_page(&[("12/25", "Hall A", false), ("12/25", "Hall A", false)]),
        );

        let report = h.watcher.run_cycle_at(now()).await.unwrap();
        assert_eq!(report.findings.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_state_fails_cycle_without_delivery() {
        let h = harness(test_config(&["Travis Japan"]));
        std::fs::write(h.store.path(), b"not json").unwrap();

        let result = h.watcher.run_cycle_at(now()).await;
        assert!(matches!(result, Err(AppError::State(_))));
        assert!(h.renderer.rendered().is_empty());
        assert!(h.notifier.sent().is_empty());
    }
}
