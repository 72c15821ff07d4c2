// src/pipeline/watch.rs

//! Run modes: a single cycle, or cycles on a fixed interval until interrupted.

use std::error::Error as _;
use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::pipeline::{CycleReport, Watcher};
use crate::utils::log;

/// How the watcher is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One cycle, then exit; for external schedulers
    Once,
    /// Cycles separated by the check interval until interrupted
    Continuous,
}

impl RunMode {
    pub fn describe(&self, interval: Duration) -> String {
        match self {
            RunMode::Once => "single-shot".to_string(),
            RunMode::Continuous => format!("loop ({}s interval)", interval.as_secs()),
        }
    }
}

/// Run exactly one cycle.
pub async fn run_once(watcher: &Watcher) -> Result<CycleReport> {
    let report = watcher.run_cycle().await?;
    log_report(&report);
    Ok(report)
}

/// Run cycles until Ctrl-C.
pub async fn run_forever(watcher: &Watcher) -> Result<()> {
    run_until(watcher, watcher.config().watch.check_interval(), shutdown_signal()).await
}

/// Run cycles separated by `interval` until `shutdown` resolves.
///
/// A cycle that fails is logged and followed by the normal wait. Shutdown is
/// honoured both while waiting and mid-cycle; an interrupted cycle has not
/// written its state.
pub async fn run_until<F>(watcher: &Watcher, interval: Duration, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut cycles: u64 = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            result = watcher.run_cycle() => {
                cycles += 1;
                match result {
                    Ok(report) => log_report(&report),
                    Err(e) => ::log::error!("Cycle {cycles} failed: {}", error_chain(&e)),
                }
            }
        }

        ::log::info!("Next check in {}s", interval.as_secs());
        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    ::log::info!("Watcher stopped after {cycles} cycle(s)");
    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => ::log::info!("Interrupt received, shutting down"),
        Err(e) => {
            ::log::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    }
}

fn log_report(report: &CycleReport) {
    log::summary(
        "Cycle",
        &[
            ("Artists", report.artists_checked.to_string()),
            ("Events checked", report.events_checked.to_string()),
            (
                "Failures",
                format!(
                    "{} artist(s), {} event(s)",
                    report.artist_failures, report.event_failures
                ),
            ),
            ("New listings", report.findings.len().to_string()),
            ("Failed deliveries", report.deliveries_failed.to_string()),
        ],
    );
}

/// Error message followed by its sources.
fn error_chain(error: &AppError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(&format!("\n  caused by: {cause}"));
        source = cause.source();
    }
    message
}
