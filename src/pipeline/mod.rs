//! Poll orchestration.
//!
//! - `Watcher::run_cycle`: one pass over all artists, events and performances
//! - `run_once` / `run_until`: single-shot and continuous run modes

pub mod cycle;
pub mod watch;

pub use cycle::{CyclePhase, CycleReport, Watcher};
pub use watch::{RunMode, run_forever, run_once, run_until, shutdown_signal};
