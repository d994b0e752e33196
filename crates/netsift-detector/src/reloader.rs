//! Indicator reload manager.
//!
//! A single long-lived task that polls the indicator file's modification
//! time and, when it changes, compiles a fresh scan engine and hands it to
//! the detection loop over a single-slot channel. The send may wait for the
//! detector to drain, but the reloader never touches an instance after
//! sending it, and the detector's own event handling is never blocked.
//!
//! The freshness check is mtime-based, not content-hash-based: touching the
//! file with identical content still triggers a reload. That is expected.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use netsift_intel::{load_engine, ScanEngine};

use crate::metrics::DetectorMetrics;

pub struct IndicatorReloader {
    path: PathBuf,
    poll_interval: Duration,
    /// Modification time recorded at the last successful load. `None` means
    /// no load has happened yet, so the first poll always loads.
    last_modified: Option<SystemTime>,
    handoff: mpsc::Sender<ScanEngine>,
    metrics: Arc<DetectorMetrics>,
}

impl IndicatorReloader {
    pub fn new(
        path: PathBuf,
        poll_interval: Duration,
        last_modified: Option<SystemTime>,
        handoff: mpsc::Sender<ScanEngine>,
        metrics: Arc<DetectorMetrics>,
    ) -> Self {
        Self {
            path,
            poll_interval,
            last_modified,
            handoff,
            metrics,
        }
    }

    /// Poll until the handoff receiver goes away.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        // The first tick of an interval completes immediately; consume it so
        // the first check happens one full interval after startup.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let modified = match std::fs::metadata(&self.path).and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "stat failed on indicator file");
                    continue;
                }
            };

            if self.last_modified == Some(modified) {
                continue;
            }

            info!(path = %self.path.display(), "indicator file changed, loading");
            let engine = match load_engine(&self.path) {
                Ok(engine) => engine,
                Err(e) => {
                    // Previous mtime and engine stay untouched; retried at
                    // the next poll.
                    error!(error = %e, "failed to load indicators, keeping previous set");
                    continue;
                }
            };

            self.last_modified = Some(modified);
            self.metrics.set_indicator_count(engine.indicator_count());
            info!(count = engine.indicator_count(), "indicators loaded");

            if self.handoff.send(engine).await.is_err() {
                debug!("handoff receiver dropped, stopping reloader");
                return;
            }
        }
    }
}
