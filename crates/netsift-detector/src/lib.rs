//! netsift detector daemon.
//!
//! Subscribes to a stream of network-telemetry events, derives searchable
//! tokens from each event, matches them against the loaded indicator set,
//! attaches hits as enrichment records, and republishes. The indicator set
//! is hot-reloaded in the background without stalling event processing.

pub mod detector;
pub mod metrics;
pub mod reloader;
pub mod tokens;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use netsift_core::DetectorConfig;
use netsift_intel::load_engine;

use crate::detector::Detector;
use crate::metrics::{serve_metrics, DetectorMetrics};
use crate::reloader::IndicatorReloader;
use crate::transport::{ZmqEventPublisher, ZmqEventSubscriber};

pub struct Daemon {
    config: DetectorConfig,
}

impl Daemon {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Load indicators, start the reloader and metrics endpoint, connect
    /// transport, and process events until the process exits.
    ///
    /// A missing or unparseable indicator file at this point is fatal; once
    /// serving, reload failures only ever keep the previous set.
    pub async fn run(self) -> Result<()> {
        let metrics = Arc::new(DetectorMetrics::new());

        let modified = std::fs::metadata(&self.config.indicator_file)
            .and_then(|m| m.modified())
            .with_context(|| {
                format!(
                    "stat on indicator file {}",
                    self.config.indicator_file.display()
                )
            })?;
        let engine = load_engine(&self.config.indicator_file).context("loading indicators")?;
        metrics.set_indicator_count(engine.indicator_count());
        info!(count = engine.indicator_count(), "indicators loaded");

        let (handoff_tx, handoff_rx) = mpsc::channel(1);
        tokio::spawn(
            IndicatorReloader::new(
                self.config.indicator_file.clone(),
                Duration::from_secs(self.config.poll_interval_secs),
                Some(modified),
                handoff_tx,
                metrics.clone(),
            )
            .run(),
        );

        {
            let metrics = metrics.clone();
            let port = self.config.metrics_port;
            tokio::spawn(async move {
                if let Err(e) = serve_metrics(metrics, port).await {
                    error!(error = %e, "metrics endpoint failed");
                }
            });
        }

        let subscriber = ZmqEventSubscriber::connect(&self.config.input_endpoint)
            .await
            .context("connecting event subscriber")?;
        subscriber.subscribe(&self.config.input).await?;
        let publisher =
            ZmqEventPublisher::connect(&self.config.output_endpoint, self.config.outputs.clone())
                .await
                .context("connecting event publisher")?;

        let mut detector = Detector::new(engine, handoff_rx, publisher, metrics);
        info!(input = %self.config.input, "detector running");

        // Events are processed one at a time; no two events ever share a
        // live reset-to-collect cycle on the engine.
        loop {
            match subscriber.recv().await {
                Ok(envelope) => {
                    detector
                        .handle_event(envelope.event, envelope.properties)
                        .await
                }
                Err(e) => warn!(error = %e, "failed to receive inbound event"),
            }
        }
    }
}
