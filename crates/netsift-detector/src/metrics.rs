//! Detection metrics and HTTP exposure.
//!
//! An explicit, process-scoped metrics handle -- created once at startup and
//! passed by reference into the orchestrator and the reload manager. No
//! global registry. Rendered in Prometheus text exposition format and served
//! via `GET /metrics`.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::extract::State;
use axum::routing::get;
use axum::Router;
use tracing::info;

/// Upper bounds for the hits-per-event histogram.
const HIT_BUCKETS: [u64; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 12, 15, 20, 25, 50];

/// Counters, gauges and the hits-per-event histogram updated synchronously
/// by the detection path.
#[derive(Debug)]
pub struct DetectorMetrics {
    /// Size of the currently loaded indicator set.
    indicator_count: AtomicU64,
    /// Total events processed.
    events_processed: AtomicU64,

    // Hits-per-event histogram. Per-bucket counts are non-cumulative here
    // and summed into cumulative form at render time.
    hit_bucket_counts: Vec<AtomicU64>,
    hit_overflow_count: AtomicU64,
    hits_sum: AtomicU64,
    hits_count: AtomicU64,

    /// Hit counts keyed by indicator category.
    category_hits: Mutex<HashMap<String, u64>>,
    /// Hit counts keyed by indicator type.
    type_hits: Mutex<HashMap<String, u64>>,
}

impl DetectorMetrics {
    pub fn new() -> Self {
        Self {
            indicator_count: AtomicU64::new(0),
            events_processed: AtomicU64::new(0),
            hit_bucket_counts: HIT_BUCKETS.iter().map(|_| AtomicU64::new(0)).collect(),
            hit_overflow_count: AtomicU64::new(0),
            hits_sum: AtomicU64::new(0),
            hits_count: AtomicU64::new(0),
            category_hits: Mutex::new(HashMap::new()),
            type_hits: Mutex::new(HashMap::new()),
        }
    }

    /// Set the indicator-set size gauge. Called once per successful load.
    pub fn set_indicator_count(&self, count: usize) {
        self.indicator_count.store(count as u64, Ordering::Relaxed);
    }

    /// Observe the number of hits for one event (including zero).
    pub fn observe_hits(&self, hits: usize) {
        let hits = hits as u64;
        self.events_processed.fetch_add(1, Ordering::Relaxed);
        self.hits_count.fetch_add(1, Ordering::Relaxed);
        self.hits_sum.fetch_add(hits, Ordering::Relaxed);
        match HIT_BUCKETS.iter().position(|&bound| hits <= bound) {
            Some(idx) => {
                self.hit_bucket_counts[idx].fetch_add(1, Ordering::Relaxed);
            }
            None => {
                self.hit_overflow_count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Count one hit against its category and type.
    pub fn record_hit(&self, category: &str, indicator_type: &str) {
        let mut categories = self.category_hits.lock().expect("metrics lock poisoned");
        *categories.entry(category.to_string()).or_insert(0) += 1;
        drop(categories);

        let mut types = self.type_hits.lock().expect("metrics lock poisoned");
        *types.entry(indicator_type.to_string()).or_insert(0) += 1;
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::new();

        writeln!(out, "# HELP indicator_count Number of indicators").unwrap();
        writeln!(out, "# TYPE indicator_count gauge").unwrap();
        writeln!(
            out,
            "indicator_count {}",
            self.indicator_count.load(Ordering::Relaxed)
        )
        .unwrap();

        writeln!(out, "# HELP events_processed Total events processed").unwrap();
        writeln!(out, "# TYPE events_processed counter").unwrap();
        writeln!(
            out,
            "events_processed {}",
            self.events_processed.load(Ordering::Relaxed)
        )
        .unwrap();

        writeln!(out, "# HELP hits Number of hits on an event").unwrap();
        writeln!(out, "# TYPE hits histogram").unwrap();
        let mut cumulative = 0;
        for (bound, count) in HIT_BUCKETS.iter().zip(&self.hit_bucket_counts) {
            cumulative += count.load(Ordering::Relaxed);
            writeln!(out, "hits_bucket{{le=\"{}\"}} {}", bound, cumulative).unwrap();
        }
        cumulative += self.hit_overflow_count.load(Ordering::Relaxed);
        writeln!(out, "hits_bucket{{le=\"+Inf\"}} {}", cumulative).unwrap();
        writeln!(out, "hits_sum {}", self.hits_sum.load(Ordering::Relaxed)).unwrap();
        writeln!(out, "hits_count {}", self.hits_count.load(Ordering::Relaxed)).unwrap();

        writeln!(out, "# HELP hits_on_category Hits by category").unwrap();
        writeln!(out, "# TYPE hits_on_category counter").unwrap();
        render_labeled(&mut out, "hits_on_category", "category", &self.category_hits);

        writeln!(out, "# HELP hits_on_type Hits by type").unwrap();
        writeln!(out, "# TYPE hits_on_type counter").unwrap();
        render_labeled(&mut out, "hits_on_type", "type", &self.type_hits);

        out
    }
}

impl Default for DetectorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Render one labeled counter family with deterministic label order.
fn render_labeled(out: &mut String, name: &str, label: &str, values: &Mutex<HashMap<String, u64>>) {
    let values = values.lock().expect("metrics lock poisoned");
    let mut entries: Vec<_> = values.iter().collect();
    entries.sort_by_key(|(key, _)| key.as_str());
    for (key, count) in entries {
        writeln!(out, "{}{{{}=\"{}\"}} {}", name, label, key, count).unwrap();
    }
}

/// Serve `GET /metrics` until the process exits.
pub async fn serve_metrics(metrics: Arc<DetectorMetrics>, port: u16) -> Result<()> {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "metrics endpoint listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn metrics_handler(State(metrics): State<Arc<DetectorMetrics>>) -> String {
    metrics.render()
}
