//! Detection orchestrator.
//!
//! Invoked once per inbound event: adopt any pending reloaded engine, derive
//! the token stream, drive the scan engine through its stream contract,
//! attach enrichment records for every hit, update metrics, and forward the
//! event. The handler never fails the pipeline; the event is always
//! forwarded, enriched or not.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use netsift_core::{MatchedIndicator, NetworkEvent};
use netsift_intel::{Hit, ScanEngine, Token};

use crate::metrics::DetectorMetrics;
use crate::tokens::extract_tokens;
use crate::transport::EventSink;

pub struct Detector<S: EventSink> {
    /// The current engine instance. Exclusively owned here; replaced, never
    /// mutated, on reload.
    engine: ScanEngine,
    /// Single-slot handoff channel from the reload manager.
    pending: mpsc::Receiver<ScanEngine>,
    sink: S,
    metrics: Arc<DetectorMetrics>,
}

impl<S: EventSink> Detector<S> {
    pub fn new(
        engine: ScanEngine,
        pending: mpsc::Receiver<ScanEngine>,
        sink: S,
        metrics: Arc<DetectorMetrics>,
    ) -> Self {
        Self {
            engine,
            pending,
            sink,
            metrics,
        }
    }

    /// Handle one inbound event.
    pub async fn handle_event(
        &mut self,
        mut event: NetworkEvent,
        properties: HashMap<String, String>,
    ) {
        // Drain the handoff channel before any token work, so a reload takes
        // effect starting with this event and never mid-stream. No pending
        // engine just means the current one stays.
        if let Ok(engine) = self.pending.try_recv() {
            self.engine = engine;
            info!(count = self.engine.indicator_count(), "using new indicators");
        }

        let tokens = extract_tokens(&event);

        self.engine.reset();
        for token in &tokens {
            self.engine.update(token);
        }
        self.engine.update(&Token::end());
        let hits = self.engine.hits();

        self.metrics.observe_hits(hits.len());
        for hit in hits {
            self.metrics
                .record_hit(&hit.descriptor.category, hit.descriptor.kind.as_str());
            event.indicators.push(to_matched(hit));
        }

        if let Err(e) = self.sink.publish(event, properties).await {
            warn!(error = %e, "failed to publish event");
        }
    }
}

fn to_matched(hit: &Hit) -> MatchedIndicator {
    MatchedIndicator {
        id: hit.id.clone(),
        indicator_type: hit.descriptor.kind.to_string(),
        value: hit.descriptor.value.clone(),
        category: hit.descriptor.category.clone(),
        source: hit.descriptor.source.clone(),
        author: hit.descriptor.author.clone(),
        description: hit.descriptor.description.clone(),
        probability: hit.descriptor.probability,
    }
}

#[cfg(test)]
mod tests {
    use netsift_core::{DnsMessage, DnsRecord};
    use netsift_intel::{IndicatorDef, IndicatorDescriptor, TokenKind};

    use crate::transport::ChannelSink;

    use super::*;

    fn hostname_def(id: &str, value: &str) -> IndicatorDef {
        IndicatorDef {
            id: id.to_string(),
            descriptor: IndicatorDescriptor {
                category: "malware".to_string(),
                kind: TokenKind::Hostname,
                value: value.to_string(),
                source: "unit-test".to_string(),
                author: "test@netsift".to_string(),
                description: format!("known bad host {}", value),
                probability: 0.8,
            },
            pattern: None,
        }
    }

    fn dns_event(id: &str, query_name: &str) -> NetworkEvent {
        NetworkEvent {
            id: id.to_string(),
            action: "dns_message".to_string(),
            dns: Some(DnsMessage {
                query: vec![DnsRecord {
                    name: query_name.to_string(),
                    record_type: Some("A".to_string()),
                }],
                answer: vec![],
            }),
            ..Default::default()
        }
    }

    fn make_detector(
        defs: Vec<IndicatorDef>,
    ) -> (
        Detector<ChannelSink>,
        mpsc::Sender<ScanEngine>,
        mpsc::Receiver<crate::transport::Envelope>,
        Arc<DetectorMetrics>,
    ) {
        let engine = ScanEngine::build(defs);
        let (handoff_tx, handoff_rx) = mpsc::channel(1);
        let (sink, published_rx) = ChannelSink::new(16);
        let metrics = Arc::new(DetectorMetrics::new());
        let detector = Detector::new(engine, handoff_rx, sink, metrics.clone());
        (detector, handoff_tx, published_rx, metrics)
    }

    #[tokio::test]
    async fn test_matching_event_gets_enriched() {
        let (mut detector, _handoff, mut published, _metrics) =
            make_detector(vec![hostname_def("ind-1", "bad.example")]);

        detector
            .handle_event(dns_event("ev-1", "bad.example"), HashMap::new())
            .await;

        let envelope = published.recv().await.unwrap();
        assert_eq!(envelope.event.indicators.len(), 1);
        let matched = &envelope.event.indicators[0];
        assert_eq!(matched.id, "ind-1");
        assert_eq!(matched.category, "malware");
        assert_eq!(matched.indicator_type, "hostname");
        assert_eq!(matched.value, "bad.example");
    }

    #[tokio::test]
    async fn test_non_matching_event_forwarded_unenriched() {
        let (mut detector, _handoff, mut published, _metrics) =
            make_detector(vec![hostname_def("ind-1", "bad.example")]);

        detector
            .handle_event(dns_event("ev-1", "good.example"), HashMap::new())
            .await;

        let envelope = published.recv().await.unwrap();
        assert!(envelope.event.indicators.is_empty());
        assert_eq!(envelope.event.id, "ev-1");
    }

    #[tokio::test]
    async fn test_properties_pass_through_unchanged() {
        let (mut detector, _handoff, mut published, _metrics) = make_detector(vec![]);

        let properties = HashMap::from([("device".to_string(), "probe0".to_string())]);
        detector
            .handle_event(dns_event("ev-1", "whatever.example"), properties)
            .await;

        let envelope = published.recv().await.unwrap();
        assert_eq!(envelope.properties.get("device").unwrap(), "probe0");
    }

    #[tokio::test]
    async fn test_pending_engine_adopted_before_next_event() {
        // Start with an empty ruleset; the handed-off engine carries the rule.
        let (mut detector, handoff, mut published, _metrics) = make_detector(vec![]);

        detector
            .handle_event(dns_event("ev-1", "bad.example"), HashMap::new())
            .await;
        assert!(published.recv().await.unwrap().event.indicators.is_empty());

        handoff
            .send(ScanEngine::build(vec![hostname_def("ind-2", "bad.example")]))
            .await
            .unwrap();

        // The very next event is matched exclusively against the new engine.
        detector
            .handle_event(dns_event("ev-2", "bad.example"), HashMap::new())
            .await;
        let envelope = published.recv().await.unwrap();
        assert_eq!(envelope.event.indicators.len(), 1);
        assert_eq!(envelope.event.indicators[0].id, "ind-2");
    }

    #[tokio::test]
    async fn test_zero_rule_set_observes_zero_hits() {
        let (mut detector, _handoff, mut published, metrics) = make_detector(vec![]);

        detector
            .handle_event(dns_event("ev-1", "anything.example"), HashMap::new())
            .await;
        published.recv().await.unwrap();

        let out = metrics.render();
        assert!(out.contains("hits_bucket{le=\"0\"} 1"));
        assert!(out.contains("events_processed 1"));
    }

    #[tokio::test]
    async fn test_hit_metrics_recorded_per_category_and_type() {
        let (mut detector, _handoff, mut published, metrics) = make_detector(vec![
            hostname_def("ind-1", "bad.example"),
            hostname_def("ind-2", "bad.example"),
        ]);

        detector
            .handle_event(dns_event("ev-1", "bad.example"), HashMap::new())
            .await;
        assert_eq!(published.recv().await.unwrap().event.indicators.len(), 2);

        let out = metrics.render();
        assert!(out.contains("hits_on_category{category=\"malware\"} 2"));
        assert!(out.contains("hits_on_type{type=\"hostname\"} 2"));
        assert!(out.contains("hits_bucket{le=\"2\"} 1"));
    }
}
