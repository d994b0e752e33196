//! Event transport.
//!
//! The detector talks to the messaging layer through two narrow
//! capabilities: an inbound stream of `(event, properties)` pairs and the
//! [`EventSink`] publish capability. The ZeroMQ implementations speak the
//! broker's two-frame wire format: frame 0 is the topic (used for
//! subscriber-side prefix filtering), frame 1 the JSON-encoded envelope.

use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};
use zeromq::prelude::*;
use zeromq::{PubSocket, SubSocket, ZmqMessage};

use netsift_core::NetworkEvent;

/// Wire envelope: the event plus its transport properties. Properties pass
/// through the detector unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub event: NetworkEvent,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

/// Outbound-publish capability consumed by the orchestrator.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: NetworkEvent, properties: HashMap<String, String>)
        -> Result<()>;
}

// ---------------------------------------------------------------------------
// ZeroMQ publisher
// ---------------------------------------------------------------------------

/// PUB socket publisher. Publishes each event to every configured output
/// topic.
pub struct ZmqEventPublisher {
    socket: Mutex<PubSocket>,
    topics: Vec<String>,
}

impl ZmqEventPublisher {
    /// Connect to the broker frontend.
    pub async fn connect(endpoint: &str, topics: Vec<String>) -> Result<Self> {
        let mut socket = PubSocket::new();
        info!(endpoint = %endpoint, "connecting PUB socket");
        socket.connect(endpoint).await?;
        Ok(Self {
            socket: Mutex::new(socket),
            topics,
        })
    }

    /// Bind the publisher directly (no broker); subscribers connect to us.
    pub async fn bind(endpoint: &str, topics: Vec<String>) -> Result<Self> {
        let mut socket = PubSocket::new();
        info!(endpoint = %endpoint, "binding PUB socket");
        socket.bind(endpoint).await?;
        Ok(Self {
            socket: Mutex::new(socket),
            topics,
        })
    }
}

#[async_trait]
impl EventSink for ZmqEventPublisher {
    async fn publish(
        &self,
        event: NetworkEvent,
        properties: HashMap<String, String>,
    ) -> Result<()> {
        let envelope = Envelope { event, properties };
        let payload = serde_json::to_vec(&envelope)?;

        let mut socket = self.socket.lock().await;
        for topic in &self.topics {
            let mut msg = ZmqMessage::from(topic.as_str());
            msg.push_back(payload.clone().into());
            socket.send(msg).await?;
            debug!(topic = %topic, "published event");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ZeroMQ subscriber
// ---------------------------------------------------------------------------

/// SUB socket subscriber delivering decoded envelopes.
pub struct ZmqEventSubscriber {
    socket: Mutex<SubSocket>,
}

impl ZmqEventSubscriber {
    /// Connect to the broker backend.
    pub async fn connect(endpoint: &str) -> Result<Self> {
        let mut socket = SubSocket::new();
        info!(endpoint = %endpoint, "connecting SUB socket");
        socket.connect(endpoint).await?;
        Ok(Self {
            socket: Mutex::new(socket),
        })
    }

    /// Bind the subscriber directly (no broker); publishers connect to us.
    pub async fn bind(endpoint: &str) -> Result<Self> {
        let mut socket = SubSocket::new();
        info!(endpoint = %endpoint, "binding SUB socket");
        socket.bind(endpoint).await?;
        Ok(Self {
            socket: Mutex::new(socket),
        })
    }

    /// Subscribe to events on topics with the given prefix.
    pub async fn subscribe(&self, topic_prefix: &str) -> Result<()> {
        let mut socket = self.socket.lock().await;
        socket.subscribe(topic_prefix).await?;
        info!(topic_prefix = %topic_prefix, "subscribed to topic prefix");
        Ok(())
    }

    /// Receive the next event envelope. Blocks until one arrives.
    pub async fn recv(&self) -> Result<Envelope> {
        let mut socket = self.socket.lock().await;
        let zmq_msg = socket.recv().await?;

        // Expect two frames [topic, envelope]; fall back to treating a
        // single frame as the envelope itself.
        let frames: Vec<_> = zmq_msg.iter().collect();
        let payload = if frames.len() >= 2 {
            frames[1].as_ref()
        } else if !frames.is_empty() {
            frames[0].as_ref()
        } else {
            bail!("empty ZMQ message");
        };

        let envelope: Envelope = serde_json::from_slice(payload)?;
        debug!(id = %envelope.event.id, "received event");
        Ok(envelope)
    }
}

// ---------------------------------------------------------------------------
// In-process sink
// ---------------------------------------------------------------------------

/// Channel-backed sink for in-process wiring and tests.
pub struct ChannelSink {
    tx: mpsc::Sender<Envelope>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn publish(
        &self,
        event: NetworkEvent,
        properties: HashMap<String, String>,
    ) -> Result<()> {
        self.tx
            .send(Envelope { event, properties })
            .await
            .map_err(|_| anyhow::anyhow!("event channel closed"))?;
        Ok(())
    }
}
