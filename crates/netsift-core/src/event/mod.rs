//! Network event model.
//!
//! Events arrive from upstream capture stages as JSON. The detector only ever
//! appends to the `indicators` list; every other field passes through
//! unchanged.

use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One endpoint attribute of an event. Source and destination sides are each
/// described by a list of these, typically one network-layer entry and one
/// transport-layer entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol", content = "address", rename_all = "lowercase")]
pub enum Address {
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Tcp(u16),
    Udp(u16),
}

/// A single DNS query or answer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub name: String,
    /// Record type mnemonic (e.g. `"A"`, `"AAAA"`), when the capture stage
    /// provides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
}

/// DNS message payload carried by DNS events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsMessage {
    #[serde(default)]
    pub query: Vec<DnsRecord>,
    #[serde(default)]
    pub answer: Vec<DnsRecord>,
}

/// Mail envelope data carried by SMTP events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpData {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
}

/// Enrichment record appended to an event for each indicator hit.
///
/// Carries the subset of descriptor fields downstream consumers need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedIndicator {
    pub id: String,
    #[serde(rename = "type")]
    pub indicator_type: String,
    pub value: String,
    pub category: String,
    pub source: String,
    pub author: String,
    pub description: String,
    pub probability: f64,
}

/// A structured network-telemetry event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkEvent {
    /// Unique event identifier assigned by the capture stage.
    #[serde(default)]
    pub id: String,

    /// When the event was observed.
    #[serde(default = "default_time")]
    pub time: DateTime<Utc>,

    /// Capture device name.
    #[serde(default)]
    pub device: String,

    /// Protocol action (e.g. `"dns_message"`, `"http_request"`).
    #[serde(default)]
    pub action: String,

    /// Source-side endpoint attributes, outermost protocol first.
    #[serde(default)]
    pub src: Vec<Address>,

    /// Destination-side endpoint attributes, outermost protocol first.
    #[serde(default)]
    pub dest: Vec<Address>,

    /// Request URL, for HTTP events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// DNS message payload, for DNS events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsMessage>,

    /// Mail envelope, for SMTP events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp: Option<SmtpData>,

    /// Indicator hits attached by the detector. Accumulates within a single
    /// event only.
    #[serde(default)]
    pub indicators: Vec<MatchedIndicator>,
}

fn default_time() -> DateTime<Utc> {
    Utc::now()
}

impl Default for NetworkEvent {
    fn default() -> Self {
        Self {
            id: String::new(),
            time: default_time(),
            device: String::new(),
            action: String::new(),
            src: Vec::new(),
            dest: Vec::new(),
            url: None,
            dns: None,
            smtp: None,
            indicators: Vec::new(),
        }
    }
}
