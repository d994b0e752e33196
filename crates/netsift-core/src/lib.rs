//! Core types for netsift.
//!
//! This crate holds the data that crosses the wire: the network event model
//! consumed and re-published by the detector, the enrichment record attached
//! to events on an indicator hit, and the daemon configuration.

pub mod config;
pub mod event;

pub use config::DetectorConfig;
pub use event::{Address, DnsMessage, DnsRecord, MatchedIndicator, NetworkEvent, SmtpData};
