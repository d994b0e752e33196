//! Token and indicator type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TokenKind
// ---------------------------------------------------------------------------

/// The closed vocabulary of token labels.
///
/// Side-qualified kinds (`*.src`, `*.dest`) accompany their generic kind so
/// indicators can match either any occurrence or a specific direction.
/// `End` is the reserved end-of-stream sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    #[serde(rename = "ipv4")]
    Ipv4,
    #[serde(rename = "ipv4.src")]
    Ipv4Src,
    #[serde(rename = "ipv4.dest")]
    Ipv4Dest,
    #[serde(rename = "ipv6")]
    Ipv6,
    #[serde(rename = "ipv6.src")]
    Ipv6Src,
    #[serde(rename = "ipv6.dest")]
    Ipv6Dest,
    #[serde(rename = "tcp")]
    Tcp,
    #[serde(rename = "tcp.src")]
    TcpSrc,
    #[serde(rename = "tcp.dest")]
    TcpDest,
    #[serde(rename = "udp")]
    Udp,
    #[serde(rename = "udp.src")]
    UdpSrc,
    #[serde(rename = "udp.dest")]
    UdpDest,
    #[serde(rename = "hostname")]
    Hostname,
    #[serde(rename = "url")]
    Url,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "end")]
    End,
}

impl TokenKind {
    /// The wire label for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ipv4 => "ipv4",
            Self::Ipv4Src => "ipv4.src",
            Self::Ipv4Dest => "ipv4.dest",
            Self::Ipv6 => "ipv6",
            Self::Ipv6Src => "ipv6.src",
            Self::Ipv6Dest => "ipv6.dest",
            Self::Tcp => "tcp",
            Self::TcpSrc => "tcp.src",
            Self::TcpDest => "tcp.dest",
            Self::Udp => "udp",
            Self::UdpSrc => "udp.src",
            Self::UdpDest => "udp.dest",
            Self::Hostname => "hostname",
            Self::Url => "url",
            Self::Email => "email",
            Self::End => "end",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// A labeled unit of searchable text derived from one event field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// The end-of-stream sentinel. Must be fed after the last token of every
    /// stream so end-dependent rules (negations) can finalize.
    pub fn end() -> Self {
        Self {
            kind: TokenKind::End,
            value: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Indicator descriptors
// ---------------------------------------------------------------------------

/// Descriptive metadata for one indicator. Loaded verbatim from the
/// indicator file and immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorDescriptor {
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub value: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    /// Match probability in the range 0.0 - 1.0.
    #[serde(default = "default_probability")]
    pub probability: f64,
}

fn default_probability() -> f64 {
    1.0
}

/// Boolean pattern expression over token terms.
///
/// A leaf term is satisfied when the stream contained a token of the given
/// kind and value. `Not` sub-expressions are only decidable once the stream
/// is complete, which is what makes the end-of-stream sentinel load-bearing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pattern {
    Match {
        #[serde(rename = "type")]
        kind: TokenKind,
        value: String,
    },
    And {
        and: Vec<Pattern>,
    },
    Or {
        or: Vec<Pattern>,
    },
    Not {
        not: Box<Pattern>,
    },
}

/// One indicator definition: identity, metadata, and an optional compound
/// pattern. When `pattern` is absent the indicator matches on the
/// descriptor's own type/value pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorDef {
    pub id: String,
    pub descriptor: IndicatorDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,
}

/// JSON file format for indicator sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorFile {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    pub indicators: Vec<IndicatorDef>,
}

// ---------------------------------------------------------------------------
// Hit
// ---------------------------------------------------------------------------

/// Result of one indicator matching within one event's token stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub id: String,
    pub descriptor: IndicatorDescriptor,
}
