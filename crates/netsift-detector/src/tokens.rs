//! Token extraction.
//!
//! Pure and total: an event with none of the relevant fields yields an empty
//! stream, never an error. The stream order is fixed -- addresses, then DNS,
//! then URL, then email -- and within addresses, all source-side entries
//! before all destination-side entries, each in event order. Downstream rule
//! types depend on this order being reproducible.

use netsift_core::{Address, NetworkEvent};
use netsift_intel::{Token, TokenKind};

#[derive(Clone, Copy)]
enum Side {
    Src,
    Dest,
}

/// Derive the ordered token stream for one event.
pub fn extract_tokens(event: &NetworkEvent) -> Vec<Token> {
    let mut tokens = Vec::new();
    extract_addresses(event, &mut tokens);
    extract_dns(event, &mut tokens);
    extract_url(event, &mut tokens);
    extract_email(event, &mut tokens);
    tokens
}

fn extract_addresses(event: &NetworkEvent, tokens: &mut Vec<Token>) {
    for addr in &event.src {
        push_endpoint(addr, Side::Src, tokens);
    }
    for addr in &event.dest {
        push_endpoint(addr, Side::Dest, tokens);
    }
}

/// Each endpoint entry emits its generic token first, then the
/// side-qualified one.
fn push_endpoint(addr: &Address, side: Side, tokens: &mut Vec<Token>) {
    let (generic, qualified, value) = match (addr, side) {
        (Address::Ipv4(ip), Side::Src) => (TokenKind::Ipv4, TokenKind::Ipv4Src, ip.to_string()),
        (Address::Ipv4(ip), Side::Dest) => (TokenKind::Ipv4, TokenKind::Ipv4Dest, ip.to_string()),
        (Address::Ipv6(ip), Side::Src) => (TokenKind::Ipv6, TokenKind::Ipv6Src, ip.to_string()),
        (Address::Ipv6(ip), Side::Dest) => (TokenKind::Ipv6, TokenKind::Ipv6Dest, ip.to_string()),
        (Address::Tcp(port), Side::Src) => (TokenKind::Tcp, TokenKind::TcpSrc, port.to_string()),
        (Address::Tcp(port), Side::Dest) => (TokenKind::Tcp, TokenKind::TcpDest, port.to_string()),
        (Address::Udp(port), Side::Src) => (TokenKind::Udp, TokenKind::UdpSrc, port.to_string()),
        (Address::Udp(port), Side::Dest) => (TokenKind::Udp, TokenKind::UdpDest, port.to_string()),
    };
    tokens.push(Token::new(generic, value.clone()));
    tokens.push(Token::new(qualified, value));
}

fn extract_dns(event: &NetworkEvent, tokens: &mut Vec<Token>) {
    let Some(dns) = &event.dns else {
        return;
    };
    for record in &dns.query {
        tokens.push(Token::new(TokenKind::Hostname, record.name.clone()));
    }
    for record in &dns.answer {
        tokens.push(Token::new(TokenKind::Hostname, record.name.clone()));
    }
}

fn extract_url(event: &NetworkEvent, tokens: &mut Vec<Token>) {
    if let Some(url) = &event.url {
        if !url.is_empty() {
            tokens.push(Token::new(TokenKind::Url, url.clone()));
        }
    }
}

fn extract_email(event: &NetworkEvent, tokens: &mut Vec<Token>) {
    let Some(smtp) = &event.smtp else {
        return;
    };
    if !smtp.from.is_empty() {
        tokens.push(Token::new(TokenKind::Email, smtp.from.clone()));
    }
    for recipient in &smtp.to {
        tokens.push(Token::new(TokenKind::Email, recipient.clone()));
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use netsift_core::{DnsMessage, DnsRecord, SmtpData};

    use super::*;

    fn token(kind: TokenKind, value: &str) -> Token {
        Token::new(kind, value)
    }

    #[test]
    fn test_empty_event_yields_empty_stream() {
        let event = NetworkEvent::default();
        assert!(extract_tokens(&event).is_empty());
    }

    #[test]
    fn test_ipv4_addresses_in_order() {
        let event = NetworkEvent {
            src: vec![Address::Ipv4(Ipv4Addr::new(10, 0, 0, 1))],
            dest: vec![Address::Ipv4(Ipv4Addr::new(10, 0, 0, 2))],
            ..Default::default()
        };
        assert_eq!(
            extract_tokens(&event),
            vec![
                token(TokenKind::Ipv4, "10.0.0.1"),
                token(TokenKind::Ipv4Src, "10.0.0.1"),
                token(TokenKind::Ipv4, "10.0.0.2"),
                token(TokenKind::Ipv4Dest, "10.0.0.2"),
            ]
        );
    }

    #[test]
    fn test_ipv6_and_port_rendering() {
        let event = NetworkEvent {
            src: vec![
                Address::Ipv6("2001:db8::1".parse::<Ipv6Addr>().unwrap()),
                Address::Tcp(50123),
            ],
            dest: vec![Address::Udp(53)],
            ..Default::default()
        };
        assert_eq!(
            extract_tokens(&event),
            vec![
                token(TokenKind::Ipv6, "2001:db8::1"),
                token(TokenKind::Ipv6Src, "2001:db8::1"),
                token(TokenKind::Tcp, "50123"),
                token(TokenKind::TcpSrc, "50123"),
                token(TokenKind::Udp, "53"),
                token(TokenKind::UdpDest, "53"),
            ]
        );
    }

    #[test]
    fn test_dns_queries_before_answers() {
        let event = NetworkEvent {
            dns: Some(DnsMessage {
                query: vec![DnsRecord {
                    name: "example.com".into(),
                    record_type: Some("A".into()),
                }],
                answer: vec![DnsRecord {
                    name: "example.com".into(),
                    record_type: Some("A".into()),
                }],
            }),
            ..Default::default()
        };
        assert_eq!(
            extract_tokens(&event),
            vec![
                token(TokenKind::Hostname, "example.com"),
                token(TokenKind::Hostname, "example.com"),
            ]
        );
    }

    #[test]
    fn test_empty_url_contributes_no_token() {
        let event = NetworkEvent {
            url: Some(String::new()),
            ..Default::default()
        };
        assert!(extract_tokens(&event).is_empty());
    }

    #[test]
    fn test_email_from_then_recipients() {
        let event = NetworkEvent {
            smtp: Some(SmtpData {
                from: "sender@example.com".into(),
                to: vec!["a@example.com".into(), "b@example.com".into()],
            }),
            ..Default::default()
        };
        assert_eq!(
            extract_tokens(&event),
            vec![
                token(TokenKind::Email, "sender@example.com"),
                token(TokenKind::Email, "a@example.com"),
                token(TokenKind::Email, "b@example.com"),
            ]
        );
    }

    #[test]
    fn test_empty_from_is_skipped() {
        let event = NetworkEvent {
            smtp: Some(SmtpData {
                from: String::new(),
                to: vec!["a@example.com".into()],
            }),
            ..Default::default()
        };
        assert_eq!(
            extract_tokens(&event),
            vec![token(TokenKind::Email, "a@example.com")]
        );
    }

    #[test]
    fn test_full_stream_order_addresses_dns_url_email() {
        let event = NetworkEvent {
            src: vec![Address::Ipv4(Ipv4Addr::new(192, 168, 0, 1))],
            dest: vec![],
            dns: Some(DnsMessage {
                query: vec![DnsRecord {
                    name: "bad.example".into(),
                    record_type: None,
                }],
                answer: vec![],
            }),
            url: Some("http://bad.example/x".into()),
            smtp: Some(SmtpData {
                from: "sender@example.com".into(),
                to: vec![],
            }),
            ..Default::default()
        };
        assert_eq!(
            extract_tokens(&event),
            vec![
                token(TokenKind::Ipv4, "192.168.0.1"),
                token(TokenKind::Ipv4Src, "192.168.0.1"),
                token(TokenKind::Hostname, "bad.example"),
                token(TokenKind::Url, "http://bad.example/x"),
                token(TokenKind::Email, "sender@example.com"),
            ]
        );
    }
}
