use crate::config::{ICMP_HEADER_SIZE, ICMP_MIN, IPV4_HEADER_SIZE};
use crate::error::Rejection;
use crate::messages::{IcmpReply, ProbeOutcome};

use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::EchoRequestPacket;
use pnet::packet::icmp::{IcmpPacket, IcmpTypes};
use pnet::packet::ipv4::Ipv4Packet;
use std::net::Ipv4Addr;
use tracing::debug;

/// Classifies a raw IPv4 datagram received in answer to a probe.
///
/// Echo replies must carry `expected_identifier`; their latency is measured
/// against `now_millis`. TTL-expired messages are accepted without latency.
/// Everything else is rejected.
pub fn classify(
    datagram: &[u8],
    source: Ipv4Addr,
    expected_identifier: u16,
    now_millis: u32,
) -> Result<IcmpReply, Rejection> {
    let truncated = |required: usize| Rejection::Truncated {
        from: source,
        received: datagram.len(),
        required,
    };

    let ipv4 = Ipv4Packet::new(datagram).ok_or_else(|| truncated(IPV4_HEADER_SIZE + ICMP_MIN))?;
    let header_len = ipv4.get_header_length() as usize * 4;
    if datagram.len() < header_len + ICMP_MIN {
        return Err(truncated(header_len + ICMP_MIN));
    }
    let ttl = ipv4.get_ttl();

    // the declared total length is not trusted, only what was received
    let icmp_data = &datagram[header_len..];
    let icmp_packet = IcmpPacket::new(icmp_data).ok_or_else(|| truncated(header_len + ICMP_MIN))?;
    let icmp_type = icmp_packet.get_icmp_type();
    debug!(%source, ttl, icmp_type = icmp_type.0, size = datagram.len(), "classifying datagram");

    match icmp_type {
        IcmpTypes::EchoReply => {
            let echo = EchoReplyPacket::new(icmp_data)
                .ok_or_else(|| truncated(header_len + ICMP_MIN))?;
            let identifier = echo.get_identifier();
            if identifier != expected_identifier {
                return Err(Rejection::IdentifierMismatch {
                    expected: expected_identifier,
                    actual: identifier,
                });
            }
            let timestamp = read_timestamp(&icmp_data[ICMP_MIN..])
                .ok_or_else(|| truncated(header_len + ICMP_HEADER_SIZE))?;
            Ok(IcmpReply {
                outcome: ProbeOutcome::Replied { latency_ms: now_millis.wrapping_sub(timestamp) },
                identifier,
                sequence: echo.get_sequence_number(),
                timestamp: Some(timestamp),
                ttl,
            })
        }
        IcmpTypes::TimeExceeded => {
            // Accepted whatever request it quotes; the quoted fields are only
            // reported, and stay zero when the router quoted too little.
            let (identifier, sequence) = quoted_echo(&icmp_data[ICMP_MIN..]).unwrap_or((0, 0));
            if identifier != expected_identifier {
                debug!(%source, identifier, "time exceeded quotes another identifier");
            }
            Ok(IcmpReply {
                outcome: ProbeOutcome::TtlExpired,
                identifier,
                sequence,
                timestamp: None,
                ttl,
            })
        }
        IcmpTypes::DestinationUnreachable => Err(Rejection::Unreachable { from: source }),
        other => Err(Rejection::UnknownType { icmp_type: other.0 }),
    }
}

/// Identifier and sequence of the echo request quoted in an ICMP error:
/// the original IP header followed by the first 8 bytes of its payload.
fn quoted_echo(quoted: &[u8]) -> Option<(u16, u16)> {
    let original = Ipv4Packet::new(quoted)?;
    let offset = original.get_header_length() as usize * 4;
    let echo = EchoRequestPacket::new(quoted.get(offset..)?)?;
    Some((echo.get_identifier(), echo.get_sequence_number()))
}

fn read_timestamp(payload: &[u8]) -> Option<u32> {
    let bytes: [u8; 4] = payload.get(..4)?.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}
