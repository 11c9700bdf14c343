use crate::checksum::checksum;
use crate::config::{ICMP_HEADER_SIZE, MAX_PACKET_SIZE};
use crate::messages::ProbeRequest;

use pnet::packet::Packet;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{IcmpCode, IcmpTypes};

/// Padding written after the timestamp, repeated to fill the request.
const FILLER: [u8; 4] = [0xaa; 4];

/// Identifier carried by every probe of this process.
pub fn process_identifier() -> u16 {
    std::process::id() as u16
}

/// Builds a checksummed echo request of `size` bytes.
///
/// `size` is clamped to `ICMP_HEADER_SIZE..=MAX_PACKET_SIZE`. The timestamp is
/// stored big-endian right after the 8-byte echo header and the rest is filler.
pub fn build_probe(sequence: u16, identifier: u16, size: usize, timestamp: u32) -> ProbeRequest {
    let size = size.clamp(ICMP_HEADER_SIZE, MAX_PACKET_SIZE);

    let mut payload = Vec::with_capacity(size - MutableEchoRequestPacket::minimum_packet_size());
    payload.extend_from_slice(&timestamp.to_be_bytes());
    payload.extend(FILLER.iter().cycle().take(size - ICMP_HEADER_SIZE));

    let mut buffer = vec![0u8; size];
    {
        let mut echo_packet = MutableEchoRequestPacket::new(&mut buffer)
            .expect("buffer is at least the echo header size");
        echo_packet.set_icmp_type(IcmpTypes::EchoRequest);
        echo_packet.set_icmp_code(IcmpCode::new(0));
        echo_packet.set_checksum(0);
        echo_packet.set_identifier(identifier);
        echo_packet.set_sequence_number(sequence);
        echo_packet.set_payload(&payload);

        let echo_checksum = checksum(echo_packet.packet());
        echo_packet.set_checksum(echo_checksum);
    }

    ProbeRequest { sequence, identifier, timestamp, buffer }
}
