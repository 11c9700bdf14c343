use crate::checksum::checksum;
use crate::clock::Clock;
use crate::config::IPV4_HEADER_SIZE;
use crate::error::{ProbeError, Result};
use crate::messages::ProbeRequest;
use crate::packet::build_probe;
use crate::prober::Terminator;
use crate::transport::Transport;

use pnet::packet::MutablePacket;
use pnet::packet::icmp::{IcmpTypes, MutableIcmpPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::MutableIpv4Packet;
use std::collections::VecDeque;
use std::io;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Wraps an ICMP message in an IPv4 header of `header_words` 32-bit words.
pub fn ipv4_datagram(icmp: &[u8], ttl: u8, header_words: u8) -> Vec<u8> {
    let header_len = header_words as usize * 4;
    let mut buffer = vec![0u8; header_len + icmp.len()];
    {
        let mut ipv4 = MutableIpv4Packet::new(&mut buffer).unwrap();
        ipv4.set_version(4);
        ipv4.set_header_length(header_words);
        ipv4.set_total_length((header_len + icmp.len()) as u16);
        ipv4.set_ttl(ttl);
        ipv4.set_next_level_protocol(IpNextHeaderProtocols::Icmp);
        ipv4.set_source(Ipv4Addr::new(203, 0, 113, 5));
        ipv4.set_destination(Ipv4Addr::new(192, 168, 1, 2));
    }
    buffer[header_len..].copy_from_slice(icmp);
    buffer
}

/// Echo reply of `size` bytes echoing the given header fields and timestamp.
pub fn echo_reply(identifier: u16, sequence: u16, timestamp: u32, size: usize) -> Vec<u8> {
    let request = build_probe(sequence, identifier, size, timestamp);
    into_echo_reply(request.packet().to_vec())
}

fn into_echo_reply(mut icmp: Vec<u8>) -> Vec<u8> {
    {
        let mut packet = MutableIcmpPacket::new(&mut icmp).unwrap();
        packet.set_icmp_type(IcmpTypes::EchoReply);
        packet.set_checksum(0);
    }
    let sum = checksum(&icmp);
    icmp[2..4].copy_from_slice(&sum.to_be_bytes());
    icmp
}

/// ICMP error message (time exceeded, unreachable, ...) quoting an original
/// IP header and the first 8 bytes of the echo request.
pub fn icmp_error(icmp_type: u8, code: u8) -> Vec<u8> {
    icmp_error_quoting(icmp_type, code, 0x1d1d, 0)
}

pub fn icmp_error_quoting(icmp_type: u8, code: u8, identifier: u16, sequence: u16) -> Vec<u8> {
    let mut icmp = vec![0u8; 8 + IPV4_HEADER_SIZE + 8];
    icmp[0] = icmp_type;
    icmp[1] = code;
    let request = build_probe(sequence, identifier, 8, 0);
    let quoted = ipv4_datagram(&request.packet()[..8], 1, 5);
    icmp[8..].copy_from_slice(&quoted);
    let sum = checksum(&icmp);
    icmp[2..4].copy_from_slice(&sum.to_be_bytes());
    icmp
}

/// Clock the tests move forward by hand. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn new(start: u32) -> ManualClock {
        ManualClock { now: Arc::new(AtomicU32::new(start)) }
    }

    pub fn advance(&self, millis: u32) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u32 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct RecordingTerminator {
    fired: AtomicUsize,
}

impl RecordingTerminator {
    pub fn fired(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Terminator for RecordingTerminator {
    fn terminate(&self) {
        self.fired.fetch_add(1, Ordering::SeqCst);
    }
}

/// What the scripted network does with the next receive call.
pub enum Scripted {
    /// Echo the last request back after `latency_ms` on the shared clock.
    Echo { latency_ms: u32 },
    /// Echo the last request back with someone else's identifier.
    ForeignEcho,
    /// Sleep in real time, then echo.
    Stall(Duration),
    /// Deliver this ICMP message as is.
    Datagram(Vec<u8>),
    Fail,
}

/// How a scripted send goes wrong.
pub enum SendFailure {
    Error,
    /// Only this many bytes are accepted.
    Short(usize),
}

pub struct ScriptedTransport {
    clock: ManualClock,
    script: VecDeque<Scripted>,
    sent: Vec<ProbeRequest>,
    receives: usize,
    send_failure: Option<(u16, SendFailure)>,
    destination: Option<Ipv4Addr>,
}

impl ScriptedTransport {
    pub fn new(
        clock: ManualClock,
        script: impl IntoIterator<Item = Scripted>,
    ) -> ScriptedTransport {
        ScriptedTransport {
            clock,
            script: script.into_iter().collect(),
            sent: Vec::new(),
            receives: 0,
            send_failure: None,
            destination: None,
        }
    }

    /// Makes the send of `sequence` fail.
    pub fn fail_send(mut self, sequence: u16, failure: SendFailure) -> ScriptedTransport {
        self.send_failure = Some((sequence, failure));
        self
    }

    pub fn receives(&self) -> usize {
        self.receives
    }

    pub fn sent_sequences(&self) -> Vec<u16> {
        self.sent.iter().map(|p| p.sequence()).collect()
    }

    fn last_request(&self) -> Vec<u8> {
        self.sent.last().map(|p| p.packet().to_vec()).unwrap_or_default()
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, destination: Ipv4Addr, probe: &ProbeRequest) -> Result<()> {
        self.destination = Some(destination);
        self.sent.push(probe.clone());
        match &self.send_failure {
            Some((sequence, SendFailure::Error)) if *sequence == probe.sequence() => {
                Err(ProbeError::Send(io::Error::from(io::ErrorKind::PermissionDenied)))
            }
            Some((sequence, SendFailure::Short(sent))) if *sequence == probe.sequence() => {
                Err(ProbeError::ShortWrite { sent: *sent, expected: probe.size() })
            }
            _ => Ok(()),
        }
    }

    fn receive(&mut self, buffer: &mut [u8]) -> Result<(usize, Ipv4Addr)> {
        self.receives += 1;
        let icmp = match self.script.pop_front() {
            Some(Scripted::Echo { latency_ms }) => {
                self.clock.advance(latency_ms);
                into_echo_reply(self.last_request())
            }
            Some(Scripted::ForeignEcho) => {
                let mut request = self.last_request();
                let mut packet = MutableIcmpPacket::new(&mut request).unwrap();
                let payload = packet.payload_mut();
                let identifier = u16::from_be_bytes([payload[0], payload[1]]).wrapping_add(1);
                payload[..2].copy_from_slice(&identifier.to_be_bytes());
                into_echo_reply(request)
            }
            Some(Scripted::Stall(delay)) => {
                thread::sleep(delay);
                into_echo_reply(self.last_request())
            }
            Some(Scripted::Datagram(icmp)) => icmp,
            Some(Scripted::Fail) | None => {
                return Err(ProbeError::Receive(io::Error::other("network is down")));
            }
        };
        let datagram = ipv4_datagram(&icmp, 57, 5);
        buffer[..datagram.len()].copy_from_slice(&datagram);
        Ok((datagram.len(), self.destination.unwrap_or(Ipv4Addr::UNSPECIFIED)))
    }
}
