use std::time::Duration;

/// Upper bound for the echo request, header included.
pub const MAX_PACKET_SIZE: usize = 1024;
/// ICMP echo header (8 bytes) followed by the 4-byte send timestamp.
pub const ICMP_HEADER_SIZE: usize = 12;
/// Smallest ICMP message the parser will look at.
pub const ICMP_MIN: usize = 8;
pub const IPV4_HEADER_SIZE: usize = 20;
/// Large enough for a full-sized reply plus the IP header that precedes it.
pub const RECEIVE_BUFFER_SIZE: usize = MAX_PACKET_SIZE + IPV4_HEADER_SIZE;

pub const DEFAULT_PROBE_COUNT: u16 = 4;
pub const DEFAULT_PAYLOAD_SIZE: usize = 32;
pub const DEFAULT_TTL: u8 = 128;

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Outbound hop limit set on the socket.
    pub ttl: u8,
    pub probe_count: u16,
    /// Total echo request size, clamped to `ICMP_HEADER_SIZE..=MAX_PACKET_SIZE`.
    pub payload_size: usize,
    /// How long a single probe waits for its reply.
    pub timeout: Duration,
    /// Pause after each answered probe.
    pub interval: Duration,
}

impl ProbeConfig {
    pub fn new(ttl: u8) -> ProbeConfig {
        ProbeConfig { ttl, ..Default::default() }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            ttl: DEFAULT_TTL,
            probe_count: DEFAULT_PROBE_COUNT,
            payload_size: DEFAULT_PAYLOAD_SIZE,
            timeout: Duration::from_millis(1000),
            interval: Duration::from_millis(1000),
        }
    }
}
