use std::fmt;
use std::net::Ipv4Addr;

/// A checksummed echo request, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub(crate) sequence: u16,
    pub(crate) identifier: u16,
    pub(crate) timestamp: u32,
    pub(crate) buffer: Vec<u8>,
}

impl ProbeRequest {
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// Wire bytes: ICMP header, timestamp and filler.
    pub fn packet(&self) -> &[u8] {
        &self.buffer
    }

    pub fn size(&self) -> usize {
        self.buffer.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Echo reply carrying our identifier.
    Replied { latency_ms: u32 },
    /// A router on the path dropped the probe when its TTL ran out.
    TtlExpired,
}

/// An accepted ICMP message, as decoded from the received datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpReply {
    pub outcome: ProbeOutcome,
    pub identifier: u16,
    pub sequence: u16,
    /// Send timestamp echoed back; only present on echo replies.
    pub timestamp: Option<u32>,
    /// Remaining hop count from the IP header.
    pub ttl: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub sequence: u16,
    pub outcome: ProbeOutcome,
    /// Bytes received, IP header included.
    pub size: usize,
    pub source: Ipv4Addr,
    pub ttl: u8,
}

impl ProbeResult {
    /// Zero unless the probe got a real echo reply.
    pub fn latency_ms(&self) -> u32 {
        match self.outcome {
            ProbeOutcome::Replied { latency_ms } => latency_ms,
            ProbeOutcome::TtlExpired => 0,
        }
    }
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ICMP packet size {}bytes from {} TTL={} ", self.size, self.source, self.ttl)?;
        match self.outcome {
            ProbeOutcome::Replied { latency_ms } => write!(f, "latency: {}ms", latency_ms),
            ProbeOutcome::TtlExpired => write!(f, "TTL Expired."),
        }
    }
}

/// Results of a run that went through every probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub sent: u16,
    pub results: Vec<ProbeResult>,
}

impl RunSummary {
    pub fn new(sent: u16, results: Vec<ProbeResult>) -> RunSummary {
        RunSummary { sent, results }
    }

    pub fn replies(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, ProbeOutcome::Replied { .. }))
            .count()
    }

    /// Sum of latencies divided by the number of probes sent.
    ///
    /// TTL-expired probes add nothing to the sum but still count in the divisor.
    pub fn average_latency_ms(&self) -> u32 {
        let total: u64 = self.results.iter().map(|r| u64::from(r.latency_ms())).sum();
        total.checked_div(u64::from(self.sent)).unwrap_or(0) as u32
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} packets sent, average {}ms latency.", self.sent, self.average_latency_ms())
    }
}
