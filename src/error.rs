use std::io;
use std::net::Ipv4Addr;
use thiserror::Error;

/// Why a received datagram could not be used as the answer to a probe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Not enough bytes received from {from}.")]
    Truncated {
        from: Ipv4Addr,
        received: usize,
        required: usize,
    },

    #[error("Packet id mismatch.")]
    IdentifierMismatch { expected: u16, actual: u16 },

    #[error("Destination unreachable!")]
    Unreachable { from: Ipv4Addr },

    #[error("Unknown ICMP type")]
    UnknownType { icmp_type: u8 },
}

/// Every failure is fatal to the run; the variant decides the exit code.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Error creating socket: {0}")]
    SocketCreation(#[source] io::Error),

    #[error("Error setting TTL: {0}")]
    SetTtl(#[source] io::Error),

    #[error("Error resolving {hostname}")]
    Resolution {
        hostname: String,
        #[source]
        source: io::Error,
    },

    #[error("Error resolving {hostname}")]
    NoIpv4Address { hostname: String },

    #[error("Error sending ICMP request: {0}")]
    Send(#[source] io::Error),

    #[error("was only able to send {sent} of {expected} bytes")]
    ShortWrite { sent: usize, expected: usize },

    #[error("Error receiving IP packet: {0}")]
    Receive(#[source] io::Error),

    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("Request timed out")]
    Timeout,
}

impl ProbeError {
    /// Process exit status reported for this failure.
    ///
    /// A timeout ends the run with a success status, as the reference tool does.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::SocketCreation(_)
            | Self::SetTtl(_)
            | Self::Resolution { .. }
            | Self::NoIpv4Address { .. } => 3,
            Self::Send(_) | Self::ShortWrite { .. } => 4,
            Self::Receive(_) => 5,
            Self::Rejected(_) => 6,
            Self::Timeout => 0,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;
