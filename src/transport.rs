use crate::error::{ProbeError, Result};
use crate::messages::ProbeRequest;

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::mem::MaybeUninit;
use std::net::{Ipv4Addr, SocketAddrV4};
use tracing::debug;

/// Sends probes and hands back raw IPv4 datagrams.
///
/// `receive` blocks without a timeout; the prober owns that concern.
pub trait Transport {
    fn send(&mut self, destination: Ipv4Addr, probe: &ProbeRequest) -> Result<()>;

    /// Fills `buffer` with one datagram, IP header included, and returns its
    /// size and source address.
    fn receive(&mut self, buffer: &mut [u8]) -> Result<(usize, Ipv4Addr)>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, destination: Ipv4Addr, probe: &ProbeRequest) -> Result<()> {
        (**self).send(destination, probe)
    }

    fn receive(&mut self, buffer: &mut [u8]) -> Result<(usize, Ipv4Addr)> {
        (**self).receive(buffer)
    }
}

/// Raw ICMPv4 socket. Usually needs elevated privileges.
pub struct IcmpSocket {
    socket: Socket,
}

impl IcmpSocket {
    pub fn open(ttl: u8) -> Result<IcmpSocket> {
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))
            .map_err(ProbeError::SocketCreation)?;
        socket.set_ttl(u32::from(ttl)).map_err(ProbeError::SetTtl)?;
        debug!(ttl, "raw ICMP socket opened");
        Ok(IcmpSocket { socket })
    }
}

impl Transport for IcmpSocket {
    fn send(&mut self, destination: Ipv4Addr, probe: &ProbeRequest) -> Result<()> {
        let address = SockAddr::from(SocketAddrV4::new(destination, 0));
        let sent = self
            .socket
            .send_to(probe.packet(), &address)
            .map_err(ProbeError::Send)?;
        check_sent(sent, probe.size())?;
        debug!(
            %destination,
            identifier = probe.identifier(),
            sequence = probe.sequence(),
            timestamp = probe.timestamp(),
            bytes = sent,
            "echo request sent"
        );
        Ok(())
    }

    fn receive(&mut self, buffer: &mut [u8]) -> Result<(usize, Ipv4Addr)> {
        // SAFETY: recv_from only ever writes initialised bytes into the slice.
        let uninit = unsafe { &mut *(buffer as *mut [u8] as *mut [MaybeUninit<u8>]) };
        let (size, address) = self.socket.recv_from(uninit).map_err(ProbeError::Receive)?;
        let source = address
            .as_socket_ipv4()
            .map(|a| *a.ip())
            .unwrap_or(Ipv4Addr::UNSPECIFIED);
        debug!(%source, bytes = size, "datagram received");
        Ok((size, source))
    }
}

/// A partial send is a failure; it is never retried.
fn check_sent(sent: usize, expected: usize) -> Result<()> {
    if sent < expected {
        return Err(ProbeError::ShortWrite { sent, expected });
    }
    Ok(())
}
