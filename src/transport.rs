//! Datagram transport abstraction.
//!
//! [`Transport`] is the only I/O seam of the engine: send one datagram to the
//! fixed peer, or wait a bounded time for one from it.  [`UdpTransport`] is a
//! thin wrapper around `tokio::net::UdpSocket`; all protocol logic lives
//! elsewhere.  Tests substitute scripted transports, and
//! [`crate::simulator::Simulator`] wraps any transport with faults.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{lookup_host, UdpSocket};
use tokio::time::{timeout_at, Instant};

use crate::error::SessionError;

/// Maximum UDP payload size (theoretical limit; frames are much smaller).
pub const MAX_DATAGRAM: usize = 65_535;

/// Unreliable datagram channel to a single peer.
///
/// Implementations report only fatal failures as `Err`; a receive timeout is
/// `Ok(None)` and a lost datagram is indistinguishable from one never sent.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Send one datagram to the peer.
    async fn send(&mut self, datagram: &[u8]) -> io::Result<()>;

    /// Wait up to `wait` for the next datagram from the peer.
    async fn recv_timeout(&mut self, wait: Duration) -> io::Result<Option<Vec<u8>>>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    async fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        (**self).send(datagram).await
    }

    async fn recv_timeout(&mut self, wait: Duration) -> io::Result<Option<Vec<u8>>> {
        (**self).recv_timeout(wait).await
    }
}

/// Returns true if the error is likely transient (the datagram is simply lost).
pub(crate) fn is_transient_io_error(e: &io::Error) -> bool {
    use io::ErrorKind;
    matches!(
        e.kind(),
        ErrorKind::WouldBlock
            | ErrorKind::Interrupted
            | ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
    )
}

// ---------------------------------------------------------------------------
// UdpTransport
// ---------------------------------------------------------------------------

/// A UDP endpoint bound to a fresh ephemeral port, talking to one peer.
///
/// The socket is unconnected; datagrams from any other address are dropped.
/// Dropping the transport releases the port.
#[derive(Debug)]
pub struct UdpTransport {
    /// Address this socket is bound to (filled in after OS assigns the port).
    pub local_addr: SocketAddr,
    peer: SocketAddr,
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl UdpTransport {
    /// Resolve `host:port` and bind an ephemeral socket of the same family.
    ///
    /// IPv4 results are preferred so `localhost` reaches receivers that bind
    /// `127.0.0.1`.
    pub async fn open(host: &str, port: u16) -> Result<Self, SessionError> {
        let addrs: Vec<SocketAddr> = lookup_host((host, port)).await?.collect();
        let peer = addrs
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| SessionError::NoPeerAddress(format!("{host}:{port}")))?;
        Ok(Self::bind_for(peer).await?)
    }

    /// Bind an ephemeral socket for talking to `peer`.
    pub async fn bind_for(peer: SocketAddr) -> io::Result<Self> {
        let local: SocketAddr = if peer.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        let local_addr = socket.local_addr()?;
        log::debug!("[udp] bound {local_addr} for peer {peer}");
        Ok(Self {
            local_addr,
            peer,
            socket,
            buf: vec![0u8; MAX_DATAGRAM],
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Transport for UdpTransport {
    async fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        match self.socket.send_to(datagram, self.peer).await {
            Ok(_) => Ok(()),
            Err(e) if is_transient_io_error(&e) => {
                log::debug!("[udp] send to {} failed transiently: {e}", self.peer);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn recv_timeout(&mut self, wait: Duration) -> io::Result<Option<Vec<u8>>> {
        let deadline = Instant::now() + wait;
        loop {
            match timeout_at(deadline, self.socket.recv_from(&mut self.buf)).await {
                Err(_elapsed) => return Ok(None),
                Ok(Ok((n, from))) if from == self.peer => {
                    return Ok(Some(self.buf[..n].to_vec()));
                }
                Ok(Ok((_, from))) => {
                    log::warn!("[udp] dropping datagram from unexpected address {from}");
                }
                Ok(Err(e)) if is_transient_io_error(&e) => {
                    log::debug!("[udp] transient receive error: {e}");
                }
                Ok(Err(e)) => return Err(e),
            }
        }
    }
}
