//! Datagram transport used by the RPC client.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::debug;

/// Errors raised by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Nothing arrived within the receive timeout.
    #[error("receive timed out after {0:?}")]
    TimedOut(Duration),

    /// Any other socket failure.
    #[error("socket error: {0}")]
    Io(#[from] io::Error),

    /// The server address could not be resolved.
    #[error("cannot resolve {0}")]
    Resolve(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }
}

/// A connectionless datagram endpoint with a bounded blocking receive.
///
/// `recv_from` must fail with [`TransportError::TimedOut`] once the current
/// receive timeout elapses without a datagram.
pub trait Transport: Send {
    /// Sends one datagram to `target`.
    fn send_to(
        &self,
        frame: &[u8],
        target: SocketAddr,
    ) -> impl Future<Output = Result<usize, TransportError>> + Send;

    /// Waits for one datagram, returning its length and sender.
    fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = Result<(usize, SocketAddr), TransportError>> + Send;

    fn set_receive_timeout(&mut self, timeout: Duration);

    fn receive_timeout(&self) -> Duration;
}

/// UDP socket transport.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    timeout: Duration,
}

impl UdpTransport {
    /// Binds to `port` on every IPv4 interface; port 0 picks a free one.
    pub async fn bind(port: u16, timeout: Duration) -> Result<Self, TransportError> {
        Self::bind_addr(SocketAddr::from(([0, 0, 0, 0], port)), timeout).await
    }

    pub async fn bind_addr(addr: SocketAddr, timeout: Duration) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr).await?;
        debug!(local = %socket.local_addr()?, "udp socket bound");
        Ok(Self { socket, timeout })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }

    /// Closes the socket.
    pub fn close(self) {
        drop(self.socket);
    }
}

impl Transport for UdpTransport {
    async fn send_to(&self, frame: &[u8], target: SocketAddr) -> Result<usize, TransportError> {
        Ok(self.socket.send_to(frame, target).await?)
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), TransportError> {
        match tokio::time::timeout(self.timeout, self.socket.recv_from(buf)).await {
            Ok(received) => Ok(received?),
            Err(_) => Err(TransportError::TimedOut(self.timeout)),
        }
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    fn receive_timeout(&self) -> Duration {
        self.timeout
    }
}

/// Resolves `host:port`, preferring IPv4 since the socket binds IPv4.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| TransportError::Resolve(format!("{host}:{port}: {e}")))?
        .collect();
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| TransportError::Resolve(format!("{host}:{port}: no addresses")))
}
