//! Transport layer.
//!
//! - [`OutboundSocket`]: the shared request socket with its open / errored /
//!   replaced lifecycle.
//! - [`AgentTransport`]: the listener side, implemented by [`UdpListenerSocket`]
//!   and, for tests, by [`MockAgentTransport`].

mod outbound;

#[cfg(any(test, feature = "testing"))]
mod mock;

pub use outbound::*;

#[cfg(any(test, feature = "testing"))]
pub use mock::*;

use crate::error::{Error, Result};
use crate::util::bind_udp_socket;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// Receive buffer requested for listener sockets.
const LISTENER_RECV_BUFFER: usize = 4 * 1024 * 1024;

/// Listener-side transport abstraction.
///
/// One datagram in, zero or more datagrams out to arbitrary peers.
pub trait AgentTransport: Send + Sync {
    /// Receive data from any source.
    fn recv_from(&self, buf: &mut [u8])
    -> impl Future<Output = Result<(usize, SocketAddr)>> + Send;

    /// Send data to a specific target.
    fn send_to(&self, data: &[u8], target: SocketAddr) -> impl Future<Output = Result<()>> + Send;

    /// Local bind address.
    fn local_addr(&self) -> SocketAddr;
}

/// UDP socket bound for listening (trap receiver).
#[derive(Debug)]
pub struct UdpListenerSocket {
    socket: UdpSocket,
    local_addr: SocketAddr,
}

impl UdpListenerSocket {
    /// Bind a listening socket.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let io_err = |source| Error::Io {
            target: Some(addr),
            source,
        };
        let socket = bind_udp_socket(addr, Some(LISTENER_RECV_BUFFER)).map_err(io_err)?;
        let local_addr = socket.local_addr().map_err(io_err)?;

        tracing::debug!(snmp.local_addr = %local_addr, "listener socket bound");
        Ok(Self { socket, local_addr })
    }
}

impl AgentTransport for UdpListenerSocket {
    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        self.socket
            .recv_from(buf)
            .await
            .map_err(|source| Error::Io {
                target: None,
                source,
            })
    }

    async fn send_to(&self, data: &[u8], target: SocketAddr) -> Result<()> {
        self.socket
            .send_to(data, target)
            .await
            .map(|_| ())
            .map_err(|source| Error::Io {
                target: Some(target),
                source,
            })
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
