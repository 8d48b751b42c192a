//! Shared outbound request socket.
//!
//! Every [`Manager`](crate::manager::Manager) sends through one UDP socket
//! bound to an ephemeral port. The socket is opened on first use and
//! replaced whenever it turns out to be in an error state:
//!
//! ```text
//! Uninitialized --acquire--> Open --(SO_ERROR | mark_errored)--> Errored
//!                             ^                                      |
//!                             +--------------acquire-----------------+
//! ```
//!
//! Replacement is the only recovery; there is no retry or backoff here.

use crate::error::{Error, Result};
use crate::util::bind_udp_socket;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;

/// Observable lifecycle state of an [`OutboundSocket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    /// No socket opened yet.
    Uninitialized,
    /// A socket is open and was healthy when last checked.
    Open,
    /// The socket failed and will be replaced by the next `acquire`.
    Errored,
}

enum Slot {
    Uninitialized,
    Open(Arc<UdpSocket>),
    Errored,
}

impl Slot {
    fn state(&self) -> SocketState {
        match self {
            Slot::Uninitialized => SocketState::Uninitialized,
            Slot::Open(_) => SocketState::Open,
            Slot::Errored => SocketState::Errored,
        }
    }
}

/// Lazily opened, self-healing UDP socket shared by all managers.
///
/// Share it as `Arc<OutboundSocket>`; access to the slot is serialized by an
/// async mutex so `acquire` never opens two sockets at once.
pub struct OutboundSocket {
    bind_addr: SocketAddr,
    slot: Mutex<Slot>,
}

impl OutboundSocket {
    /// Outbound socket bound to `0.0.0.0:0`.
    pub fn new() -> Self {
        Self::with_bind_addr(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
    }

    /// Outbound socket bound to a specific local address.
    pub fn with_bind_addr(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            slot: Mutex::new(Slot::Uninitialized),
        }
    }

    /// Return a ready socket, opening or replacing it as needed.
    ///
    /// A socket with a pending `SO_ERROR` is dropped and a fresh one bound.
    /// Only a failure to bind the replacement is reported.
    pub async fn acquire(&self) -> Result<Arc<UdpSocket>> {
        let mut slot = self.slot.lock().await;

        if let Slot::Open(socket) = &*slot {
            match socket.take_error() {
                Ok(None) => return Ok(socket.clone()),
                Ok(Some(err)) | Err(err) => {
                    tracing::warn!(
                        snmp.local_addr = ?socket.local_addr().ok(),
                        error = %err,
                        "outbound socket in error state, replacing"
                    );
                    *slot = Slot::Errored;
                }
            }
        }

        if matches!(*slot, Slot::Errored) {
            tracing::debug!("reopening errored outbound socket");
        }

        let socket = bind_udp_socket(self.bind_addr, None).map_err(|source| Error::Io {
            target: None,
            source,
        })?;
        let socket = Arc::new(socket);
        tracing::debug!(
            snmp.local_addr = ?socket.local_addr().ok(),
            "outbound socket opened"
        );
        *slot = Slot::Open(socket.clone());
        Ok(socket)
    }

    /// Report that `socket` failed a send.
    ///
    /// Ignored when `socket` has already been replaced.
    pub async fn mark_errored(&self, socket: &Arc<UdpSocket>) {
        let mut slot = self.slot.lock().await;
        if let Slot::Open(current) = &*slot
            && Arc::ptr_eq(current, socket)
        {
            tracing::debug!("outbound socket marked errored");
            *slot = Slot::Errored;
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SocketState {
        self.slot.lock().await.state()
    }
}

impl Default for OutboundSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OutboundSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.slot.try_lock().map(|slot| slot.state()).ok();
        f.debug_struct("OutboundSocket")
            .field("bind_addr", &self.bind_addr)
            .field("state", &state)
            .finish()
    }
}
