//! SNMP manager: configuration, shared context and the request send path.
//!
//! A [`Manager`] describes one remote-agent relationship. All managers in a
//! process share a [`ManagerContext`]: one outbound socket, one request
//! tracker and one codec.
//!
//! ```rust,no_run
//! use async_snmp_manager::{Manager, ManagerConfig, ManagerContext, oid};
//! use async_snmp_manager::pdu::Pdu;
//!
//! # async fn example() -> async_snmp_manager::Result<()> {
//! let context = ManagerContext::new();
//! let router = Manager::new(
//!     ManagerConfig::new().host("192.0.2.1").community("private"),
//!     context.clone(),
//! );
//! let request_id = router
//!     .send_request(Pdu::get_request(&[oid!(1, 3, 6, 1, 2, 1, 1, 3, 0)]))
//!     .await?;
//! assert!(context.tracker().lock().unwrap().contains(request_id));
//! # Ok(())
//! # }
//! ```

mod tracker;

pub use tracker::*;

use crate::codec::{BerCodec, Codec, MibContext};
use crate::error::{Error, Result};
use crate::message::CommunityMessage;
use crate::pdu::{Pdu, PduType};
use crate::transport::OutboundSocket;
use crate::version::Version;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

/// Default agent port.
pub const DEFAULT_PORT: u16 = 161;

/// Largest payload a single UDP datagram can carry over IPv4.
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Manager configuration.
///
/// Plain values plus consuming setters:
///
/// ```
/// use async_snmp_manager::{ManagerConfig, Version};
/// use std::time::Duration;
///
/// let config = ManagerConfig::new()
///     .host("10.0.0.1")
///     .version(Version::V1)
///     .community_rw("private")
///     .timeout(Duration::from_secs(2));
/// assert_eq!(&config.community_ro[..], b"public");
/// assert_eq!(&config.community_rw[..], b"private");
/// ```
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Remote host (agent) or local bind host (listener).
    pub host: String,
    /// Explicit port; `None` means the role's default (161 or 162).
    pub port: Option<u16>,
    /// Request timeout, for the request layer above this crate.
    pub timeout: Duration,
    /// Retry count, for the request layer above this crate.
    pub retries: u32,
    /// Protocol version.
    pub version: Version,
    /// Community for read operations.
    pub community_ro: Bytes,
    /// Community for SetRequest.
    pub community_rw: Bytes,
    /// Communities a trap listener accepts; `None` accepts any.
    pub accepted_communities: Option<Vec<Bytes>>,
    /// MIB modules handed to the codec.
    pub mib: MibContext,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: None,
            timeout: Duration::from_secs(1),
            retries: 3,
            version: Version::V2c,
            community_ro: Bytes::from_static(b"public"),
            community_rw: Bytes::from_static(b"public"),
            accepted_communities: None,
            mib: MibContext::default(),
        }
    }
}

impl ManagerConfig {
    /// Configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry count.
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the protocol version.
    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Set both the read and the write community.
    pub fn community(mut self, community: impl AsRef<[u8]>) -> Self {
        let community = Bytes::copy_from_slice(community.as_ref());
        self.community_ro = community.clone();
        self.community_rw = community;
        self
    }

    /// Set the read community.
    pub fn community_ro(mut self, community: impl AsRef<[u8]>) -> Self {
        self.community_ro = Bytes::copy_from_slice(community.as_ref());
        self
    }

    /// Set the write community.
    pub fn community_rw(mut self, community: impl AsRef<[u8]>) -> Self {
        self.community_rw = Bytes::copy_from_slice(community.as_ref());
        self
    }

    /// Restrict a listener to the given communities.
    pub fn accept_communities<I, C>(mut self, communities: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        self.accepted_communities = Some(
            communities
                .into_iter()
                .map(|c| Bytes::copy_from_slice(c.as_ref()))
                .collect(),
        );
        self
    }

    /// Set the MIB context.
    pub fn mib(mut self, mib: MibContext) -> Self {
        self.mib = mib;
        self
    }

    /// Effective port, falling back to `default`.
    pub fn port_or(&self, default: u16) -> u16 {
        self.port.unwrap_or(default)
    }

    /// Community to use for a PDU: write community for SetRequest, read
    /// community for everything else.
    pub fn community_for(&self, pdu_type: PduType) -> &Bytes {
        match pdu_type {
            PduType::SetRequest => &self.community_rw,
            _ => &self.community_ro,
        }
    }
}

/// State shared by every manager in a process.
///
/// Cloning is cheap; clones refer to the same socket and tracker.
#[derive(Clone)]
pub struct ManagerContext {
    socket: Arc<OutboundSocket>,
    tracker: SharedTracker,
    codec: Arc<dyn Codec>,
}

impl ManagerContext {
    /// Fresh context: unopened socket on `0.0.0.0:0`, empty tracker, BER codec.
    pub fn new() -> Self {
        Self::with_parts(
            Arc::new(OutboundSocket::new()),
            RequestTracker::shared(),
            Arc::new(BerCodec),
        )
    }

    /// Context built from explicit parts.
    pub fn with_parts(
        socket: Arc<OutboundSocket>,
        tracker: SharedTracker,
        codec: Arc<dyn Codec>,
    ) -> Self {
        Self {
            socket,
            tracker,
            codec,
        }
    }

    /// The shared outbound socket.
    pub fn socket(&self) -> &Arc<OutboundSocket> {
        &self.socket
    }

    /// The shared request tracker.
    pub fn tracker(&self) -> &SharedTracker {
        &self.tracker
    }

    /// The codec.
    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }
}

impl Default for ManagerContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ManagerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerContext")
            .field("socket", &self.socket)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

/// A configured relationship with one remote agent.
#[derive(Debug, Clone)]
pub struct Manager {
    config: ManagerConfig,
    context: ManagerContext,
}

impl Manager {
    /// Create a manager sharing `context`.
    pub fn new(config: ManagerConfig, context: ManagerContext) -> Self {
        Self { config, context }
    }

    /// The configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// The shared context.
    pub fn context(&self) -> &ManagerContext {
        &self.context
    }

    /// Remote agent port.
    pub fn port(&self) -> u16 {
        self.config.port_or(DEFAULT_PORT)
    }

    /// Resolve the remote agent address.
    pub async fn target(&self) -> Result<SocketAddr> {
        let host = self.config.host.as_str();
        tokio::net::lookup_host((host, self.port()))
            .await
            .map_err(|source| Error::Io {
                target: None,
                source,
            })?
            .next()
            .ok_or_else(|| Error::Io {
                target: None,
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("could not resolve {}", host),
                ),
            })
    }

    /// Encode `message` and send it to the agent over the shared socket.
    ///
    /// A failed send marks the shared socket errored so the next send
    /// starts on a fresh one.
    pub async fn send(&self, message: &CommunityMessage) -> Result<()> {
        let target = self.target().await?;
        self.send_to(message, target).await
    }

    async fn send_to(&self, message: &CommunityMessage, target: SocketAddr) -> Result<()> {
        let data = self.context.codec.encode(message);
        if data.len() > MAX_UDP_PAYLOAD {
            return Err(Error::MessageTooLarge {
                size: data.len(),
                max: MAX_UDP_PAYLOAD,
            });
        }

        let socket = self.context.socket.acquire().await?;
        if let Err(source) = socket.send_to(&data, target).await {
            self.context.socket.mark_errored(&socket).await;
            return Err(Error::Io {
                target: Some(target),
                source,
            });
        }

        tracing::trace!(
            snmp.target = %target,
            snmp.bytes = data.len(),
            snmp.pdu_type = %message.pdu.pdu_type(),
            "message sent"
        );
        Ok(())
    }

    /// Track `pdu` under a fresh request id and send it.
    ///
    /// Returns the assigned id. The request stays in the tracker for the
    /// response-correlation layer; it is removed again if the send fails.
    pub async fn send_request(&self, pdu: Pdu) -> Result<i32> {
        let target = self.target().await?;
        let community = self.config.community_for(pdu.pdu_type).clone();

        let mut wire_pdu = pdu.clone();
        let request_id = self
            .context
            .tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .track(PendingRequest::new(target, pdu))?;
        wire_pdu.request_id = request_id;

        let message = CommunityMessage::new(self.config.version, community, wire_pdu);
        if let Err(err) = self.send_to(&message, target).await {
            self.context
                .tracker
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(request_id);
            return Err(err);
        }

        tracing::debug!(snmp.request_id = request_id, snmp.target = %target, "request sent");
        Ok(request_id)
    }
}
