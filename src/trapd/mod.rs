//! Trap and inform receiver.
//!
//! [`Trapd`] combines a [`ManagerConfig`] (bind host and port, accepted
//! communities, MIB context) with a [`TrapDispatcher`]. Handlers are
//! registered first; [`Trapd::start`] then binds the socket and returns a
//! [`TrapListener`] to run.
//!
//! ```rust,no_run
//! use async_snmp_manager::{ManagerConfig, Trapd};
//!
//! # async fn example() -> async_snmp_manager::Result<()> {
//! let mut trapd = Trapd::new(
//!     ManagerConfig::new()
//!         .host("0.0.0.0")
//!         .port(1162)
//!         .accept_communities(["public"]),
//! );
//! trapd.on_trap("1.3.6.1.6.3.1.1.5.3", |trap| {
//!     println!("linkDown from {}", trap.source_ip());
//!     Ok(())
//! })?;
//! trapd.on_trap_default(|trap| {
//!     println!("{:?} notification from {}", trap.version(), trap.source_ip());
//!     Ok(())
//! });
//!
//! let listener = trapd.start().await?;
//! listener.run().await;
//! # Ok(())
//! # }
//! ```

mod dispatch;
mod listener;
pub mod oids;
mod trap;

pub use dispatch::*;
pub use listener::*;
pub use trap::*;

use crate::codec::{BerCodec, Codec};
use crate::error::{Error, Result};
use crate::manager::ManagerConfig;
use crate::transport::{AgentTransport, UdpListenerSocket};
use bytes::Bytes;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Default trap listener port.
pub const DEFAULT_TRAP_PORT: u16 = 162;

/// Check `community` against an accepted set; `None` accepts everything.
pub fn community_allowed(accepted: Option<&[Bytes]>, community: &[u8]) -> bool {
    match accepted {
        None => true,
        Some(accepted) => accepted.iter().any(|c| c.as_ref() == community),
    }
}

/// Trap daemon: listener configuration plus handler registry.
pub struct Trapd {
    config: ManagerConfig,
    dispatcher: TrapDispatcher,
    codec: Arc<dyn Codec>,
}

impl Trapd {
    /// Create a daemon with no handlers.
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            dispatcher: TrapDispatcher::new(),
            codec: Arc::new(BerCodec),
        }
    }

    /// Replace the codec.
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// The configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// The handler registry.
    pub fn dispatcher(&self) -> &TrapDispatcher {
        &self.dispatcher
    }

    /// Listening port, 162 unless configured.
    pub fn port(&self) -> u16 {
        self.config.port_or(DEFAULT_TRAP_PORT)
    }

    /// See [`TrapDispatcher::register`].
    pub fn register(&mut self, route: Route, handler: Option<TrapHandler>) -> Result<()> {
        self.dispatcher.register(route, handler)
    }

    /// See [`TrapDispatcher::unregister`].
    pub fn unregister(&mut self, route: &Route) -> Option<TrapHandler> {
        self.dispatcher.unregister(route)
    }

    /// See [`TrapDispatcher::on_trap`].
    pub fn on_trap<F>(&mut self, oid: &str, handler: F) -> Result<()>
    where
        F: Fn(Trap) -> HandlerResult + Send + Sync + 'static,
    {
        self.dispatcher.on_trap(oid, handler)
    }

    /// See [`TrapDispatcher::on_trap_default`].
    pub fn on_trap_default<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Trap) -> HandlerResult + Send + Sync + 'static,
    {
        self.dispatcher.on_trap_default(handler);
        self
    }

    /// See [`TrapDispatcher::on_trap_v1`].
    pub fn on_trap_v1<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Trap) -> HandlerResult + Send + Sync + 'static,
    {
        self.dispatcher.on_trap_v1(handler);
        self
    }

    /// See [`TrapDispatcher::on_trap_v2c`].
    pub fn on_trap_v2c<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Trap) -> HandlerResult + Send + Sync + 'static,
    {
        self.dispatcher.on_trap_v2c(handler);
        self
    }

    /// Make MIB modules from `dir` available to the codec.
    pub fn load_modules<I, S>(&mut self, modules: I, dir: impl Into<PathBuf>) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.mib.load_modules(modules, dir);
        tracing::debug!(
            snmp.mib_modules = ?self.config.mib.modules(),
            "MIB modules registered"
        );
        self
    }

    /// Check `community` against the configured accepted communities.
    pub fn community_allowed(&self, community: &[u8]) -> bool {
        community_allowed(self.config.accepted_communities.as_deref(), community)
    }

    /// Resolve the configured host and port to a bind address.
    pub async fn bind_addr(&self) -> Result<SocketAddr> {
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

    /// Bind the listening socket and hand over the registered handlers.
    pub async fn start(self) -> Result<TrapListener<UdpListenerSocket>> {
        let addr = self.bind_addr().await?;
        let socket = UdpListenerSocket::bind(addr)?;
        tracing::info!(snmp.local_addr = %socket.local_addr(), "trapd listening");
        Ok(self.listen_on(socket))
    }

    /// Hand the registered handlers to a listener on `transport`.
    pub fn listen_on<T: AgentTransport>(self, transport: T) -> TrapListener<T> {
        TrapListener::new(transport, self.dispatcher, &self.config).with_codec(self.codec)
    }
}

impl std::fmt::Debug for Trapd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trapd")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
