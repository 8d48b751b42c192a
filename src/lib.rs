//! # async-snmp-manager
//!
//! Async SNMP manager core built on Tokio.
//!
//! ## Features
//!
//! - One lazily opened outbound UDP socket shared by every [`Manager`],
//!   replaced automatically when it enters an error state
//! - Random, collision-free request ids and a pending-request table
//! - Trap and inform receiver with community filtering, inform
//!   acknowledgment and per-OID / per-version handler routing
//! - SNMPv1/v2c BER codec behind a [`Codec`] seam
//!
//! ## Sending a request
//!
//! ```rust,no_run
//! use async_snmp_manager::{Manager, ManagerConfig, ManagerContext, oid};
//! use async_snmp_manager::pdu::Pdu;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), async_snmp_manager::Error> {
//!     let context = ManagerContext::new();
//!     let manager = Manager::new(ManagerConfig::new().host("192.168.1.1"), context);
//!
//!     let request_id = manager
//!         .send_request(Pdu::get_request(&[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]))
//!         .await?;
//!     println!("sent request {}", request_id);
//!     Ok(())
//! }
//! ```
//!
//! ## Receiving traps
//!
//! ```rust,no_run
//! use async_snmp_manager::{ManagerConfig, Trapd};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), async_snmp_manager::Error> {
//!     let mut trapd = Trapd::new(ManagerConfig::new().host("0.0.0.0"));
//!     trapd.on_trap_default(|trap| {
//!         println!("{:?} from {}", trap.trap_oid(), trap.source_ip());
//!         Ok(())
//!     });
//!
//!     trapd.start().await?.run().await;
//!     Ok(())
//! }
//! ```

pub mod ber;
pub mod codec;
pub mod error;
pub mod manager;
pub mod message;
pub mod oid;
pub mod pdu;
pub mod prelude;
pub mod transport;
pub mod trapd;
pub mod value;
pub mod varbind;
pub mod version;

pub(crate) mod util;

#[cfg(feature = "cli")]
pub mod cli;

// Re-exports for convenience
pub use codec::{BerCodec, Codec, MibContext};
pub use error::{BoxError, DecodeErrorKind, Error, ErrorStatus, OidErrorKind, Result};
pub use manager::{
    Manager, ManagerConfig, ManagerContext, PendingRequest, RequestTracker, SharedTracker,
};
pub use message::{CommunityMessage, MessagePdu};
pub use oid::Oid;
pub use pdu::{GenericTrap, Pdu, PduType, TrapV1Pdu};
pub use transport::{AgentTransport, OutboundSocket, SocketState, UdpListenerSocket};
pub use trapd::{
    DatagramOutcome, HandlerResult, Route, Trap, TrapDispatcher, TrapHandler, TrapListener, Trapd,
};
pub use value::Value;
pub use varbind::VarBind;
pub use version::Version;

/// Testing utilities exposed via the `testing` feature.
#[cfg(feature = "testing")]
pub mod testing {
    pub use crate::transport::{MockAgentTransport, SentDatagram};
    pub use crate::util::{HexDecodeError, decode_hex, encode_hex};
}
