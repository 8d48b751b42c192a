//! Message codec seam.
//!
//! The manager and the trap listener never touch BER directly; they go
//! through a [`Codec`]. [`BerCodec`] is the built-in implementation.

use crate::error::Result;
use crate::message::CommunityMessage;
use bytes::Bytes;
use std::path::PathBuf;

/// MIB modules made available to the codec.
///
/// Symbolic name resolution is up to the codec; [`BerCodec`] works on
/// numeric OIDs and only carries the context along.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MibContext {
    modules: Vec<String>,
    dir: Option<PathBuf>,
}

impl MibContext {
    /// Empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record modules to be loaded from `dir`.
    pub fn load_modules<I, S>(&mut self, modules: I, dir: impl Into<PathBuf>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules.extend(modules.into_iter().map(Into::into));
        self.dir = Some(dir.into());
    }

    /// Loaded module names, in load order.
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    /// Directory the modules were loaded from.
    pub fn dir(&self) -> Option<&std::path::Path> {
        self.dir.as_deref()
    }
}

/// Encodes outbound and decodes inbound community messages.
pub trait Codec: Send + Sync {
    /// Encode a message for the wire.
    fn encode(&self, message: &CommunityMessage) -> Bytes;

    /// Decode one datagram.
    fn decode(&self, data: Bytes, mib: &MibContext) -> Result<CommunityMessage>;
}

/// BER codec for SNMPv1/v2c community messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct BerCodec;

impl Codec for BerCodec {
    fn encode(&self, message: &CommunityMessage) -> Bytes {
        message.encode()
    }

    fn decode(&self, data: Bytes, _mib: &MibContext) -> Result<CommunityMessage> {
        CommunityMessage::decode(data)
    }
}
