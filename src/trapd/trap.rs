//! Decoded notification handed to a trap handler.

use crate::error::{DecodeErrorKind, Error, Result};
use crate::message::{CommunityMessage, MessagePdu};
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType, TrapV1Pdu};
use crate::varbind::VarBind;
use crate::version::Version;
use bytes::Bytes;
use std::net::IpAddr;

/// A received notification, tagged by protocol version.
///
/// Each value is built from one datagram and consumed by exactly one handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Trap {
    /// SNMPv1 Trap-PDU.
    V1 {
        community: Bytes,
        source_ip: IpAddr,
        pdu: TrapV1Pdu,
    },
    /// SNMPv2c Trap or Inform-Request.
    V2c {
        community: Bytes,
        source_ip: IpAddr,
        /// Value of `snmpTrapOID.0`
        trap_oid: Oid,
        /// Value of `sysUpTime.0`, if the sender included it
        uptime: Option<u32>,
        pdu: Pdu,
    },
    /// Any other PDU that reached the listener.
    Other {
        version: Version,
        community: Bytes,
        source_ip: IpAddr,
        pdu: MessagePdu,
    },
}

impl Trap {
    /// Classify a decoded message received from `source_ip`.
    ///
    /// A v2c Trap or Inform whose second varbind is not `snmpTrapOID.0` is a
    /// decode error.
    pub fn from_message(message: CommunityMessage, source_ip: IpAddr) -> Result<Self> {
        let CommunityMessage {
            version,
            community,
            pdu,
        } = message;

        match (version, pdu) {
            (Version::V1, MessagePdu::TrapV1(pdu)) => Ok(Trap::V1 {
                community,
                source_ip,
                pdu,
            }),
            (Version::V2c, MessagePdu::Standard(pdu)) if pdu.is_notification() => {
                let trap_oid = pdu
                    .trap_oid()
                    .cloned()
                    .ok_or_else(|| Error::decode(0, DecodeErrorKind::MissingTrapOid))?;
                Ok(Trap::V2c {
                    community,
                    source_ip,
                    trap_oid,
                    uptime: pdu.uptime(),
                    pdu,
                })
            }
            (version, pdu) => Ok(Trap::Other {
                version,
                community,
                source_ip,
                pdu,
            }),
        }
    }

    /// Protocol version the notification arrived with.
    pub fn version(&self) -> Version {
        match self {
            Trap::V1 { .. } => Version::V1,
            Trap::V2c { .. } => Version::V2c,
            Trap::Other { version, .. } => *version,
        }
    }

    /// Community string of the message.
    pub fn community(&self) -> &Bytes {
        match self {
            Trap::V1 { community, .. }
            | Trap::V2c { community, .. }
            | Trap::Other { community, .. } => community,
        }
    }

    /// Address the datagram came from.
    pub fn source_ip(&self) -> IpAddr {
        match self {
            Trap::V1 { source_ip, .. }
            | Trap::V2c { source_ip, .. }
            | Trap::Other { source_ip, .. } => *source_ip,
        }
    }

    /// Tag of the carried PDU.
    pub fn pdu_type(&self) -> PduType {
        match self {
            Trap::V1 { .. } => PduType::TrapV1,
            Trap::V2c { pdu, .. } => pdu.pdu_type,
            Trap::Other { pdu, .. } => pdu.pdu_type(),
        }
    }

    /// Notification OID: `snmpTrapOID.0` for v2c, the RFC 3584 mapping for v1.
    ///
    /// `None` for non-notifications and for v1 traps with unknown trap codes.
    pub fn trap_oid(&self) -> Option<Oid> {
        match self {
            Trap::V1 { pdu, .. } => pdu.v2_trap_oid(),
            Trap::V2c { trap_oid, .. } => Some(trap_oid.clone()),
            Trap::Other { .. } => None,
        }
    }

    /// Sender uptime in hundredths of a second.
    pub fn uptime(&self) -> Option<u32> {
        match self {
            Trap::V1 { pdu, .. } => Some(pdu.time_stamp),
            Trap::V2c { uptime, .. } => *uptime,
            Trap::Other { .. } => None,
        }
    }

    /// Variable bindings, including `sysUpTime.0` and `snmpTrapOID.0` for v2c.
    pub fn varbinds(&self) -> &[VarBind] {
        match self {
            Trap::V1 { pdu, .. } => &pdu.varbinds,
            Trap::V2c { pdu, .. } => &pdu.varbinds,
            Trap::Other { pdu, .. } => match pdu {
                MessagePdu::Standard(pdu) => &pdu.varbinds,
                MessagePdu::TrapV1(pdu) => &pdu.varbinds,
            },
        }
    }

    /// Check if this is an Inform-Request.
    pub fn is_inform(&self) -> bool {
        self.pdu_type() == PduType::InformRequest
    }
}
