//! SNMP Protocol Data Units (PDUs).
//!
//! [`Pdu`] covers every PDU that shares the request-id / error-status /
//! error-index layout. The SNMPv1 Trap-PDU has its own layout and lives in
//! [`TrapV1Pdu`].

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, ErrorStatus, Result};
use crate::oid::Oid;
use crate::trapd::oids;
use crate::value::Value;
use crate::varbind::{VarBind, decode_varbind_list, encode_varbind_list};

/// PDU type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PduType {
    GetRequest = 0xA0,
    GetNextRequest = 0xA1,
    Response = 0xA2,
    SetRequest = 0xA3,
    TrapV1 = 0xA4,
    GetBulkRequest = 0xA5,
    InformRequest = 0xA6,
    TrapV2 = 0xA7,
    Report = 0xA8,
}

impl PduType {
    /// Create from tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            tag::pdu::GET_REQUEST => Some(Self::GetRequest),
            tag::pdu::GET_NEXT_REQUEST => Some(Self::GetNextRequest),
            tag::pdu::RESPONSE => Some(Self::Response),
            tag::pdu::SET_REQUEST => Some(Self::SetRequest),
            tag::pdu::TRAP_V1 => Some(Self::TrapV1),
            tag::pdu::GET_BULK_REQUEST => Some(Self::GetBulkRequest),
            tag::pdu::INFORM_REQUEST => Some(Self::InformRequest),
            tag::pdu::TRAP_V2 => Some(Self::TrapV2),
            tag::pdu::REPORT => Some(Self::Report),
            _ => None,
        }
    }

    /// Get the tag byte.
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for PduType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::GetRequest => "GetRequest",
            Self::GetNextRequest => "GetNextRequest",
            Self::Response => "Response",
            Self::SetRequest => "SetRequest",
            Self::TrapV1 => "TrapV1",
            Self::GetBulkRequest => "GetBulkRequest",
            Self::InformRequest => "InformRequest",
            Self::TrapV2 => "TrapV2",
            Self::Report => "Report",
        };
        f.write_str(name)
    }
}

/// Generic PDU structure for request/response/notification operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Pdu {
    /// PDU type
    pub pdu_type: PduType,
    /// Request ID for correlating requests and responses
    pub request_id: i32,
    /// Error status (non-repeaters for GetBulk)
    pub error_status: i32,
    /// Error index (max-repetitions for GetBulk)
    pub error_index: i32,
    /// Variable bindings
    pub varbinds: Vec<VarBind>,
}

impl Pdu {
    /// Create a PDU of the given type with no request id assigned yet.
    pub fn new(pdu_type: PduType, varbinds: Vec<VarBind>) -> Self {
        Self {
            pdu_type,
            request_id: 0,
            error_status: 0,
            error_index: 0,
            varbinds,
        }
    }

    /// GET request for the given OIDs.
    pub fn get_request(oids: &[Oid]) -> Self {
        Self::new(
            PduType::GetRequest,
            oids.iter().cloned().map(VarBind::null).collect(),
        )
    }

    /// GETNEXT request for the given OIDs.
    pub fn get_next_request(oids: &[Oid]) -> Self {
        Self::new(
            PduType::GetNextRequest,
            oids.iter().cloned().map(VarBind::null).collect(),
        )
    }

    /// SET request.
    pub fn set_request(varbinds: Vec<VarBind>) -> Self {
        Self::new(PduType::SetRequest, varbinds)
    }

    /// GETBULK request. The two header fields carry non-repeaters and
    /// max-repetitions instead of error status and index.
    pub fn get_bulk(non_repeaters: i32, max_repetitions: i32, oids: &[Oid]) -> Self {
        Self {
            error_status: non_repeaters,
            error_index: max_repetitions,
            ..Self::new(
                PduType::GetBulkRequest,
                oids.iter().cloned().map(VarBind::null).collect(),
            )
        }
    }

    /// SNMPv2-Trap carrying `sysUpTime.0` and `snmpTrapOID.0` followed by `varbinds`.
    pub fn trap_v2(uptime: u32, trap_oid: Oid, varbinds: Vec<VarBind>) -> Self {
        Self::new(PduType::TrapV2, notification_varbinds(uptime, trap_oid, varbinds))
    }

    /// InformRequest with the same varbind layout as [`trap_v2`](Self::trap_v2).
    pub fn inform_request(
        request_id: i32,
        uptime: u32,
        trap_oid: Oid,
        varbinds: Vec<VarBind>,
    ) -> Self {
        Self {
            request_id,
            ..Self::new(
                PduType::InformRequest,
                notification_varbinds(uptime, trap_oid, varbinds),
            )
        }
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(self.pdu_type.tag(), |buf| {
            encode_varbind_list(buf, &self.varbinds);
            buf.push_integer(self.error_index);
            buf.push_integer(self.error_status);
            buf.push_integer(self.request_id);
        });
    }

    /// Decode from BER.
    ///
    /// Rejects the v1 Trap-PDU tag; use [`TrapV1Pdu::decode`] for that.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let tag_offset = decoder.offset();
        let tag = decoder.read_tag()?;
        let pdu_type = match PduType::from_tag(tag) {
            Some(PduType::TrapV1) | None => {
                return Err(Error::decode(
                    tag_offset,
                    DecodeErrorKind::UnknownPduType(tag),
                ));
            }
            Some(t) => t,
        };

        let len = decoder.read_length()?;
        let mut pdu = decoder.sub_decoder(len)?;

        let request_id = pdu.read_integer()?;
        let error_status = pdu.read_integer()?;
        let error_index = pdu.read_integer()?;
        let varbinds = decode_varbind_list(&mut pdu)?;
        pdu.expect_end()?;

        Ok(Pdu {
            pdu_type,
            request_id,
            error_status,
            error_index,
            varbinds,
        })
    }

    /// Get the error status as an enum.
    pub fn error_status_enum(&self) -> ErrorStatus {
        ErrorStatus::from_i32(self.error_status)
    }

    /// Build the Response acknowledging this PDU.
    ///
    /// Same request id and varbinds, error status and index zeroed.
    pub fn to_response(&self) -> Self {
        Self {
            pdu_type: PduType::Response,
            request_id: self.request_id,
            error_status: 0,
            error_index: 0,
            varbinds: self.varbinds.clone(),
        }
    }

    /// Check if this is an SNMPv2 notification (Trap or Inform).
    pub fn is_notification(&self) -> bool {
        matches!(self.pdu_type, PduType::TrapV2 | PduType::InformRequest)
    }

    /// `snmpTrapOID.0` of a v2 notification.
    ///
    /// RFC 3416 fixes it as the second varbind, right after `sysUpTime.0`.
    pub fn trap_oid(&self) -> Option<&Oid> {
        match self.varbinds.get(1) {
            Some(vb) if vb.oid == oids::snmp_trap_oid() => vb.value.as_oid(),
            _ => None,
        }
    }

    /// `sysUpTime.0` of a v2 notification, when present as the first varbind.
    pub fn uptime(&self) -> Option<u32> {
        match self.varbinds.first() {
            Some(vb) if vb.oid == oids::sys_uptime() => match vb.value {
                Value::TimeTicks(t) => Some(t),
                _ => None,
            },
            _ => None,
        }
    }
}

fn notification_varbinds(uptime: u32, trap_oid: Oid, varbinds: Vec<VarBind>) -> Vec<VarBind> {
    let mut all = Vec::with_capacity(varbinds.len() + 2);
    all.push(VarBind::new(
        oids::sys_uptime(),
        Value::TimeTicks(uptime),
    ));
    all.push(VarBind::new(
        oids::snmp_trap_oid(),
        Value::ObjectIdentifier(trap_oid),
    ));
    all.extend(varbinds);
    all
}

/// SNMPv1 generic trap types (RFC 1157 Section 4.1.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum GenericTrap {
    ColdStart = 0,
    WarmStart = 1,
    LinkDown = 2,
    LinkUp = 3,
    AuthenticationFailure = 4,
    EgpNeighborLoss = 5,
    /// See `specific_trap` for the vendor code.
    EnterpriseSpecific = 6,
}

impl GenericTrap {
    /// Create from integer value.
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::ColdStart),
            1 => Some(Self::WarmStart),
            2 => Some(Self::LinkDown),
            3 => Some(Self::LinkUp),
            4 => Some(Self::AuthenticationFailure),
            5 => Some(Self::EgpNeighborLoss),
            6 => Some(Self::EnterpriseSpecific),
            _ => None,
        }
    }

    /// Get the integer value.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// SNMPv1 Trap PDU (RFC 1157 Section 4.1.6).
#[derive(Debug, Clone, PartialEq)]
pub struct TrapV1Pdu {
    /// Enterprise OID (sysObjectID of the sender)
    pub enterprise: Oid,
    /// Agent address as reported inside the PDU
    pub agent_addr: [u8; 4],
    /// Generic trap type
    pub generic_trap: i32,
    /// Specific trap code
    pub specific_trap: i32,
    /// sysUpTime of the sender in hundredths of a second
    pub time_stamp: u32,
    /// Variable bindings
    pub varbinds: Vec<VarBind>,
}

impl TrapV1Pdu {
    /// Create a new SNMPv1 Trap PDU.
    pub fn new(
        enterprise: Oid,
        agent_addr: [u8; 4],
        generic_trap: GenericTrap,
        specific_trap: i32,
        time_stamp: u32,
        varbinds: Vec<VarBind>,
    ) -> Self {
        Self {
            enterprise,
            agent_addr,
            generic_trap: generic_trap.as_i32(),
            specific_trap,
            time_stamp,
            varbinds,
        }
    }

    /// Get the generic trap type as an enum.
    pub fn generic_trap_enum(&self) -> Option<GenericTrap> {
        GenericTrap::from_i32(self.generic_trap)
    }

    /// Check if this is an enterprise-specific trap.
    pub fn is_enterprise_specific(&self) -> bool {
        self.generic_trap == GenericTrap::EnterpriseSpecific.as_i32()
    }

    /// Equivalent SNMPv2 `snmpTrapOID.0` (RFC 3584 Section 3.1).
    ///
    /// Generic traps map to `snmpTraps.{generic + 1}`; enterprise-specific
    /// traps map to `enterprise.0.specific`. Returns `None` when the generic
    /// code is outside 0..=6 or the specific code is negative.
    ///
    /// ```
    /// use async_snmp_manager::oid;
    /// use async_snmp_manager::pdu::{GenericTrap, TrapV1Pdu};
    ///
    /// let trap = TrapV1Pdu::new(oid!(1, 3, 6, 1, 4, 1, 9999), [10, 0, 0, 1],
    ///     GenericTrap::LinkDown, 0, 0, vec![]);
    /// assert_eq!(trap.v2_trap_oid(), Some(oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 3)));
    /// ```
    pub fn v2_trap_oid(&self) -> Option<Oid> {
        match self.generic_trap_enum()? {
            GenericTrap::EnterpriseSpecific => {
                let specific = u32::try_from(self.specific_trap).ok()?;
                Some(self.enterprise.child(0).child(specific))
            }
            generic => Some(oids::snmp_traps().child(generic.as_i32() as u32 + 1)),
        }
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(tag::pdu::TRAP_V1, |buf| {
            encode_varbind_list(buf, &self.varbinds);
            buf.push_unsigned32(tag::application::TIMETICKS, self.time_stamp);
            buf.push_integer(self.specific_trap);
            buf.push_integer(self.generic_trap);
            buf.push_ip_address(self.agent_addr);
            buf.push_oid(&self.enterprise);
        });
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut pdu = decoder.read_constructed(tag::pdu::TRAP_V1)?;

        let enterprise = pdu.read_oid()?;
        let agent_addr = pdu.read_ip_address()?;
        let generic_trap = pdu.read_integer()?;
        let specific_trap = pdu.read_integer()?;
        let time_stamp = pdu.read_unsigned32(tag::application::TIMETICKS)?;
        let varbinds = decode_varbind_list(&mut pdu)?;
        pdu.expect_end()?;

        Ok(TrapV1Pdu {
            enterprise,
            agent_addr,
            generic_trap,
            specific_trap,
            time_stamp,
            varbinds,
        })
    }
}
