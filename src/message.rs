//! Community-based SNMP message format (v1/v2c).
//!
//! `SEQUENCE { version INTEGER, community OCTET STRING, pdu PDU }`
//!
//! The PDU slot holds either a standard PDU or, for SNMPv1, the Trap-PDU
//! with its own layout.

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::pdu::{Pdu, PduType, TrapV1Pdu};
use crate::version::Version;
use bytes::Bytes;

/// PDU carried by a [`CommunityMessage`].
#[derive(Debug, Clone, PartialEq)]
pub enum MessagePdu {
    /// Any PDU with the request-id / error-status / error-index layout.
    Standard(Pdu),
    /// SNMPv1 Trap-PDU.
    TrapV1(TrapV1Pdu),
}

impl MessagePdu {
    /// Tag of the carried PDU.
    pub fn pdu_type(&self) -> PduType {
        match self {
            MessagePdu::Standard(pdu) => pdu.pdu_type,
            MessagePdu::TrapV1(_) => PduType::TrapV1,
        }
    }

    fn encode(&self, buf: &mut EncodeBuf) {
        match self {
            MessagePdu::Standard(pdu) => pdu.encode(buf),
            MessagePdu::TrapV1(trap) => trap.encode(buf),
        }
    }

    fn decode(decoder: &mut Decoder) -> Result<Self> {
        match decoder.peek_tag() {
            Some(tag::pdu::TRAP_V1) => Ok(MessagePdu::TrapV1(TrapV1Pdu::decode(decoder)?)),
            _ => Ok(MessagePdu::Standard(Pdu::decode(decoder)?)),
        }
    }
}

impl From<Pdu> for MessagePdu {
    fn from(pdu: Pdu) -> Self {
        MessagePdu::Standard(pdu)
    }
}

impl From<TrapV1Pdu> for MessagePdu {
    fn from(trap: TrapV1Pdu) -> Self {
        MessagePdu::TrapV1(trap)
    }
}

/// Community-based SNMP message (v1/v2c).
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityMessage {
    /// SNMP version (V1 or V2c)
    pub version: Version,
    /// Community string
    pub community: Bytes,
    /// Protocol data unit
    pub pdu: MessagePdu,
}

impl CommunityMessage {
    /// Create a new community message.
    pub fn new(version: Version, community: impl Into<Bytes>, pdu: impl Into<MessagePdu>) -> Self {
        Self {
            version,
            community: community.into(),
            pdu: pdu.into(),
        }
    }

    /// Create a V2c message.
    pub fn v2c(community: impl Into<Bytes>, pdu: impl Into<MessagePdu>) -> Self {
        Self::new(Version::V2c, community, pdu)
    }

    /// Create a V1 message.
    pub fn v1(community: impl Into<Bytes>, pdu: impl Into<MessagePdu>) -> Self {
        Self::new(Version::V1, community, pdu)
    }

    /// Encode to BER.
    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();

        buf.push_sequence(|buf| {
            self.pdu.encode(buf);
            buf.push_octet_string(&self.community);
            buf.push_integer(self.version.as_i32());
        });

        buf.finish()
    }

    /// Decode from BER.
    ///
    /// The whole buffer must be one message; trailing bytes are an error.
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;

        let version_offset = seq.offset();
        let raw_version = seq.read_integer()?;
        let version = Version::from_i32(raw_version).ok_or_else(|| {
            Error::decode(version_offset, DecodeErrorKind::UnknownVersion(raw_version))
        })?;

        let community = seq.read_octet_string()?;
        let pdu = MessagePdu::decode(&mut seq)?;
        seq.expect_end()?;
        decoder.expect_end()?;

        Ok(CommunityMessage {
            version,
            community,
            pdu,
        })
    }

    /// Standard PDU, if this message carries one.
    pub fn standard_pdu(&self) -> Option<&Pdu> {
        match &self.pdu {
            MessagePdu::Standard(pdu) => Some(pdu),
            MessagePdu::TrapV1(_) => None,
        }
    }

    /// Check if this message is an InformRequest.
    pub fn is_inform(&self) -> bool {
        self.pdu.pdu_type() == PduType::InformRequest
    }

    /// Response acknowledging this message.
    ///
    /// Same version and community; the PDU is [`Pdu::to_response`]. Returns
    /// `None` for the v1 Trap-PDU, which has nothing to respond with.
    pub fn response(&self) -> Option<CommunityMessage> {
        let pdu = self.standard_pdu()?;
        Some(CommunityMessage {
            version: self.version,
            community: self.community.clone(),
            pdu: MessagePdu::Standard(pdu.to_response()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::pdu::GenericTrap;

    #[test]
    fn test_v2c_get_wire_format() {
        let mut pdu = Pdu::get_request(&[oid!(1, 3, 6, 1)]);
        pdu.request_id = 1;
        let bytes = CommunityMessage::v2c(Bytes::from_static(b"public"), pdu).encode();

        #[rustfmt::skip]
        let expected: &[u8] = &[
            0x30, 0x21,
            0x02, 0x01, 0x01,
            0x04, 0x06, b'p', b'u', b'b', b'l', b'i', b'c',
            0xA0, 0x14,
            0x02, 0x01, 0x01,
            0x02, 0x01, 0x00,
            0x02, 0x01, 0x00,
            0x30, 0x09,
            0x30, 0x07, 0x06, 0x03, 0x2B, 0x06, 0x01, 0x05, 0x00,
        ];
        assert_eq!(&bytes[..], expected);
    }

    #[test]
    fn test_decode_v1_trap_message() {
        let trap = TrapV1Pdu::new(
            oid!(1, 3, 6, 1, 4, 1, 99),
            [10, 1, 2, 3],
            GenericTrap::WarmStart,
            0,
            42,
            vec![],
        );
        let bytes = CommunityMessage::v1(Bytes::from_static(b"public"), trap.clone()).encode();
        let decoded = CommunityMessage::decode(bytes).unwrap();

        assert_eq!(decoded.version, Version::V1);
        assert_eq!(decoded.pdu, MessagePdu::TrapV1(trap));
        assert!(decoded.response().is_none());
    }

    #[test]
    fn test_inform_response_mirrors_request() {
        let inform = Pdu::inform_request(99, 10, oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 4), vec![]);
        let msg = CommunityMessage::v2c(Bytes::from_static(b"public"), inform);
        assert!(msg.is_inform());

        let response = msg.response().unwrap();
        assert_eq!(response.version, Version::V2c);
        assert_eq!(response.community, msg.community);
        let pdu = response.standard_pdu().unwrap();
        assert_eq!(pdu.pdu_type, PduType::Response);
        assert_eq!(pdu.request_id, 99);
    }

    #[test]
    fn test_decode_unknown_version() {
        // version 3 in a community envelope
        let data = Bytes::from_static(&[
            0x30, 0x0C, 0x02, 0x01, 0x03, 0x04, 0x00, 0xA7, 0x05, 0x02, 0x01, 0x00, 0x02, 0x01,
        ]);
        assert!(matches!(
            CommunityMessage::decode(data),
            Err(Error::Decode {
                offset: 2,
                kind: DecodeErrorKind::UnknownVersion(3)
            })
        ));
    }

    #[test]
    fn test_decode_rejects_trailing_garbage() {
        let pdu = Pdu::trap_v2(1, oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 1), vec![]);
        let mut bytes = CommunityMessage::v2c(Bytes::from_static(b"public"), pdu)
            .encode()
            .to_vec();
        bytes.push(0x00);
        assert!(CommunityMessage::decode(Bytes::from(bytes)).is_err());
    }
}
