//! Community-based SNMPv2c message format.
//!
//! `SEQUENCE { version INTEGER, community OCTET STRING, pdu PDU }`
//!
//! The codec is a pure transform: [`CommunityMessage::decode`] either yields a
//! complete message or an [`Error::Decode`] describing where the datagram went
//! wrong, and [`CommunityMessage::encode`] always succeeds.

use crate::ber::{Decoder, EncodeBuf};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::pdu::Pdu;
use crate::version::Version;
use bytes::Bytes;

/// Community-based SNMPv2c message.
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityMessage {
    /// SNMP version, always [`Version::V2c`] after a successful decode
    pub version: Version,
    /// Community string
    pub community: Bytes,
    /// Protocol data unit
    pub pdu: Pdu,
}

impl CommunityMessage {
    /// Create a v2c message.
    pub fn v2c(community: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self {
            version: Version::V2c,
            community: community.into(),
            pdu,
        }
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
    /// Rejects anything but SNMPv2c, and any bytes trailing the message.
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;
        decoder.expect_end()?;

        let version_offset = seq.offset();
        let version_num = seq.read_integer()?;
        let version = match Version::from_i32(version_num) {
            Some(Version::V2c) => Version::V2c,
            Some(_) => {
                return Err(Error::decode(
                    version_offset,
                    DecodeErrorKind::UnsupportedVersion(version_num),
                ));
            }
            None => {
                return Err(Error::decode(
                    version_offset,
                    DecodeErrorKind::UnknownVersion(version_num),
                ));
            }
        };

        let community = seq.read_octet_string()?;
        if seq.is_empty() {
            return Err(Error::decode(seq.offset(), DecodeErrorKind::MissingPdu));
        }
        let pdu = Pdu::decode(&mut seq)?;
        seq.expect_end()?;

        Ok(CommunityMessage {
            version,
            community,
            pdu,
        })
    }
}
