//! SNMP value types.
//!
//! [`Value`] is everything that can sit on the right-hand side of a varbind,
//! including the three SNMPv2 exception markers. [`Syntax`] is the declared
//! type of a managed object, used to coerce provider data and to reject values
//! of the wrong shape before they reach the wire.

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;
use bytes::Bytes;
use serde::Deserialize;

/// SNMP value.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Value {
    /// INTEGER / Integer32
    Integer(i32),
    /// OCTET STRING
    OctetString(Bytes),
    /// NULL, the placeholder value in request varbinds
    Null,
    /// OBJECT IDENTIFIER
    ObjectIdentifier(Oid),
    /// IpAddress (4 bytes, network order)
    IpAddress([u8; 4]),
    /// Counter32
    Counter32(u32),
    /// Gauge32 / Unsigned32
    Gauge32(u32),
    /// TimeTicks (hundredths of a second)
    TimeTicks(u32),
    /// Opaque
    Opaque(Bytes),
    /// Counter64
    Counter64(u64),
    /// noSuchObject exception.
    ///
    /// The agent answers with this for absent objects, objects outside the
    /// community's view and objects whose value is currently unavailable.
    NoSuchObject,
    /// noSuchInstance exception
    NoSuchInstance,
    /// endOfMibView exception, the end of a GETNEXT/GETBULK walk
    EndOfMibView,
    /// Unrecognized tag, preserved so it can be re-encoded unchanged
    Unknown { tag: u8, data: Bytes },
}

impl Value {
    /// Get as i32 if this is an INTEGER.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as u32 for the unsigned 32-bit types and non-negative integers.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => Some(*v),
            Value::Integer(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Get the raw bytes of an OCTET STRING or Opaque.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::OctetString(data) | Value::Opaque(data) => Some(data),
            _ => None,
        }
    }

    /// Check if this is an exception value.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        match self {
            Value::Integer(v) => buf.push_integer(*v),
            Value::OctetString(data) => buf.push_octet_string(data),
            Value::Null => buf.push_null(),
            Value::ObjectIdentifier(oid) => buf.push_oid(oid),
            Value::IpAddress(addr) => buf.push_ip_address(*addr),
            Value::Counter32(v) => buf.push_unsigned32(tag::application::COUNTER32, *v),
            Value::Gauge32(v) => buf.push_unsigned32(tag::application::GAUGE32, *v),
            Value::TimeTicks(v) => buf.push_unsigned32(tag::application::TIMETICKS, *v),
            Value::Opaque(data) => buf.push_tagged(tag::application::OPAQUE, data),
            Value::Counter64(v) => buf.push_counter64(*v),
            Value::NoSuchObject => buf.push_empty(tag::context::NO_SUCH_OBJECT),
            Value::NoSuchInstance => buf.push_empty(tag::context::NO_SUCH_INSTANCE),
            Value::EndOfMibView => buf.push_empty(tag::context::END_OF_MIB_VIEW),
            Value::Unknown { tag: t, data } => buf.push_tagged(*t, data),
        }
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let tag = decoder.read_tag()?;
        let len = decoder.read_length()?;

        let value = match tag {
            tag::universal::INTEGER => Value::Integer(decoder.read_integer_value(len)?),
            tag::universal::OCTET_STRING => Value::OctetString(decoder.read_bytes(len)?),
            tag::universal::NULL => {
                if len != 0 {
                    return Err(Error::decode(
                        decoder.offset(),
                        DecodeErrorKind::InvalidNull,
                    ));
                }
                Value::Null
            }
            tag::universal::OBJECT_IDENTIFIER => {
                Value::ObjectIdentifier(decoder.read_oid_value(len)?)
            }
            tag::application::IP_ADDRESS => {
                if len != 4 {
                    return Err(Error::decode(
                        decoder.offset(),
                        DecodeErrorKind::InvalidIpAddressLength { length: len },
                    ));
                }
                let data = decoder.read_bytes(4)?;
                Value::IpAddress([data[0], data[1], data[2], data[3]])
            }
            tag::application::COUNTER32 => Value::Counter32(decoder.read_unsigned32_value(len)?),
            tag::application::GAUGE32 => Value::Gauge32(decoder.read_unsigned32_value(len)?),
            tag::application::TIMETICKS => Value::TimeTicks(decoder.read_unsigned32_value(len)?),
            tag::application::OPAQUE => Value::Opaque(decoder.read_bytes(len)?),
            tag::application::COUNTER64 => Value::Counter64(decoder.read_integer64_value(len)?),
            tag::context::NO_SUCH_OBJECT
            | tag::context::NO_SUCH_INSTANCE
            | tag::context::END_OF_MIB_VIEW => {
                // Content is meaningless; skip it so the varbind list stays aligned
                decoder.read_bytes(len)?;
                match tag {
                    tag::context::NO_SUCH_OBJECT => Value::NoSuchObject,
                    tag::context::NO_SUCH_INSTANCE => Value::NoSuchInstance,
                    _ => Value::EndOfMibView,
                }
            }
            tag::universal::OCTET_STRING_CONSTRUCTED => {
                return Err(Error::decode(
                    decoder.offset(),
                    DecodeErrorKind::ConstructedOctetString,
                ));
            }
            _ => Value::Unknown {
                tag,
                data: decoder.read_bytes(len)?,
            },
        };

        Ok(value)
    }
}

struct Hex<'a>(&'a [u8]);

impl std::fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::OctetString(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "{}", s),
                Err(_) => write!(f, "0x{}", Hex(data)),
            },
            Value::Null => write!(f, "NULL"),
            Value::ObjectIdentifier(oid) => write!(f, "{}", oid),
            Value::IpAddress([a, b, c, d]) => write!(f, "{}.{}.{}.{}", a, b, c, d),
            Value::Counter32(v) | Value::Gauge32(v) => write!(f, "{}", v),
            Value::TimeTicks(v) => {
                let secs = v / 100;
                write!(
                    f,
                    "{}d {}h {}m {}s",
                    secs / 86400,
                    (secs % 86400) / 3600,
                    (secs % 3600) / 60,
                    secs % 60
                )
            }
            Value::Opaque(data) => write!(f, "Opaque(0x{})", Hex(data)),
            Value::Counter64(v) => write!(f, "{}", v),
            Value::NoSuchObject => write!(f, "noSuchObject"),
            Value::NoSuchInstance => write!(f, "noSuchInstance"),
            Value::EndOfMibView => write!(f, "endOfMibView"),
            Value::Unknown { tag, data } => {
                write!(f, "Unknown(tag=0x{:02X}, data=0x{})", tag, Hex(data))
            }
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::OctetString(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::OctetString(Bytes::from(s))
    }
}

impl From<Oid> for Value {
    fn from(oid: Oid) -> Self {
        Value::ObjectIdentifier(oid)
    }
}

/// Declared syntax of a managed object.
///
/// Names follow SMIv2 so configuration files read like a MIB module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Syntax {
    Integer32,
    OctetString,
    ObjectIdentifier,
    IpAddress,
    Counter32,
    Gauge32,
    TimeTicks,
    Counter64,
}

impl Syntax {
    /// Whether `value` is a legal instance of this syntax.
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Syntax::Integer32, Value::Integer(_))
                | (Syntax::OctetString, Value::OctetString(_))
                | (Syntax::ObjectIdentifier, Value::ObjectIdentifier(_))
                | (Syntax::IpAddress, Value::IpAddress(_))
                | (Syntax::Counter32, Value::Counter32(_))
                | (Syntax::Gauge32, Value::Gauge32(_))
                | (Syntax::TimeTicks, Value::TimeTicks(_))
                | (Syntax::Counter64, Value::Counter64(_))
        )
    }

    /// Coerce a JSON scalar into a value of this syntax.
    ///
    /// Numbers and integer strings are accepted for the numeric syntaxes;
    /// fractional numbers are truncated toward zero. Strings are accepted
    /// for OCTET STRING, OBJECT IDENTIFIER and IpAddress. A number given for
    /// an OCTET STRING is rendered in decimal. Anything out of range or of
    /// the wrong shape yields `None`.
    pub fn coerce(&self, json: &serde_json::Value) -> Option<Value> {
        use serde_json::Value as Json;

        // `as f64` bounds are 2^63 and 2^64 exactly, so the upper checks are strict.
        let truncated = |n: &serde_json::Number| n.as_f64().filter(|f| f.is_finite()).map(f64::trunc);

        let as_i64 = || match json {
            Json::Number(n) => n.as_i64().or_else(|| {
                truncated(n)
                    .filter(|t| *t >= i64::MIN as f64 && *t < i64::MAX as f64)
                    .map(|t| t as i64)
            }),
            Json::String(s) => s.trim().parse().ok(),
            Json::Bool(b) => Some(i64::from(*b)),
            _ => None,
        };
        let as_u64 = || match json {
            Json::Number(n) => n.as_u64().or_else(|| {
                truncated(n)
                    .filter(|t| *t >= 0.0 && *t < u64::MAX as f64)
                    .map(|t| t as u64)
            }),
            Json::String(s) => s.trim().parse().ok(),
            _ => None,
        };

        match self {
            Syntax::Integer32 => as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Value::Integer),
            Syntax::Counter32 => as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(Value::Counter32),
            Syntax::Gauge32 => as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(Value::Gauge32),
            Syntax::TimeTicks => as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(Value::TimeTicks),
            Syntax::Counter64 => as_u64().map(Value::Counter64),
            Syntax::OctetString => match json {
                Json::String(s) => Some(Value::from(s.as_str())),
                Json::Number(n) => Some(Value::from(n.to_string())),
                Json::Bool(b) => Some(Value::from(b.to_string())),
                _ => None,
            },
            Syntax::ObjectIdentifier => match json {
                Json::String(s) => Oid::parse(s).ok().map(Value::ObjectIdentifier),
                _ => None,
            },
            Syntax::IpAddress => match json {
                Json::String(s) => s
                    .trim()
                    .parse::<std::net::Ipv4Addr>()
                    .ok()
                    .map(|addr| Value::IpAddress(addr.octets())),
                _ => None,
            },
        }
    }
}

impl std::fmt::Display for Syntax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Syntax::Integer32 => "Integer32",
            Syntax::OctetString => "OCTET STRING",
            Syntax::ObjectIdentifier => "OBJECT IDENTIFIER",
            Syntax::IpAddress => "IpAddress",
            Syntax::Counter32 => "Counter32",
            Syntax::Gauge32 => "Gauge32",
            Syntax::TimeTicks => "TimeTicks",
            Syntax::Counter64 => "Counter64",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use serde_json::json;

    fn roundtrip(value: Value) -> Value {
        let mut buf = EncodeBuf::new();
        value.encode(&mut buf);
        let mut decoder = Decoder::new(buf.finish());
        Value::decode(&mut decoder).unwrap()
    }

    #[test]
    fn test_roundtrip_agent_types() {
        for value in [
            Value::Integer(-42),
            Value::Integer(i32::MAX),
            Value::OctetString(Bytes::from_static(b"")),
            Value::OctetString(Bytes::from_static(b"eth0")),
            Value::ObjectIdentifier(oid!(1, 3, 6, 1, 4, 1, 99999)),
            Value::IpAddress([10, 0, 0, 1]),
            Value::Counter32(u32::MAX),
            Value::Gauge32(7),
            Value::TimeTicks(360000),
            Value::Counter64(u64::MAX),
            Value::NoSuchObject,
            Value::NoSuchInstance,
            Value::EndOfMibView,
        ] {
            assert_eq!(roundtrip(value.clone()), value);
        }
    }

    #[test]
    fn test_unknown_tag_preserved() {
        let value = Value::Unknown {
            tag: 0x47,
            data: Bytes::from_static(&[1, 2, 3]),
        };
        assert_eq!(roundtrip(value.clone()), value);
    }

    #[test]
    fn test_reject_constructed_octet_string() {
        let mut decoder = Decoder::from_slice(&[0x24, 0x03, 0x04, 0x01, 0x41]);
        let err = Value::decode(&mut decoder).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::ConstructedOctetString,
                ..
            }
        ));
    }

    #[test]
    fn test_decode_invalid_null_length() {
        let mut decoder = Decoder::from_slice(&[0x05, 0x01, 0x00]);
        assert!(Value::decode(&mut decoder).is_err());
    }

    #[test]
    fn test_decode_invalid_ip_address_length() {
        let mut decoder = Decoder::from_slice(&[0x40, 0x03, 0x01, 0x02, 0x03]);
        assert!(Value::decode(&mut decoder).is_err());
    }

    #[test]
    fn test_exception_content_skipped() {
        let mut decoder = Decoder::from_slice(&[0x80, 0x01, 0xFF, 0x05, 0x00]);
        assert_eq!(Value::decode(&mut decoder).unwrap(), Value::NoSuchObject);
        assert_eq!(Value::decode(&mut decoder).unwrap(), Value::Null);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Integer(-5).to_string(), "-5");
        assert_eq!(Value::from("up").to_string(), "up");
        assert_eq!(
            Value::OctetString(Bytes::from_static(&[0xFF, 0x00])).to_string(),
            "0xff00"
        );
        assert_eq!(Value::TimeTicks(9_000_000).to_string(), "1d 1h 0m 0s");
        assert_eq!(Value::IpAddress([192, 168, 1, 1]).to_string(), "192.168.1.1");
        assert_eq!(Value::NoSuchObject.to_string(), "noSuchObject");
        assert_eq!(Value::EndOfMibView.to_string(), "endOfMibView");
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Integer(3).as_i32(), Some(3));
        assert_eq!(Value::Integer(-1).as_u32(), None);
        assert_eq!(Value::TimeTicks(9).as_u32(), Some(9));
        assert_eq!(Value::from("ab").as_bytes(), Some(&b"ab"[..]));
        assert!(Value::EndOfMibView.is_exception());
        assert!(!Value::Null.is_exception());
    }

    #[test]
    fn test_coerce_integer32() {
        assert_eq!(Syntax::Integer32.coerce(&json!(42)), Some(Value::Integer(42)));
        assert_eq!(Syntax::Integer32.coerce(&json!(" -7 ")), Some(Value::Integer(-7)));
        assert_eq!(Syntax::Integer32.coerce(&json!(true)), Some(Value::Integer(1)));
        assert_eq!(Syntax::Integer32.coerce(&json!(3_000_000_000u64)), None);
        assert_eq!(Syntax::Integer32.coerce(&json!("n/a")), None);
        assert_eq!(Syntax::Integer32.coerce(&json!(null)), None);
    }

    #[test]
    fn test_coerce_timeticks() {
        assert_eq!(
            Syntax::TimeTicks.coerce(&json!(123456)),
            Some(Value::TimeTicks(123456))
        );
        assert_eq!(Syntax::TimeTicks.coerce(&json!(-1)), None);
    }

    #[test]
    fn test_coerce_fractional_numbers_truncate() {
        assert_eq!(Syntax::Integer32.coerce(&json!(21.5)), Some(Value::Integer(21)));
        assert_eq!(Syntax::Integer32.coerce(&json!(-21.5)), Some(Value::Integer(-21)));
        assert_eq!(
            Syntax::TimeTicks.coerce(&json!(1234.0)),
            Some(Value::TimeTicks(1234))
        );
        assert_eq!(Syntax::Gauge32.coerce(&json!(0.75)), Some(Value::Gauge32(0)));
        assert_eq!(Syntax::Counter32.coerce(&json!(-3.5)), None);
        assert_eq!(Syntax::Integer32.coerce(&json!(3.0e10)), None);
        assert_eq!(Syntax::TimeTicks.coerce(&json!(5.0e9)), None);
        assert_eq!(Syntax::Counter64.coerce(&json!(1.0e30)), None);
        assert_eq!(Syntax::Integer32.coerce(&json!("21.5")), None);
    }

    #[test]
    fn test_coerce_strings() {
        assert_eq!(
            Syntax::OctetString.coerce(&json!("rack-4")),
            Some(Value::from("rack-4"))
        );
        assert_eq!(Syntax::OctetString.coerce(&json!(17)), Some(Value::from("17")));
        assert_eq!(
            Syntax::IpAddress.coerce(&json!("10.1.2.3")),
            Some(Value::IpAddress([10, 1, 2, 3]))
        );
        assert_eq!(Syntax::IpAddress.coerce(&json!("10.1.2")), None);
        assert_eq!(
            Syntax::ObjectIdentifier.coerce(&json!(".1.3.6.1")),
            Some(Value::ObjectIdentifier(oid!(1, 3, 6, 1)))
        );
    }

    #[test]
    fn test_accepts() {
        assert!(Syntax::Integer32.accepts(&Value::Integer(1)));
        assert!(!Syntax::Integer32.accepts(&Value::TimeTicks(1)));
        assert!(!Syntax::OctetString.accepts(&Value::NoSuchObject));
    }

    #[test]
    fn test_syntax_deserialize() {
        let syntax: Syntax = serde_json::from_value(json!("TimeTicks")).unwrap();
        assert_eq!(syntax, Syntax::TimeTicks);
        assert!(serde_json::from_value::<Syntax>(json!("Float")).is_err());
    }
}
