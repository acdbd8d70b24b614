//! Object Identifier (OID) type.
//!
//! OIDs are stored as `SmallVec<[u32; 16]>`; the enterprise scalars served by
//! the agent are well under 16 arcs, so lookups never touch the heap.
//!
//! Ordering is lexicographic by arc, with a shorter OID sorting first when it
//! is a prefix of the longer one. This is the order used by the object store
//! and therefore the order of every GETNEXT/GETBULK walk.

use crate::error::{DecodeErrorKind, Error, OidErrorKind, Result};
use smallvec::SmallVec;
use std::fmt;

/// Maximum number of arcs (subidentifiers) allowed in an OID.
///
/// Per RFC 2578 Section 3.5: "there are at most 128 sub-identifiers in a value".
pub const MAX_OID_LEN: usize = 128;

/// Object Identifier.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Oid {
    arcs: SmallVec<[u32; 16]>,
}

impl Oid {
    /// Create an empty OID.
    pub fn empty() -> Self {
        Self {
            arcs: SmallVec::new(),
        }
    }

    /// Create an OID from arc values.
    ///
    /// ```
    /// use async_snmp_agent::oid::Oid;
    ///
    /// let oid = Oid::new([1, 3, 6, 1, 4, 1, 99999]);
    /// assert_eq!(oid.len(), 7);
    /// ```
    pub fn new(arcs: impl IntoIterator<Item = u32>) -> Self {
        Self {
            arcs: arcs.into_iter().collect(),
        }
    }

    /// Create an OID from a slice of arcs.
    pub fn from_slice(arcs: &[u32]) -> Self {
        Self {
            arcs: SmallVec::from_slice(arcs),
        }
    }

    /// Parse an OID from dotted notation.
    ///
    /// A leading dot is accepted (`.1.3.6.1` and `1.3.6.1` are the same OID),
    /// since that is how net-snmp tools print absolute OIDs.
    ///
    /// ```
    /// use async_snmp_agent::oid::Oid;
    ///
    /// let a = Oid::parse(".1.3.6.1.4.1.99999.1.1.0").unwrap();
    /// let b = Oid::parse("1.3.6.1.4.1.99999.1.1.0").unwrap();
    /// assert_eq!(a, b);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('.').unwrap_or(trimmed);
        if body.is_empty() {
            return Ok(Self::empty());
        }

        let mut arcs = SmallVec::new();
        for part in body.split('.') {
            let arc: u32 = part.parse().map_err(|_| {
                Error::invalid_oid_with_input(OidErrorKind::InvalidArc, s.to_string())
            })?;
            arcs.push(arc);
        }

        let oid = Self { arcs };
        oid.validate_length()?;
        Ok(oid)
    }

    /// Get the arc values.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Get the number of arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Check if the OID is empty.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Check if this OID equals `other` or lies beneath it.
    ///
    /// ```
    /// use async_snmp_agent::oid;
    ///
    /// let scalar = oid!(1, 3, 6, 1, 4, 1, 99999, 1, 1, 0);
    /// assert!(scalar.starts_with(&oid!(1, 3, 6, 1, 4, 1, 99999)));
    /// assert!(scalar.starts_with(&scalar));
    /// assert!(!scalar.starts_with(&oid!(1, 3, 6, 1, 2, 1)));
    /// ```
    pub fn starts_with(&self, other: &Oid) -> bool {
        self.arcs.len() >= other.arcs.len() && self.arcs[..other.arcs.len()] == other.arcs[..]
    }

    /// Create a child OID by appending an arc.
    pub fn child(&self, arc: u32) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.push(arc);
        Oid { arcs }
    }

    /// Create a descendant OID by appending every arc of `suffix`.
    ///
    /// ```
    /// use async_snmp_agent::oid;
    ///
    /// let root = oid!(1, 3, 6, 1, 4, 1, 99999);
    /// assert_eq!(root.join(&oid!(1, 28, 0)), oid!(1, 3, 6, 1, 4, 1, 99999, 1, 28, 0));
    /// ```
    pub fn join(&self, suffix: &Oid) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.extend_from_slice(&suffix.arcs);
        Oid { arcs }
    }

    /// Validate OID arcs per X.690 Section 8.19.4.
    ///
    /// arc1 must be 0, 1, or 2; arc2 must be <= 39 when arc1 is 0 or 1.
    pub fn validate(&self) -> Result<()> {
        let Some(&arc1) = self.arcs.first() else {
            return Ok(());
        };

        if arc1 > 2 {
            return Err(Error::invalid_oid(OidErrorKind::InvalidFirstArc(arc1)));
        }

        if let Some(&arc2) = self.arcs.get(1)
            && arc1 < 2
            && arc2 >= 40
        {
            return Err(Error::invalid_oid(OidErrorKind::InvalidSecondArc {
                first: arc1,
                second: arc2,
            }));
        }

        Ok(())
    }

    /// Validate that the OID doesn't exceed [`MAX_OID_LEN`].
    pub fn validate_length(&self) -> Result<()> {
        if self.arcs.len() > MAX_OID_LEN {
            return Err(Error::invalid_oid(OidErrorKind::TooManyArcs {
                count: self.arcs.len(),
                max: MAX_OID_LEN,
            }));
        }
        Ok(())
    }

    /// Encode to BER content octets (X.690 Section 8.19).
    ///
    /// The first two arcs share one subidentifier, `arc1 * 40 + arc2`;
    /// the remainder are base-128 with a continuation bit.
    pub fn to_ber_smallvec(&self) -> SmallVec<[u8; 64]> {
        let mut bytes = SmallVec::new();

        match self.arcs.len() {
            0 => return bytes,
            1 => encode_subidentifier(&mut bytes, self.arcs[0].saturating_mul(40)),
            _ => {
                let first = self.arcs[0]
                    .saturating_mul(40)
                    .saturating_add(self.arcs[1]);
                encode_subidentifier(&mut bytes, first);
            }
        }

        for &arc in self.arcs.iter().skip(2) {
            encode_subidentifier(&mut bytes, arc);
        }

        bytes
    }

    /// Encode to BER content octets as a `Vec`.
    pub fn to_ber(&self) -> Vec<u8> {
        self.to_ber_smallvec().to_vec()
    }

    /// Decode from BER content octets.
    ///
    /// Enforces [`MAX_OID_LEN`].
    pub fn from_ber(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::empty());
        }

        let mut arcs = SmallVec::new();

        let (first_subid, consumed) = decode_subidentifier(data, 0)?;
        match first_subid {
            0..40 => {
                arcs.push(0);
                arcs.push(first_subid);
            }
            40..80 => {
                arcs.push(1);
                arcs.push(first_subid - 40);
            }
            _ => {
                arcs.push(2);
                arcs.push(first_subid - 80);
            }
        }

        let mut i = consumed;
        while i < data.len() {
            let (arc, used) = decode_subidentifier(&data[i..], i)?;
            arcs.push(arc);
            i += used;

            if arcs.len() > MAX_OID_LEN {
                return Err(Error::decode(
                    i,
                    DecodeErrorKind::OidTooLong {
                        count: arcs.len(),
                        max: MAX_OID_LEN,
                    },
                ));
            }
        }

        Ok(Self { arcs })
    }
}

#[inline]
fn encode_subidentifier(bytes: &mut SmallVec<[u8; 64]>, value: u32) {
    if value == 0 {
        bytes.push(0);
        return;
    }

    let groups = (32 - value.leading_zeros()).div_ceil(7);
    for i in (0..groups).rev() {
        let mut byte = ((value >> (i * 7)) & 0x7F) as u8;
        if i > 0 {
            byte |= 0x80;
        }
        bytes.push(byte);
    }
}

/// Decode a subidentifier, returning (value, bytes_consumed).
///
/// `base` is the offset of `data` within the OID content, for error reporting.
fn decode_subidentifier(data: &[u8], base: usize) -> Result<(u32, usize)> {
    let mut value: u32 = 0;

    for (i, &byte) in data.iter().enumerate() {
        if value > (u32::MAX >> 7) {
            return Err(Error::decode(base + i, DecodeErrorKind::IntegerOverflow));
        }

        value = (value << 7) | u32::from(byte & 0x7F);

        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }

    Err(Error::decode(
        base + data.len(),
        DecodeErrorKind::InvalidOidEncoding,
    ))
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.arcs {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", arc)?;
            first = false;
        }
        Ok(())
    }
}

impl std::str::FromStr for Oid {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// OIDs are written as dotted strings in configuration files.
impl<'de> serde::Deserialize<'de> for Oid {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl From<&[u32]> for Oid {
    fn from(arcs: &[u32]) -> Self {
        Self::from_slice(arcs)
    }
}

impl<const N: usize> From<[u32; N]> for Oid {
    fn from(arcs: [u32; N]) -> Self {
        Self::new(arcs)
    }
}

impl PartialOrd for Oid {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Oid {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.arcs.cmp(&other.arcs)
    }
}

/// Build an [`Oid`] from literal arcs.
///
/// ```
/// use async_snmp_agent::oid;
///
/// let enterprise = oid!(1, 3, 6, 1, 4, 1, 99999);
/// assert_eq!(enterprise.to_string(), "1.3.6.1.4.1.99999");
/// ```
#[macro_export]
macro_rules! oid {
    ($($arc:expr),* $(,)?) => {
        $crate::oid::Oid::from_slice(&[$($arc),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn test_parse() {
        let oid = Oid::parse("1.3.6.1.4.1.99999.1.1.0").unwrap();
        assert_eq!(oid.arcs(), &[1, 3, 6, 1, 4, 1, 99999, 1, 1, 0]);
    }

    #[test]
    fn test_parse_leading_dot() {
        let oid = Oid::parse(".1.3.6.1").unwrap();
        assert_eq!(oid, oid!(1, 3, 6, 1));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Oid::parse("1.3.abc.1").is_err());
        assert!(Oid::parse("1.3.-6.1").is_err());
        assert!(Oid::parse("1..3").is_err());
    }

    #[test]
    fn test_parse_rejects_too_long() {
        let s = vec!["1"; MAX_OID_LEN + 1].join(".");
        assert!(Oid::parse(&s).is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let original = oid!(1, 3, 6, 1, 4, 1, 99999, 1, 39, 0);
        let parsed: Oid = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_order_is_lexicographic_by_arc() {
        // 1.10 sorts after 1.9 numerically, not textually
        assert!(oid!(1, 3, 6, 1, 9) < oid!(1, 3, 6, 1, 10));
        assert!(oid!(1, 1, 39, 0) > oid!(1, 1, 4, 0));
    }

    #[test]
    fn test_order_prefix_sorts_first() {
        let parent = oid!(1, 3, 6, 1, 4, 1, 99999, 1, 1);
        let child = parent.child(0);
        assert_eq!(parent.cmp(&child), Ordering::Less);
        assert!(Oid::empty() < parent);
    }

    #[test]
    fn test_starts_with() {
        let oid = oid!(1, 3, 6, 1, 4, 1, 99999, 1, 1, 0);
        assert!(oid.starts_with(&oid!(1, 3, 6, 1)));
        assert!(!oid!(1, 3, 6, 1).starts_with(&oid));
        assert!(oid.starts_with(&Oid::empty()));
        // Sibling with a shared numeric prefix is not a descendant
        assert!(!oid!(1, 3, 6, 1, 4, 1, 999990).starts_with(&oid!(1, 3, 6, 1, 4, 1, 99999)));
    }

    #[test]
    fn test_join() {
        let root = oid!(1, 3, 6, 1, 4, 1, 99999);
        assert_eq!(root.join(&Oid::empty()), root);
        assert_eq!(root.join(&oid!(1, 5, 0)).len(), 10);
    }

    #[test]
    fn test_ber_encoding() {
        // 1.3.6.1 encodes as: (1*40+3)=43, 6, 1
        assert_eq!(oid!(1, 3, 6, 1).to_ber(), vec![0x2B, 0x06, 0x01]);
    }

    #[test]
    fn test_ber_encoding_enterprise_arc() {
        // 99999 = 0b110_0001101_0011111 -> 0x86 0x8D 0x1F
        let oid = oid!(1, 3, 6, 1, 4, 1, 99999);
        assert_eq!(oid.to_ber(), vec![0x2B, 0x06, 0x01, 0x04, 0x01, 0x86, 0x8D, 0x1F]);
    }

    #[test]
    fn test_ber_roundtrip_large_arc2() {
        let oid = oid!(2, 999, 3);
        let ber = oid.to_ber();
        assert_eq!(ber, vec![0x88, 0x37, 0x03]);
        assert_eq!(Oid::from_ber(&ber).unwrap(), oid);
    }

    #[test]
    fn test_from_ber_truncated_subidentifier() {
        // Continuation bit set on final byte
        assert!(Oid::from_ber(&[0x2B, 0x86]).is_err());
    }

    #[test]
    fn test_from_ber_overflow() {
        assert!(Oid::from_ber(&[0x2B, 0x8F, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F]).is_err());
    }

    #[test]
    fn test_from_ber_enforces_max_oid_len() {
        let mut at_limit = vec![0x2B];
        at_limit.extend(std::iter::repeat_n(0x01, MAX_OID_LEN - 2));
        assert_eq!(Oid::from_ber(&at_limit).unwrap().len(), MAX_OID_LEN);

        let mut over_limit = vec![0x2B];
        over_limit.extend(std::iter::repeat_n(0x01, MAX_OID_LEN - 1));
        assert!(Oid::from_ber(&over_limit).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(oid!(1, 3, 6, 1).validate().is_ok());
        assert!(oid!(3, 0).validate().is_err());
        assert!(oid!(0, 40).validate().is_err());
        assert!(oid!(2, 999).validate().is_ok());
    }
}
