//! BER length encoding and decoding.
//!
//! Length encoding follows X.690 Section 8.1.3:
//! - Short form: single byte, bit 8=0, value 0-127
//! - Long form: initial byte (bit 8=1, bits 7-1=count), followed by length bytes
//! - Indefinite form (0x80): rejected

use crate::error::{DecodeErrorKind, Error, Result};

/// Maximum length accepted while decoding.
///
/// Far above any UDP datagram, so it only trips on hostile length fields.
pub const MAX_LENGTH: usize = 0x200000;

/// Encode a length, returning the bytes in reverse order for prepending.
pub fn encode_length(len: usize) -> ([u8; 5], usize) {
    let mut buf = [0u8; 5];

    if len <= 127 {
        buf[0] = len as u8;
        return (buf, 1);
    }

    let octets = (usize::BITS - len.leading_zeros()).div_ceil(8).min(4) as usize;
    for (i, slot) in buf.iter_mut().take(octets).enumerate() {
        *slot = (len >> (8 * i)) as u8;
    }
    buf[octets] = 0x80 | octets as u8;
    (buf, octets + 1)
}

/// Number of octets [`encode_length`] produces for `len`.
pub fn length_encoded_len(len: usize) -> usize {
    encode_length(len).1
}

/// Decode a length from bytes, returning (length, bytes_consumed).
///
/// `base_offset` is where `data` starts within the message, for error reporting.
pub fn decode_length(data: &[u8], base_offset: usize) -> Result<(usize, usize)> {
    let Some(&first) = data.first() else {
        return Err(Error::decode(base_offset, DecodeErrorKind::TruncatedData));
    };

    if first == 0x80 {
        return Err(Error::decode(
            base_offset,
            DecodeErrorKind::IndefiniteLength,
        ));
    }

    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }

    let num_octets = (first & 0x7F) as usize;
    if num_octets > 4 {
        return Err(Error::decode(
            base_offset,
            DecodeErrorKind::LengthTooLong { octets: num_octets },
        ));
    }

    let Some(octets) = data.get(1..=num_octets) else {
        return Err(Error::decode(base_offset, DecodeErrorKind::TruncatedData));
    };

    let len = octets
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | b as usize);

    if len > MAX_LENGTH {
        return Err(Error::decode(
            base_offset,
            DecodeErrorKind::LengthExceedsMax {
                length: len,
                max: MAX_LENGTH,
            },
        ));
    }

    Ok((len, 1 + num_octets))
}
