//! Primitive wire encoding: varints, tag keys, length-delimited runs and
//! fixed-width doubles.
//!
//! Readers take the whole buffer plus a starting position and return the value
//! together with the position just past it, so every error can carry an
//! absolute byte offset. Writers append to a `Vec<u8>`; callers that enforce a
//! size ceiling reserve space first (see [`OutputBuffer`](super::OutputBuffer)).
//!
//! Doubles are stored little-endian on the wire.

use crate::error::{HekaError, Result};

/// Wiretype of a base-128 varint.
pub const WIRETYPE_VARINT: u8 = 0;
/// Wiretype of an 8 byte fixed-width value.
pub const WIRETYPE_FIXED64: u8 = 1;
/// Wiretype of a varint length followed by that many bytes.
pub const WIRETYPE_LENGTH_DELIMITED: u8 = 2;

/// A 64-bit value never needs more than ten 7-bit groups.
pub const MAX_VARINT_BYTES: usize = 10;

/// Read a varint starting at `pos`.
///
/// Returns the value and the position of the first byte after it.
pub fn read_varint(buf: &[u8], pos: usize) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    for i in 0..MAX_VARINT_BYTES {
        let Some(&byte) = buf.get(pos + i) else {
            return Err(HekaError::TruncatedBuffer {
                offset: pos,
                needed: i + 1,
                available: buf.len().saturating_sub(pos),
            });
        };
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, pos + i + 1));
        }
    }
    Err(HekaError::MalformedVarint { offset: pos })
}

/// Number of bytes `value` occupies as a varint.
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Encode `value` into `out`, returning the number of bytes used.
pub(crate) fn encode_varint(mut value: u64, out: &mut [u8; MAX_VARINT_BYTES]) -> usize {
    let mut n = 0;
    while value > 0x7f {
        out[n] = (value as u8 & 0x7f) | 0x80;
        value >>= 7;
        n += 1;
    }
    out[n] = value as u8;
    n + 1
}

/// Append `value` as a varint. Zero is the single byte `0x00`.
pub fn write_varint(out: &mut Vec<u8>, value: u64) {
    let mut scratch = [0u8; MAX_VARINT_BYTES];
    let n = encode_varint(value, &mut scratch);
    out.extend_from_slice(&scratch[..n]);
}

/// Read a tag key: `(field_id << 3) | wiretype`, itself a varint so ids above
/// 15 take more than one byte.
pub fn read_key(buf: &[u8], pos: usize) -> Result<(u32, u8, usize)> {
    let (key, next) = read_varint(buf, pos)?;
    let tag = u32::try_from(key >> 3).map_err(|_| HekaError::MalformedVarint { offset: pos })?;
    Ok((tag, (key & 0x7) as u8, next))
}

/// Append a tag key.
pub fn write_key(out: &mut Vec<u8>, tag: u32, wiretype: u8) {
    write_varint(out, (u64::from(tag) << 3) | u64::from(wiretype & 0x7));
}

/// Number of bytes a tag key occupies.
pub fn key_len(tag: u32) -> usize {
    varint_len(u64::from(tag) << 3)
}

/// Read a varint length prefix and borrow the bytes it covers.
pub fn read_length_delimited(buf: &[u8], pos: usize) -> Result<(&[u8], usize)> {
    let (len, start) = read_varint(buf, pos)?;
    let available = buf.len() - start;
    let len = usize::try_from(len).map_err(|_| HekaError::MalformedVarint { offset: pos })?;
    if len > available {
        return Err(HekaError::TruncatedBuffer {
            offset: start,
            needed: len,
            available,
        });
    }
    Ok((&buf[start..start + len], start + len))
}

/// Append a varint length prefix followed by `bytes`.
pub fn write_length_delimited(out: &mut Vec<u8>, bytes: &[u8]) {
    write_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

/// Read an 8 byte little-endian double.
pub fn read_double(buf: &[u8], pos: usize) -> Result<(f64, usize)> {
    let end = pos + 8;
    let bytes: [u8; 8] = buf
        .get(pos..end)
        .and_then(|b| b.try_into().ok())
        .ok_or(HekaError::TruncatedBuffer {
            offset: pos,
            needed: 8,
            available: buf.len().saturating_sub(pos),
        })?;
    Ok((f64::from_le_bytes(bytes), end))
}

/// Append an 8 byte little-endian double.
pub fn write_double(out: &mut Vec<u8>, value: f64) {
    out.extend_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varint(value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        write_varint(&mut out, value);
        out
    }

    #[test]
    fn test_zero_is_single_byte() {
        assert_eq!(varint(0), vec![0x00]);
        assert_eq!(varint_len(0), 1);
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(varint(1), vec![0x01]);
        assert_eq!(varint(127), vec![0x7f]);
        assert_eq!(varint(128), vec![0x80, 0x01]);
        assert_eq!(varint(300), vec![0xac, 0x02]);
        assert_eq!(varint(u64::MAX).len(), MAX_VARINT_BYTES);
        assert_eq!(*varint(u64::MAX).last().unwrap(), 0x01);
    }

    #[test]
    fn test_varint_boundaries() {
        let samples = [
            0u64,
            1,
            127,
            128,
            16_383,
            16_384,
            u32::MAX as u64,
            1_428_773_426_113_040_228,
            i64::MAX as u64,
            (-1i64) as u64,
            u64::MAX,
        ];
        for value in samples {
            let bytes = varint(value);
            assert_eq!(bytes.len(), varint_len(value), "length of {value}");
            let (decoded, next) = read_varint(&bytes, 0).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(next, bytes.len());
        }
    }

    #[test]
    fn test_read_varint_at_offset() {
        let buf = [0xff, 0xac, 0x02, 0x05];
        assert_eq!(read_varint(&buf, 1).unwrap(), (300, 3));
        assert_eq!(read_varint(&buf, 3).unwrap(), (5, 4));
    }

    #[test]
    fn test_unterminated_varint() {
        let buf = [0x80u8; 11];
        assert_eq!(
            read_varint(&buf, 0),
            Err(HekaError::MalformedVarint { offset: 0 })
        );

        let buf = [0x80, 0x80];
        assert!(matches!(
            read_varint(&buf, 0),
            Err(HekaError::TruncatedBuffer { offset: 0, .. })
        ));
        assert!(matches!(
            read_varint(&buf, 2),
            Err(HekaError::TruncatedBuffer { .. })
        ));
    }

    #[test]
    fn test_keys() {
        let mut out = Vec::new();
        write_key(&mut out, 1, WIRETYPE_LENGTH_DELIMITED);
        assert_eq!(out, vec![0x0a]);
        assert_eq!(read_key(&out, 0).unwrap(), (1, WIRETYPE_LENGTH_DELIMITED, 1));

        out.clear();
        write_key(&mut out, 10, WIRETYPE_LENGTH_DELIMITED);
        assert_eq!(out, vec![0x52]);

        // ids above 15 need a second byte
        out.clear();
        write_key(&mut out, 16, WIRETYPE_VARINT);
        assert_eq!(out, vec![0x80, 0x01]);
        assert_eq!(key_len(16), 2);
        assert_eq!(read_key(&out, 0).unwrap(), (16, WIRETYPE_VARINT, 2));

        out.clear();
        write_key(&mut out, 3000, WIRETYPE_FIXED64);
        assert_eq!(read_key(&out, 0).unwrap(), (3000, WIRETYPE_FIXED64, out.len()));
    }

    #[test]
    fn test_length_delimited() {
        let mut out = vec![0xee];
        write_length_delimited(&mut out, b"GoSpec");
        assert_eq!(out[1], 6);
        let (bytes, next) = read_length_delimited(&out, 1).unwrap();
        assert_eq!(bytes, b"GoSpec");
        assert_eq!(next, out.len());

        let (bytes, next) = read_length_delimited(&[0x00], 0).unwrap();
        assert!(bytes.is_empty());
        assert_eq!(next, 1);
    }

    #[test]
    fn test_length_past_end() {
        let buf = [0x05, b'a', b'b'];
        assert_eq!(
            read_length_delimited(&buf, 0),
            Err(HekaError::TruncatedBuffer {
                offset: 1,
                needed: 5,
                available: 2
            })
        );
    }

    #[test]
    fn test_doubles_are_little_endian() {
        let mut out = Vec::new();
        write_double(&mut out, 1.0);
        assert_eq!(out, vec![0, 0, 0, 0, 0, 0, 0xf0, 0x3f]);
        assert_eq!(read_double(&out, 0).unwrap(), (1.0, 8));

        write_double(&mut out, 99.9);
        assert_eq!(read_double(&out, 8).unwrap(), (99.9, 16));

        assert!(matches!(
            read_double(&out[..7], 0),
            Err(HekaError::TruncatedBuffer { needed: 8, .. })
        ));
    }
}
