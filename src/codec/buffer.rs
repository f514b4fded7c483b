//! Bounded, geometrically growing output buffer used by the encoder.

use super::wire;
use crate::config::CodecConfig;
use crate::error::{HekaError, Result};

/// Byte buffer with a hard size ceiling.
///
/// Growth rounds the required size up to the next power of two (clamped to
/// the ceiling) and goes through `Vec::try_reserve_exact`, so a failed
/// allocation reports [`HekaError::AllocationFailed`] and leaves the bytes
/// already written untouched. Every write reserves before it touches the
/// vector; a write that would cross the ceiling fails without modifying the
/// buffer.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    data: Vec<u8>,
    max_size: usize,
}

impl OutputBuffer {
    /// `initial_capacity` is a hint; an allocation it can not get is left
    /// to the first write.
    pub fn new(initial_capacity: usize, max_size: usize) -> Self {
        let mut data = Vec::new();
        let _ = data.try_reserve_exact(initial_capacity.min(max_size));
        Self { data, max_size }
    }

    pub fn with_config(config: &CodecConfig) -> Self {
        Self::new(config.initial_buffer_capacity, config.max_message_size)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Drop the contents, keeping the allocation for the next message.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Make room for `additional` more bytes.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let required = self.data.len().saturating_add(additional);
        if required > self.max_size {
            return Err(HekaError::SizeLimitExceeded {
                size: required,
                limit: self.max_size,
            });
        }
        if required <= self.data.capacity() {
            return Ok(());
        }

        let target = required
            .checked_next_power_of_two()
            .unwrap_or(required)
            .min(self.max_size);
        self.data
            .try_reserve_exact(target - self.data.len())
            .map_err(|_| HekaError::AllocationFailed { requested: target })
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.reserve(1)?;
        self.data.push(byte);
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    pub fn write_varint(&mut self, value: u64) -> Result<()> {
        self.reserve(wire::varint_len(value))?;
        wire::write_varint(&mut self.data, value);
        Ok(())
    }

    pub fn write_key(&mut self, tag: u32, wiretype: u8) -> Result<()> {
        self.reserve(wire::key_len(tag))?;
        wire::write_key(&mut self.data, tag, wiretype);
        Ok(())
    }

    /// Write `tag` with the length-delimited wiretype followed by `bytes`.
    pub fn write_string(&mut self, tag: u32, bytes: &[u8]) -> Result<()> {
        self.reserve(wire::key_len(tag) + wire::varint_len(bytes.len() as u64) + bytes.len())?;
        wire::write_key(&mut self.data, tag, wire::WIRETYPE_LENGTH_DELIMITED);
        wire::write_length_delimited(&mut self.data, bytes);
        Ok(())
    }

    pub fn write_double(&mut self, value: f64) -> Result<()> {
        self.reserve(8)?;
        wire::write_double(&mut self.data, value);
        Ok(())
    }

    /// Write a one byte length placeholder and return its position for a
    /// later [`backpatch_length`](Self::backpatch_length).
    pub fn write_length_placeholder(&mut self) -> Result<usize> {
        let pos = self.data.len();
        self.write_byte(0)?;
        Ok(pos)
    }

    /// Replace the placeholder at `pos` with the varint length of everything
    /// written after it.
    ///
    /// Lengths under 128 fit the placeholder. Longer runs shift the payload
    /// right to widen the prefix; if that growth fails the buffer is left as
    /// it was.
    pub fn backpatch_length(&mut self, pos: usize) -> Result<()> {
        if pos >= self.data.len() {
            return Err(HekaError::InvalidLength {
                tag: 0,
                length: pos,
                offset: self.data.len(),
            });
        }

        let len = self.data.len() - pos - 1;
        if len < 0x80 {
            self.data[pos] = len as u8;
            return Ok(());
        }

        let mut prefix = [0u8; wire::MAX_VARINT_BYTES];
        let width = wire::encode_varint(len as u64, &mut prefix);
        let extra = width - 1;
        self.reserve(extra)?;

        let end = self.data.len();
        self.data.resize(end + extra, 0);
        self.data.copy_within(pos + 1..end, pos + width);
        self.data[pos..pos + width].copy_from_slice(&prefix[..width]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::wire::read_length_delimited;

    #[test]
    fn test_geometric_growth() {
        let mut buffer = OutputBuffer::new(8, 1024);
        assert!(buffer.capacity() >= 8);

        buffer.write_bytes(&[1u8; 9]).unwrap();
        assert!(buffer.capacity() >= 16);

        buffer.write_bytes(&[2u8; 100]).unwrap();
        assert!(buffer.capacity() >= 128);
        assert_eq!(buffer.len(), 109);
    }

    #[test]
    fn test_size_ceiling() {
        let mut buffer = OutputBuffer::new(4, 10);
        buffer.write_bytes(b"0123456789").unwrap();
        assert_eq!(
            buffer.write_byte(b'x'),
            Err(HekaError::SizeLimitExceeded { size: 11, limit: 10 })
        );
        assert_eq!(buffer.as_slice(), b"0123456789");
    }

    #[test]
    fn test_failed_write_leaves_buffer_unchanged() {
        let mut buffer = OutputBuffer::new(4, 6);
        buffer.write_bytes(b"abc").unwrap();
        assert!(buffer.write_string(1, b"toolong").is_err());
        assert_eq!(buffer.as_slice(), b"abc");
    }

    #[test]
    fn test_short_backpatch() {
        let mut buffer = OutputBuffer::new(16, 1024);
        buffer.write_key(10, wire::WIRETYPE_LENGTH_DELIMITED).unwrap();
        let pos = buffer.write_length_placeholder().unwrap();
        buffer.write_bytes(b"hello").unwrap();
        buffer.backpatch_length(pos).unwrap();

        assert_eq!(buffer.as_slice(), b"\x52\x05hello");
    }

    #[test]
    fn test_backpatch_shifts_long_payload() {
        let payload: Vec<u8> = (0..300u32).map(|i| i as u8).collect();
        let mut buffer = OutputBuffer::new(16, 4096);
        buffer.write_byte(0xaa).unwrap();
        let pos = buffer.write_length_placeholder().unwrap();
        buffer.write_bytes(&payload).unwrap();
        buffer.write_byte(0xbb).unwrap();
        buffer.backpatch_length(pos).unwrap();

        let bytes = buffer.as_slice();
        assert_eq!(bytes[0], 0xaa);
        assert_eq!(&bytes[1..3], &[0xad, 0x02]);
        let (run, next) = read_length_delimited(bytes, 1).unwrap();
        assert_eq!(&run[..300], &payload[..]);
        assert_eq!(run[300], 0xbb);
        assert_eq!(next, bytes.len());
    }

    #[test]
    fn test_backpatch_boundary() {
        let mut buffer = OutputBuffer::new(16, 4096);
        let pos = buffer.write_length_placeholder().unwrap();
        buffer.write_bytes(&[7u8; 127]).unwrap();
        buffer.backpatch_length(pos).unwrap();
        assert_eq!(buffer.len(), 128);
        assert_eq!(buffer.as_slice()[0], 127);

        buffer.clear();
        let pos = buffer.write_length_placeholder().unwrap();
        buffer.write_bytes(&[7u8; 128]).unwrap();
        buffer.backpatch_length(pos).unwrap();
        assert_eq!(buffer.len(), 130);
        assert_eq!(&buffer.as_slice()[..2], &[0x80, 0x01]);
    }

    #[test]
    fn test_backpatch_over_ceiling() {
        let mut buffer = OutputBuffer::new(16, 129);
        let pos = buffer.write_length_placeholder().unwrap();
        buffer.write_bytes(&[1u8; 128]).unwrap();
        assert!(matches!(
            buffer.backpatch_length(pos),
            Err(HekaError::SizeLimitExceeded { .. })
        ));
        assert_eq!(buffer.len(), 129);
        assert_eq!(buffer.as_slice()[0], 0);
    }

    #[test]
    fn test_backpatch_invalid_position() {
        let mut buffer = OutputBuffer::new(16, 64);
        assert!(buffer.backpatch_length(0).is_err());
    }
}
