//! Stream framing.
//!
//! A framed record is laid out as
//!
//! ```text
//! 0x1E | header_len | header (header_len bytes) | 0x1F | message
//! ```
//!
//! where the header is itself an encoded record whose tag 1 carries the
//! message length as a varint. [`StreamReader`] accumulates bytes from any
//! source, locates records, and resynchronises on garbage by discarding one
//! byte at a time until the next plausible record separator.

use super::decoder::decode_into;
use super::message::Message;
use super::wire::{self, read_varint, MAX_VARINT_BYTES};
use crate::config::{CodecConfig, MAX_FRAME_HEADER_SIZE};
use crate::error::{HekaError, Result};
use tracing::{debug, warn};

/// Record separator opening every frame.
pub const RECORD_SEPARATOR: u8 = 0x1e;
/// Unit separator closing the header.
pub const UNIT_SEPARATOR: u8 = 0x1f;
/// Bytes of framing around the header: separator, length byte, unit separator.
pub const FRAME_OVERHEAD: usize = 3;

/// Header key for tag 1 with the varint wiretype.
const HEADER_LENGTH_KEY: u8 = 0x08;

/// Build the frame header for a message of `message_len` bytes.
pub fn write_frame_header(message_len: usize) -> Vec<u8> {
    let mut header = Vec::with_capacity(FRAME_OVERHEAD + 1 + MAX_VARINT_BYTES);
    header.push(RECORD_SEPARATOR);
    header.push(0);
    header.push(HEADER_LENGTH_KEY);
    wire::write_varint(&mut header, message_len as u64);
    header[1] = (header.len() - 2) as u8;
    header.push(UNIT_SEPARATOR);
    header
}

/// Read the message length out of a frame header body.
fn decode_header(header: &[u8], max_message_size: usize) -> Option<usize> {
    if header.first() != Some(&HEADER_LENGTH_KEY) {
        return None;
    }
    let (len, _) = read_varint(header, 1).ok()?;
    if len == 0 || len > max_message_size as u64 {
        warn!(
            max = max_message_size,
            len, "frame header rejected: message size out of range"
        );
        return None;
    }
    Some(len as usize)
}

/// Outcome of scanning the buffer for a record.
#[derive(Debug)]
enum Located {
    Pending,
    Frame { start: usize, end: usize },
}

/// Incremental reader for a stream of framed messages.
///
/// ```rust
/// use heka_matcher::codec::{write_frame_header, StreamReader};
///
/// let message = b"\x0a\x10\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff\x10\x01";
/// let mut reader = StreamReader::new(1024);
/// reader.append(&write_frame_header(message.len()))?;
/// assert!(reader.next_message().is_none());
///
/// reader.append(message)?;
/// let msg = reader.next_message().expect("complete record");
/// assert_eq!(msg.timestamp, 1);
/// # Ok::<(), heka_matcher::HekaError>(())
/// ```
#[derive(Debug)]
pub struct StreamReader {
    buf: Vec<u8>,
    scan: usize,
    max_message_size: usize,
    discarded: usize,
    message: Message,
}

impl StreamReader {
    pub fn new(max_message_size: usize) -> Self {
        Self::with_capacity(1024, max_message_size)
    }

    /// Build a reader with validated limits.
    pub fn with_config(config: &CodecConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_capacity(
            config.initial_buffer_capacity,
            config.max_message_size,
        ))
    }

    fn with_capacity(capacity: usize, max_message_size: usize) -> Self {
        let mut buf = Vec::new();
        let _ = buf.try_reserve_exact(capacity);
        Self {
            buf,
            scan: 0,
            max_message_size,
            discarded: 0,
            message: Message::default(),
        }
    }

    /// Largest amount of buffered data: one whole framed message.
    pub fn max_buffer_size(&self) -> usize {
        self.max_message_size.saturating_add(MAX_FRAME_HEADER_SIZE + FRAME_OVERHEAD)
    }

    /// Bytes buffered but not yet consumed.
    pub fn pending(&self) -> usize {
        self.buf.len() - self.scan
    }

    /// Bytes thrown away while resynchronising during the last
    /// `next_message`/`next_frame` call.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Queue more input.
    ///
    /// Consumed bytes are compacted away first; the call fails if the
    /// unconsumed data would then exceed [`max_buffer_size`](Self::max_buffer_size).
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        if self.scan > 0 {
            self.buf.drain(..self.scan);
            self.scan = 0;
        }
        let size = self.buf.len().saturating_add(data.len());
        if size > self.max_buffer_size() {
            return Err(HekaError::SizeLimitExceeded {
                size,
                limit: self.max_buffer_size(),
            });
        }
        self.buf
            .try_reserve(data.len())
            .map_err(|_| HekaError::AllocationFailed { requested: size })?;
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Decode the next complete record.
    ///
    /// Returns `None` when more input is needed. Records whose message fails
    /// to decode are skipped and counted in [`discarded`](Self::discarded).
    pub fn next_message(&mut self) -> Option<&Message> {
        self.discarded = 0;
        loop {
            match self.locate() {
                Located::Pending => return None,
                Located::Frame { start, end } => {
                    match decode_into(&self.buf[start..end], &mut self.message) {
                        Ok(()) => {
                            self.scan = end;
                            return Some(&self.message);
                        }
                        Err(e) => {
                            debug!(error = %e, "framed message failed to decode, resyncing");
                            self.skip_byte();
                        }
                    }
                }
            }
        }
    }

    /// Return the next complete record's message bytes without decoding them.
    pub fn next_frame(&mut self) -> Option<&[u8]> {
        self.discarded = 0;
        match self.locate() {
            Located::Pending => None,
            Located::Frame { start, end } => {
                self.scan = end;
                Some(&self.buf[start..end])
            }
        }
    }

    fn skip_byte(&mut self) {
        self.scan += 1;
        self.discarded += 1;
    }

    /// Find the next record with a valid header whose message is fully
    /// buffered, discarding bytes that can not start one.
    fn locate(&mut self) -> Located {
        loop {
            let window = &self.buf[self.scan..];
            let Some(offset) = window.iter().position(|&b| b == RECORD_SEPARATOR) else {
                if !window.is_empty() {
                    self.discarded += window.len();
                    debug!(bytes = window.len(), "no record separator, buffer discarded");
                }
                self.buf.clear();
                self.scan = 0;
                return Located::Pending;
            };
            self.discarded += offset;
            self.scan += offset;

            let window = &self.buf[self.scan..];
            if window.len() < 2 {
                return Located::Pending;
            }
            let header_len = window[1] as usize;
            let header_end = header_len + FRAME_OVERHEAD;
            if header_end > window.len() {
                return Located::Pending;
            }
            if window[header_end - 1] != UNIT_SEPARATOR {
                self.skip_byte();
                continue;
            }

            let Some(message_len) = decode_header(&window[2..header_end - 1], self.max_message_size)
            else {
                self.skip_byte();
                continue;
            };
            let start = self.scan + header_end;
            let end = start.saturating_add(message_len);
            if end > self.buf.len() {
                return Located::Pending;
            }
            return Located::Frame { start, end };
        }
    }
}
