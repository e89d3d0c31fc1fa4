//! Length-prefixed frames.
//!
//! ```text
//! ┌──────────┬─────────┬──────────┬─────────────────────┐
//! │ magic    │ version │ length   │ payload             │
//! │ u32 BE   │ u16 BE  │ u32 BE   │ `length` bytes      │
//! └──────────┴─────────┴──────────┴─────────────────────┘
//! ```

use std::io::{Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{WireError, WireResult};

/// `"PUMA"` in ASCII.
pub const MAGIC: u32 = 0x5055_4D41;

/// Current protocol version.
pub const PROTOCOL_VERSION: u16 = 1;

/// Magic (4) + version (2) + length (4).
pub const FRAME_HEADER_SIZE: usize = 10;

/// Maximum payload size (16 MiB).
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// One framed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub payload: Bytes,
}

impl Frame {
    /// Wraps a payload, rejecting payloads over [`MAX_PAYLOAD_SIZE`].
    pub fn new(payload: impl Into<Bytes>) -> WireResult<Self> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(WireError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(Self { payload })
    }

    /// Total encoded size including the header.
    pub fn encoded_len(&self) -> usize {
        FRAME_HEADER_SIZE + self.payload.len()
    }

    /// Appends the encoded frame to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(self.encoded_len());
        buf.put_u32(MAGIC);
        buf.put_u16(PROTOCOL_VERSION);
        buf.put_u32(self.payload.len() as u32);
        buf.put_slice(&self.payload);
    }

    /// Decodes one frame from the front of `buf`.
    ///
    /// Returns `Ok(None)` if `buf` does not hold a complete frame yet; the
    /// buffer is left untouched in that case. A complete frame is split off
    /// the buffer.
    pub fn decode(buf: &mut BytesMut) -> WireResult<Option<Self>> {
        if buf.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let mut header = &buf[..FRAME_HEADER_SIZE];
        let length = check_header(&mut header)?;

        if buf.len() < FRAME_HEADER_SIZE + length {
            return Ok(None);
        }

        buf.advance(FRAME_HEADER_SIZE);
        let payload = buf.split_to(length).freeze();
        Ok(Some(Self { payload }))
    }
}

/// Validates a header and returns the payload length.
fn check_header(header: &mut &[u8]) -> WireResult<usize> {
    let magic = header.get_u32();
    if magic != MAGIC {
        return Err(WireError::InvalidMagic(magic));
    }
    let version = header.get_u16();
    if version != PROTOCOL_VERSION {
        return Err(WireError::UnsupportedVersion(version));
    }
    let length = header.get_u32() as usize;
    if length > MAX_PAYLOAD_SIZE {
        return Err(WireError::PayloadTooLarge {
            size: length,
            max: MAX_PAYLOAD_SIZE,
        });
    }
    Ok(length)
}

/// Writes one frame to a blocking stream and flushes it.
pub fn write_frame<W: Write>(writer: &mut W, frame: &Frame) -> WireResult<()> {
    let mut buf = BytesMut::with_capacity(frame.encoded_len());
    frame.encode(&mut buf);
    writer.write_all(&buf)?;
    writer.flush()?;
    Ok(())
}

/// Reads exactly one frame from a blocking stream.
pub fn read_frame<R: Read>(reader: &mut R) -> WireResult<Frame> {
    let mut header = [0u8; FRAME_HEADER_SIZE];
    reader.read_exact(&mut header)?;
    let length = check_header(&mut &header[..])?;

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload)?;
    Ok(Frame {
        payload: Bytes::from(payload),
    })
}
