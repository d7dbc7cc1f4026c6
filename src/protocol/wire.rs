//! Wire framing
//!
//! Encoding and decoding functions for the TCP protocol.
//!
//! ## Frame Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Kind (1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! Requests and replies share the header layout; the first byte is the
//! request kind or the reply tag. All lengths are big-endian `u32`.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{CommandType, Reply, Request, ScriptId};
use crate::error::{MapError, Result};

/// Header size: 1 byte kind/tag + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

const KIND_COMMAND: u8 = 0x01;
const KIND_SCRIPT: u8 = 0x02;

const TAG_NIL: u8 = 0x00;
const TAG_INTEGER: u8 = 0x01;
const TAG_BULK: u8 = 0x02;
const TAG_ARRAY: u8 = 0x03;
const TAG_ERROR: u8 = 0x04;

/// Arrays nest at most this deep (scan replies use two levels)
const MAX_REPLY_DEPTH: usize = 8;

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request to bytes
pub fn encode_request(request: &Request) -> Bytes {
    let mut payload = BytesMut::new();
    let kind = match request {
        Request::Command { command, args } => {
            payload.put_u8(*command as u8);
            put_list(&mut payload, args);
            KIND_COMMAND
        }
        Request::Script { script, keys, args } => {
            payload.put_u8(*script as u8);
            put_list(&mut payload, keys);
            put_list(&mut payload, args);
            KIND_SCRIPT
        }
    };

    frame(kind, &payload)
}

/// Decode a request from a complete frame
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    let (kind, payload) = split_frame(bytes, "request")?;
    let mut reader = FrameReader::new(payload, "request");

    let request = match kind {
        KIND_COMMAND => {
            let byte = reader.u8()?;
            let command = CommandType::from_byte(byte).ok_or_else(|| {
                MapError::Protocol(format!("Unknown command type: 0x{:02x}", byte))
            })?;
            let args = reader.list()?;
            Request::Command { command, args }
        }
        KIND_SCRIPT => {
            let byte = reader.u8()?;
            let script = ScriptId::from_byte(byte).ok_or_else(|| {
                MapError::Protocol(format!("Unknown script id: 0x{:02x}", byte))
            })?;
            let keys = reader.list()?;
            let args = reader.list()?;
            Request::Script { script, keys, args }
        }
        _ => {
            return Err(MapError::Protocol(format!(
                "Unknown request kind: 0x{:02x}",
                kind
            )))
        }
    };

    reader.finish()?;
    Ok(request)
}

// =============================================================================
// Reply Encoding/Decoding
// =============================================================================

/// Encode a reply to bytes
pub fn encode_reply(reply: &Reply) -> Bytes {
    let mut out = BytesMut::new();
    put_reply(&mut out, reply);
    out.freeze()
}

fn put_reply(out: &mut BytesMut, reply: &Reply) {
    match reply {
        Reply::Nil => {
            out.put_u8(TAG_NIL);
            out.put_u32(0);
        }
        Reply::Integer(value) => {
            out.put_u8(TAG_INTEGER);
            out.put_u32(8);
            out.put_i64(*value);
        }
        Reply::Bulk(bytes) => {
            out.put_u8(TAG_BULK);
            out.put_u32(bytes.len() as u32);
            out.put_slice(bytes);
        }
        Reply::Array(items) => {
            let mut payload = BytesMut::new();
            payload.put_u32(items.len() as u32);
            for item in items {
                put_reply(&mut payload, item);
            }
            out.put_u8(TAG_ARRAY);
            out.put_u32(payload.len() as u32);
            out.put_slice(&payload);
        }
        Reply::Error(message) => {
            out.put_u8(TAG_ERROR);
            out.put_u32(message.len() as u32);
            out.put_slice(message.as_bytes());
        }
    }
}

/// Decode a reply from a complete frame
pub fn decode_reply(bytes: &[u8]) -> Result<Reply> {
    let mut reader = FrameReader::new(bytes, "reply");
    let reply = reader.reply(0)?;
    reader.finish()?;
    Ok(reply)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete request from a stream
///
/// Blocks until a complete request is received or an error occurs
pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    let frame = read_frame(reader, "Request")?;
    decode_request(&frame)
}

/// Write a request to a stream.
///
/// An oversized request fails with `MapError::Encode` before any byte is
/// written, so the stream stays aligned.
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    let bytes = encode_request(request);
    check_frame_size(&bytes, "Request")?;
    write_frame(writer, &bytes)
}

/// Read a complete reply from a stream
pub fn read_reply<R: Read>(reader: &mut R) -> Result<Reply> {
    let frame = read_frame(reader, "Reply")?;
    decode_reply(&frame)
}

/// Write a reply to a stream.
///
/// Like [`write_request`], an oversized reply fails with `MapError::Encode`
/// and nothing is written.
pub fn write_reply<W: Write>(writer: &mut W, reply: &Reply) -> Result<()> {
    let bytes = encode_reply(reply);
    check_frame_size(&bytes, "Reply")?;
    write_frame(writer, &bytes)
}

/// Reject an encoded frame whose payload is over `MAX_PAYLOAD_SIZE`
pub fn check_frame_size(frame: &[u8], what: &str) -> Result<()> {
    let payload_len = frame.len().saturating_sub(HEADER_SIZE);
    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(MapError::Encode(format!(
            "{} payload too large: {} bytes (max {})",
            what, payload_len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(())
}

fn write_frame<W: Write>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer.write_all(frame)?;
    writer.flush()?;
    Ok(())
}

fn read_frame<R: Read>(reader: &mut R, what: &str) -> Result<Vec<u8>> {
    // Read header first
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(MapError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    // Read payload behind the header
    let mut frame = vec![0u8; HEADER_SIZE + payload_len as usize];
    frame[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut frame[HEADER_SIZE..])?;
    Ok(frame)
}

// =============================================================================
// Helpers
// =============================================================================

fn frame(kind: u8, payload: &[u8]) -> Bytes {
    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(kind);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);
    message.freeze()
}

fn put_list(out: &mut BytesMut, items: &[Bytes]) {
    out.put_u32(items.len() as u32);
    for item in items {
        out.put_u32(item.len() as u32);
        out.put_slice(item);
    }
}

/// Validate the header of a complete frame and return (kind, payload)
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(MapError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let kind = bytes[0];
    let payload_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(MapError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let total_len = HEADER_SIZE + payload_len as usize;
    if bytes.len() != total_len {
        return Err(MapError::Protocol(format!(
            "{} length mismatch: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((kind, &bytes[HEADER_SIZE..]))
}

/// Bounds-checked cursor over a frame payload
struct FrameReader<'a> {
    buf: &'a [u8],
    what: &'static str,
}

impl<'a> FrameReader<'a> {
    fn new(buf: &'a [u8], what: &'static str) -> Self {
        Self { buf, what }
    }

    fn need(&self, len: usize) -> Result<()> {
        if self.buf.remaining() < len {
            return Err(MapError::Protocol(format!(
                "Truncated {}: needed {} more bytes, {} left",
                self.what,
                len,
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    fn u32(&mut self) -> Result<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.need(len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    /// Count-prefixed list of length-prefixed byte strings
    fn list(&mut self) -> Result<Vec<Bytes>> {
        let count = self.u32()? as usize;
        // every element carries at least its 4 byte length
        let mut items = Vec::with_capacity(count.min(self.buf.remaining() / 4));
        for _ in 0..count {
            let len = self.u32()? as usize;
            items.push(Bytes::copy_from_slice(self.bytes(len)?));
        }
        Ok(items)
    }

    fn reply(&mut self, depth: usize) -> Result<Reply> {
        let tag = self.u8()?;
        let len = self.u32()? as usize;
        if len > MAX_PAYLOAD_SIZE as usize {
            return Err(MapError::Protocol(format!(
                "Reply payload too large: {} bytes (max {})",
                len, MAX_PAYLOAD_SIZE
            )));
        }
        let payload = self.bytes(len)?;

        let reply = match tag {
            TAG_NIL if len == 0 => Reply::Nil,
            TAG_INTEGER if len == 8 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(payload);
                Reply::Integer(i64::from_be_bytes(raw))
            }
            TAG_BULK => Reply::Bulk(Bytes::copy_from_slice(payload)),
            TAG_ARRAY => {
                if depth >= MAX_REPLY_DEPTH {
                    return Err(MapError::Protocol(format!(
                        "Reply nesting deeper than {}",
                        MAX_REPLY_DEPTH
                    )));
                }
                let mut nested = FrameReader::new(payload, self.what);
                let count = nested.u32()? as usize;
                let mut items = Vec::with_capacity(count.min(payload.len() / HEADER_SIZE));
                for _ in 0..count {
                    items.push(nested.reply(depth + 1)?);
                }
                nested.finish()?;
                Reply::Array(items)
            }
            TAG_ERROR => Reply::Error(
                String::from_utf8(payload.to_vec()).map_err(|_| {
                    MapError::Protocol("Error reply is not valid UTF-8".to_string())
                })?,
            ),
            TAG_NIL | TAG_INTEGER => {
                return Err(MapError::Protocol(format!(
                    "Reply tag 0x{:02x} with invalid length {}",
                    tag, len
                )))
            }
            _ => {
                return Err(MapError::Protocol(format!(
                    "Unknown reply tag: 0x{:02x}",
                    tag
                )))
            }
        };

        Ok(reply)
    }

    fn finish(self) -> Result<()> {
        if self.buf.has_remaining() {
            return Err(MapError::Protocol(format!(
                "{} bytes of trailing data after {}",
                self.buf.remaining(),
                self.what
            )));
        }
        Ok(())
    }
}
