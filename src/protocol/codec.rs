//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! Every frame, request or reply, is:
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Tag (1)  │ Len (4)  │         Body                │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//! Tag is the op code for requests and the status for replies. Len is the
//! body length, big-endian.

use std::io::{self, Read, Write};

use crate::error::{CacheError, Result};
use super::{Reply, Request, RequestBody, Status};

/// Header size: 1 byte tag + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum body size (16 MB)
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Framing
// =============================================================================

fn frame(tag: u8, body: &[u8]) -> Result<Vec<u8>> {
    if body.len() > MAX_FRAME_SIZE as usize {
        return Err(CacheError::Protocol(format!(
            "Body too large: {} bytes (max {})",
            body.len(),
            MAX_FRAME_SIZE
        )));
    }

    let mut message = Vec::with_capacity(HEADER_SIZE + body.len());
    message.push(tag);
    message.extend_from_slice(&(body.len() as u32).to_be_bytes());
    message.extend_from_slice(body);
    Ok(message)
}

/// Split a complete frame into tag and body
fn unframe(bytes: &[u8]) -> Result<(u8, &[u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(CacheError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let tag = bytes[0];
    let body_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;

    if body_len > MAX_FRAME_SIZE as usize {
        return Err(CacheError::Protocol(format!(
            "Body too large: {} bytes (max {})",
            body_len, MAX_FRAME_SIZE
        )));
    }

    let total_len = HEADER_SIZE + body_len;
    if bytes.len() != total_len {
        return Err(CacheError::Protocol(format!(
            "Frame length mismatch: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    Ok((tag, &bytes[HEADER_SIZE..]))
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request to bytes
///
/// Format: op (1) + body_len (4) + bincode(RequestBody)
pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
    let body = bincode::serialize(&request.body)?;
    frame(request.op, &body)
}

/// Decode a request from one complete frame
///
/// Unknown op codes decode fine; rejecting them is the dispatcher's job.
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    let (op, body) = unframe(bytes)?;
    let body: RequestBody = bincode::deserialize(body)?;
    Ok(Request { op, body })
}

// =============================================================================
// Reply Encoding/Decoding
// =============================================================================

/// Encode a reply to bytes
///
/// Format: status (1) + body_len (4) + body
pub fn encode_reply(reply: &Reply) -> Result<Vec<u8>> {
    let body = match reply {
        Reply::Payload(value) => bincode::serialize(value)?,
        Reply::Batch(entries) => bincode::serialize(entries)?,
        Reply::Success(count) => bincode::serialize(count)?,
        Reply::Error(message) => message.as_bytes().to_vec(),
        Reply::Tables(names) => bincode::serialize(names)?,
    };
    frame(reply.status() as u8, &body)
}

/// Encode an ERROR reply
///
/// Never fails: long messages are truncated to fit a frame.
pub fn encode_error(message: &str) -> Vec<u8> {
    let mut end = message.len().min(MAX_FRAME_SIZE as usize);
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    let body = &message.as_bytes()[..end];

    let mut bytes = Vec::with_capacity(HEADER_SIZE + body.len());
    bytes.push(Status::Error as u8);
    bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(body);
    bytes
}

/// Decode a reply from one complete frame
pub fn decode_reply(bytes: &[u8]) -> Result<Reply> {
    let (status, body) = unframe(bytes)?;

    let reply = match status {
        0x00 => Reply::Payload(bincode::deserialize(body)?),
        0x01 => Reply::Batch(bincode::deserialize(body)?),
        0x02 => Reply::Success(bincode::deserialize(body)?),
        0x03 => Reply::Error(String::from_utf8_lossy(body).into_owned()),
        0x04 => Reply::Tables(bincode::deserialize(body)?),
        _ => {
            return Err(CacheError::Protocol(format!(
                "Unknown reply status: 0x{:02x}",
                status
            )))
        }
    };

    Ok(reply)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete frame (header + body) from a stream
///
/// Blocks until the frame is received or an error occurs.
pub fn read_frame<R: Read>(reader: &mut R, max_body: u32) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let body_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if body_len > max_body {
        return Err(CacheError::Protocol(format!(
            "Body too large: {} bytes (max {})",
            body_len, max_body
        )));
    }

    // Grow with the bytes that actually arrive, not the advertised length
    let mut message = Vec::with_capacity(HEADER_SIZE);
    message.extend_from_slice(&header);
    let read = reader.by_ref().take(u64::from(body_len)).read_to_end(&mut message)?;
    if read < body_len as usize {
        return Err(CacheError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("frame body truncated: {} of {} bytes", read, body_len),
        )));
    }

    Ok(message)
}

/// Write one complete frame to a stream
pub fn write_frame<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<()> {
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete request from a stream
pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    let bytes = read_frame(reader, MAX_FRAME_SIZE)?;
    decode_request(&bytes)
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    let bytes = encode_request(request)?;
    write_frame(writer, &bytes)
}

/// Read a complete reply from a stream
pub fn read_reply<R: Read>(reader: &mut R) -> Result<Reply> {
    let bytes = read_frame(reader, MAX_FRAME_SIZE)?;
    decode_reply(&bytes)
}

/// Write a reply to a stream
pub fn write_reply<W: Write>(writer: &mut W, reply: &Reply) -> Result<()> {
    let bytes = encode_reply(reply)?;
    write_frame(writer, &bytes)
}
