use bytes::{Buf, BufMut, Bytes, BytesMut};
use gpumode_core::StatusCode;

use crate::error::{Result, WireError};

/// Magic bytes: "GM" (0x47 0x4D).
pub const MAGIC: [u8; 2] = [0x47, 0x4D];

/// Request header: magic (2) + code (4) + output capacity (4) + input length (4).
pub const REQUEST_HEADER_SIZE: usize = 14;

/// Completion header: magic (2) + status (4) + information (4).
pub const COMPLETION_HEADER_SIZE: usize = 10;

/// Default maximum input or output payload: 64 KiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;

/// One control request as sent by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPacket {
    pub code: u32,
    pub output_capacity: u32,
    /// Absent and empty input are the same thing on the wire.
    pub input: Option<Bytes>,
}

impl RequestPacket {
    pub fn new(code: u32, input: Option<Bytes>, output_capacity: u32) -> Self {
        Self {
            code,
            output_capacity,
            input: input.filter(|bytes| !bytes.is_empty()),
        }
    }

    /// Borrow the input for dispatch.
    pub fn input(&self) -> Option<&[u8]> {
        self.input.as_deref()
    }

    pub fn wire_size(&self) -> usize {
        REQUEST_HEADER_SIZE + self.input.as_ref().map_or(0, Bytes::len)
    }
}

/// The answer to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionPacket {
    pub status: StatusCode,
    /// Bytes written by the device; its length is the completion information.
    pub output: Bytes,
}

impl CompletionPacket {
    pub fn new(status: StatusCode, output: impl Into<Bytes>) -> Self {
        Self {
            status,
            output: output.into(),
        }
    }

    /// Number of output bytes the device wrote.
    pub fn information(&self) -> usize {
        self.output.len()
    }

    pub fn wire_size(&self) -> usize {
        COMPLETION_HEADER_SIZE + self.output.len()
    }
}

/// Encode a request.
///
/// ```text
/// ┌────────────┬───────────┬─────────────┬───────────┬─────────────┐
/// │ Magic (2B) │ Code      │ Out capacity│ In length │ Input       │
/// │ "GM"       │ (4B LE)   │ (4B LE)     │ (4B LE)   │ (In length) │
/// └────────────┴───────────┴─────────────┴───────────┴─────────────┘
/// ```
pub fn encode_request(packet: &RequestPacket, dst: &mut BytesMut) -> Result<()> {
    let input = packet.input().unwrap_or_default();
    let input_len = payload_len(input.len())?;

    dst.reserve(REQUEST_HEADER_SIZE + input.len());
    dst.put_slice(&MAGIC);
    dst.put_u32_le(packet.code);
    dst.put_u32_le(packet.output_capacity);
    dst.put_u32_le(input_len);
    dst.put_slice(input);
    Ok(())
}

/// Decode a request, consuming it from `src`.
///
/// Returns `Ok(None)` until a whole packet is buffered.
pub fn decode_request(src: &mut BytesMut, max_payload: usize) -> Result<Option<RequestPacket>> {
    if src.len() < REQUEST_HEADER_SIZE {
        return Ok(None);
    }
    check_magic(src)?;

    let code = le_u32(src, 2);
    let output_capacity = le_u32(src, 6);
    let input_len = checked_len(le_u32(src, 10), max_payload)?;

    if src.len() < REQUEST_HEADER_SIZE + input_len {
        return Ok(None);
    }

    src.advance(REQUEST_HEADER_SIZE);
    let input = src.split_to(input_len).freeze();
    Ok(Some(RequestPacket::new(code, Some(input), output_capacity)))
}

/// Encode a completion.
///
/// ```text
/// ┌────────────┬───────────┬─────────────┬──────────────────────┐
/// │ Magic (2B) │ Status    │ Information │ Output               │
/// │ "GM"       │ (4B LE)   │ (4B LE)     │ (Information bytes)  │
/// └────────────┴───────────┴─────────────┴──────────────────────┘
/// ```
pub fn encode_completion(packet: &CompletionPacket, dst: &mut BytesMut) -> Result<()> {
    let information = payload_len(packet.output.len())?;

    dst.reserve(packet.wire_size());
    dst.put_slice(&MAGIC);
    dst.put_u32_le(packet.status.code());
    dst.put_u32_le(information);
    dst.put_slice(&packet.output);
    Ok(())
}

/// Decode a completion, consuming it from `src`.
pub fn decode_completion(
    src: &mut BytesMut,
    max_payload: usize,
) -> Result<Option<CompletionPacket>> {
    if src.len() < COMPLETION_HEADER_SIZE {
        return Ok(None);
    }
    check_magic(src)?;

    let raw_status = le_u32(src, 2);
    let status = StatusCode::from_code(raw_status).ok_or(WireError::UnknownStatus(raw_status))?;
    let information = checked_len(le_u32(src, 6), max_payload)?;

    if src.len() < COMPLETION_HEADER_SIZE + information {
        return Ok(None);
    }

    src.advance(COMPLETION_HEADER_SIZE);
    let output = src.split_to(information).freeze();
    Ok(Some(CompletionPacket { status, output }))
}

/// Limits and timeouts for packet streams.
#[derive(Debug, Clone)]
pub struct WireConfig {
    /// Largest accepted input or output payload. Default: 64 KiB.
    pub max_payload_size: usize,
    pub read_timeout: Option<std::time::Duration>,
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

fn check_magic(src: &[u8]) -> Result<()> {
    if src[..2] != MAGIC {
        return Err(WireError::InvalidMagic);
    }
    Ok(())
}

// Callers have already checked that `src` holds a whole header.
fn le_u32(src: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&src[offset..offset + 4]);
    u32::from_le_bytes(word)
}

fn checked_len(len: u32, max: usize) -> Result<usize> {
    let len = len as usize;
    if len > max {
        return Err(WireError::PayloadTooLarge { size: len, max });
    }
    Ok(len)
}

fn payload_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| WireError::PayloadTooLarge {
        size: len,
        max: u32::MAX as usize,
    })
}
