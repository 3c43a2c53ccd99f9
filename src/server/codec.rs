//! Binary message codec.
//!
//! Every request and reply starts with the same 4-byte header:
//!
//! ```text
//! ┌──────────────┬────────────────┬───────────────┬─────────────┐
//! │ length (2B)  │ functionId (1B)│ errorCode (1B)│ body (N B)  │
//! │ LE u16, incl.│                │               │ per-function│
//! │ header       │                │               │             │
//! └──────────────┴────────────────┴───────────────┴─────────────┘
//! ```
//!
//! All multi-byte fields are little-endian, packed, no padding. Stream
//! pushes are the one exception to the header rule: they carry the bare
//! 40-byte snapshot body (see [`encode_snapshot_push`]).

use std::io::Read;

use crate::error::ProtocolError;

/// Header size on the wire.
pub const HEADER_LEN: usize = 4;

/// Requests above this declared length are rejected and the connection
/// dropped; the protocol's largest legal request is 5 bytes.
pub const MAX_REQUEST_LEN: usize = 256;

/// Largest request body.
pub const MAX_PAYLOAD_LEN: usize = MAX_REQUEST_LEN - HEADER_LEN;

/// Wire error codes.
pub const ERR_OK: u8 = 0;
pub const ERR_NOT_SUPPORTED: u8 = 1;

// System-info field widths (NUL-padded ASCII).
pub const FW_VERSION_LEN: usize = 5;
pub const BOARD_ID_LEN: usize = 19;
pub const IP_ADDR_LEN: usize = 14;
pub const MAC_ADDR_LEN: usize = 20;

/// Reply buffer, owned per call. Capacity must hold the largest reply
/// (the 62-byte system info).
pub type ReplyFrame = heapless::Vec<u8, 64>;

/// Request body buffer.
pub type RequestPayload = heapless::Vec<u8, MAX_PAYLOAD_LEN>;

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// The fixed header preceding every request and reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Total message length in bytes, header included.
    pub length: u16,
    pub function_id: u8,
    pub error_code: u8,
}

impl MessageHeader {
    pub fn new(length: u16, function_id: u8) -> Self {
        Self { length, function_id, error_code: ERR_OK }
    }

    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let len = self.length.to_le_bytes();
        [len[0], len[1], self.function_id, self.error_code]
    }

    pub fn from_bytes(bytes: [u8; HEADER_LEN]) -> Self {
        Self {
            length: u16::from_le_bytes([bytes[0], bytes[1]]),
            function_id: bytes[2],
            error_code: bytes[3],
        }
    }
}

// ---------------------------------------------------------------------------
// Request framing
// ---------------------------------------------------------------------------

/// One decoded client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub header: MessageHeader,
    pub payload: RequestPayload,
}

impl Request {
    /// First body byte, where a handler expects a one-byte setting.
    pub fn setting(&self) -> Option<u8> {
        self.payload.first().copied()
    }
}

/// Read one request off the socket: exactly one header, then exactly the
/// declared remainder.
///
/// The declared length is validated before any body read so a malformed
/// header can never produce a negative-size or unbounded read. Short and
/// failed reads are reported as a disconnect, not a protocol error.
pub fn read_request(reader: &mut impl Read) -> Result<Request, ProtocolError> {
    let mut raw = [0u8; HEADER_LEN];
    reader
        .read_exact(&mut raw)
        .map_err(|_| ProtocolError::Disconnected)?;
    let header = MessageHeader::from_bytes(raw);

    let total = header.length as usize;
    if total < HEADER_LEN {
        return Err(ProtocolError::LengthBelowHeader(header.length));
    }
    if total > MAX_REQUEST_LEN {
        return Err(ProtocolError::Oversize(header.length));
    }

    let mut payload = RequestPayload::new();
    let body_len = total - HEADER_LEN;
    if body_len > 0 {
        // Capacity check already done against MAX_REQUEST_LEN.
        let _ = payload.resize_default(body_len);
        reader
            .read_exact(&mut payload)
            .map_err(|_| ProtocolError::Disconnected)?;
    }

    Ok(Request { header, payload })
}

// ---------------------------------------------------------------------------
// Reply encoding
// ---------------------------------------------------------------------------

/// Combined acquisition snapshot: elapsed time, 6 ADC channels, 3 axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub elapsed_us: u32,
    pub volts: [f32; 6],
    pub positions: [f32; 3],
}

/// Body size of [`Snapshot`] on the wire.
pub const SNAPSHOT_BODY_LEN: usize = 4 + 6 * 4 + 3 * 4;

fn put(frame: &mut ReplyFrame, bytes: &[u8]) {
    let _ = frame.extend_from_slice(bytes);
}

fn put_f32s(frame: &mut ReplyFrame, values: &[f32]) {
    for v in values {
        put(frame, &v.to_le_bytes());
    }
}

fn put_fixed_str(frame: &mut ReplyFrame, s: &str, width: usize) {
    let bytes = s.as_bytes();
    for i in 0..width {
        put(frame, &[bytes.get(i).copied().unwrap_or(0)]);
    }
}

fn put_header(frame: &mut ReplyFrame, body_len: usize, function_id: u8, error_code: u8) {
    let header = MessageHeader {
        length: (HEADER_LEN + body_len) as u16,
        function_id,
        error_code,
    };
    put(frame, &header.to_bytes());
}

/// Header-only reply, used for errors and the unsupported-reset answer.
pub fn encode_header_only(function_id: u8, error_code: u8) -> ReplyFrame {
    let mut frame = ReplyFrame::new();
    put_header(&mut frame, 0, function_id, error_code);
    frame
}

/// Board-state byte after the header.
pub fn encode_status(function_id: u8, board_state: u8) -> ReplyFrame {
    let mut frame = ReplyFrame::new();
    put_header(&mut frame, 1, function_id, ERR_OK);
    put(&mut frame, &[board_state]);
    frame
}

/// One-byte boolean body (communication check result).
pub fn encode_flag(function_id: u8, flag: bool) -> ReplyFrame {
    let mut frame = ReplyFrame::new();
    put_header(&mut frame, 1, function_id, ERR_OK);
    put(&mut frame, &[u8::from(flag)]);
    frame
}

/// Fixed-width identity strings, truncated or NUL-padded to their field
/// widths.
pub fn encode_system_info(
    function_id: u8,
    fw_version: &str,
    board_id: &str,
    ip_addr: &str,
    mac_addr: &str,
) -> ReplyFrame {
    let body = FW_VERSION_LEN + BOARD_ID_LEN + IP_ADDR_LEN + MAC_ADDR_LEN;
    let mut frame = ReplyFrame::new();
    put_header(&mut frame, body, function_id, ERR_OK);
    put_fixed_str(&mut frame, fw_version, FW_VERSION_LEN);
    put_fixed_str(&mut frame, board_id, BOARD_ID_LEN);
    put_fixed_str(&mut frame, ip_addr, IP_ADDR_LEN);
    put_fixed_str(&mut frame, mac_addr, MAC_ADDR_LEN);
    frame
}

/// Six channel voltages after the header.
pub fn encode_channels(function_id: u8, volts: &[f32; 6]) -> ReplyFrame {
    let mut frame = ReplyFrame::new();
    put_header(&mut frame, 6 * 4, function_id, ERR_OK);
    put_f32s(&mut frame, volts);
    frame
}

/// Three encoder positions after the header.
pub fn encode_positions(function_id: u8, positions: &[f32; 3]) -> ReplyFrame {
    let mut frame = ReplyFrame::new();
    put_header(&mut frame, 3 * 4, function_id, ERR_OK);
    put_f32s(&mut frame, positions);
    frame
}

fn put_snapshot_body(frame: &mut ReplyFrame, snapshot: &Snapshot) {
    put(frame, &snapshot.elapsed_us.to_le_bytes());
    put_f32s(frame, &snapshot.volts);
    put_f32s(frame, &snapshot.positions);
}

/// Header-prefixed snapshot reply (on-demand combined reads).
pub fn encode_snapshot_reply(function_id: u8, snapshot: &Snapshot) -> ReplyFrame {
    let mut frame = ReplyFrame::new();
    put_header(&mut frame, SNAPSHOT_BODY_LEN, function_id, ERR_OK);
    put_snapshot_body(&mut frame, snapshot);
    frame
}

/// Bare snapshot body, no header — the shape of every stream push.
pub fn encode_snapshot_push(snapshot: &Snapshot) -> ReplyFrame {
    let mut frame = ReplyFrame::new();
    put_snapshot_body(&mut frame, snapshot);
    frame
}
