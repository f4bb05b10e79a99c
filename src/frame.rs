//! Wire-level frame header parsing and encoding (RFC 6455 §5.2).
//!
//! Decoding is progressive: [`decode_header`] is re-invoked every time more
//! bytes arrive and reports `Ok(None)` until a complete header is available,
//! so the caller (the connection state machine in `client.rs`) never needs to
//! track a parse-head/parse-paylen split itself — it just keeps calling this
//! with a growing slice.

use crate::buffer::Buffer;
use crate::error::WsError;
use crate::mask::{self, MaskKey};
use byteorder::{BigEndian, ByteOrder};

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum OpCode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl OpCode {
    pub fn from_byte(b: u8) -> Option<OpCode> {
        match b {
            0x0 => Some(OpCode::Continuation),
            0x1 => Some(OpCode::Text),
            0x2 => Some(OpCode::Binary),
            0x8 => Some(OpCode::Close),
            0x9 => Some(OpCode::Ping),
            0xA => Some(OpCode::Pong),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            OpCode::Continuation => 0x0,
            OpCode::Text => 0x1,
            OpCode::Binary => 0x2,
            OpCode::Close => 0x8,
            OpCode::Ping => 0x9,
            OpCode::Pong => 0xA,
        }
    }

    pub fn is_control(self) -> bool {
        matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }
}

#[derive(Debug, Eq, PartialEq)]
pub struct Header {
    pub fin: bool,
    pub opcode: OpCode,
    pub masked: bool,
    pub payload_len: u64,
}

/// Attempt to parse a full frame header from the front of `buf`.
///
/// Returns `Ok(None)` when `buf` does not yet hold enough bytes to know the
/// header's total length. Returns `Ok(Some((header, header_len)))` on
/// success, where `header_len` is the number of bytes the header itself
/// occupies (2, plus 2 or 8 for an extended length, plus 4 if masked — masked
/// frames are rejected by the caller, but the length still needs to be
/// skipped correctly when logging/discarding).
pub fn decode_header(buf: &Buffer) -> Result<Option<(Header, usize)>, WsError> {
    if buf.len() < 2 {
        return Ok(None);
    }

    let b0 = buf.get_u8(0).unwrap();
    let b1 = buf.get_u8(1).unwrap();

    let fin = b0 & 0x80 != 0;
    let rsv = b0 & 0x70;
    if rsv != 0 {
        return Err(WsError::NotSupported("non-zero RSV bits".into()));
    }

    let opcode = OpCode::from_byte(b0 & 0x0F).ok_or(WsError::UnknownOpcode(b0 & 0x0F))?;

    let masked = b1 & 0x80 != 0;
    let base_len = (b1 & 0x7F) as u64;

    let (payload_len, ext_len): (u64, usize) = match base_len {
        126 => {
            if buf.len() < 4 {
                return Ok(None);
            }
            (buf.get_u16(2).unwrap() as u64, 2)
        }
        127 => {
            if buf.len() < 10 {
                return Ok(None);
            }
            let len = buf.get_u64(2).unwrap();
            if len > usize::MAX as u64 {
                return Err(WsError::PayloadTooLarge);
            }
            (len, 8)
        }
        n => (n, 0),
    };

    let header_len = 2 + ext_len;

    Ok(Some((
        Header {
            fin,
            opcode,
            masked,
            payload_len,
        },
        header_len,
    )))
}

/// Encode a single, unfragmented data or control frame into `out`, masked
/// with a freshly drawn key. `out` must already have at least
/// `2 + 8 + 4 + payload.len()` bytes of spare capacity reserved by the
/// caller via `Buffer::put`.
pub fn encode(opcode: OpCode, payload: &[u8]) -> Vec<u8> {
    encode_segments(opcode, &[payload])
}

/// Same as [`encode`] but accepts multiple payload segments that are treated
/// as one contiguous logical payload for masking purposes (the mask key
/// cycles continuously across segment boundaries).
pub fn encode_segments(opcode: OpCode, segments: &[&[u8]]) -> Vec<u8> {
    let total_len: usize = segments.iter().map(|s| s.len()).sum();
    let key = mask::generate_key();
    encode_segments_with_key(opcode, segments, total_len, key)
}

fn encode_segments_with_key(opcode: OpCode, segments: &[&[u8]], total_len: usize, key: MaskKey) -> Vec<u8> {
    let mut out = Vec::with_capacity(total_len + 14);

    out.push(0x80 | opcode.to_byte());

    if total_len < 126 {
        out.push(0x80 | total_len as u8);
    } else if total_len < 65536 {
        out.push(0x80 | 126);
        let mut ext = [0u8; 2];
        BigEndian::write_u16(&mut ext, total_len as u16);
        out.extend_from_slice(&ext);
    } else {
        out.push(0x80 | 127);
        let mut ext = [0u8; 8];
        BigEndian::write_u64(&mut ext, total_len as u64);
        out.extend_from_slice(&ext);
    }

    out.extend_from_slice(&key);

    let mut offset = 0;
    for segment in segments {
        let start = out.len();
        out.extend_from_slice(segment);
        mask::apply_at(&key, &mut out[start..], offset);
        offset += segment.len();
    }

    out
}

/// Encode a CLOSE frame body: a 2-byte big-endian status code followed by a
/// UTF-8 reason.
pub fn encode_close(code: u16, reason: &[u8]) -> Vec<u8> {
    let mut code_bytes = [0u8; 2];
    BigEndian::write_u16(&mut code_bytes, code);
    encode_segments(OpCode::Close, &[&code_bytes, reason])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryInto;

    fn buf_of(bytes: &[u8]) -> Buffer {
        let mut b = Buffer::new();
        b.put_data(bytes);
        b
    }

    #[test]
    fn test_decode_header_incomplete_returns_none() {
        assert_eq!(decode_header(&buf_of(&[])).unwrap(), None);
        assert_eq!(decode_header(&buf_of(&[0x81])).unwrap(), None);
        // 7-bit length says "126" but the extended length bytes aren't here yet.
        assert_eq!(decode_header(&buf_of(&[0x81, 126, 0x00])).unwrap(), None);
    }

    #[test]
    fn test_decode_header_short_length() {
        let (header, len) = decode_header(&buf_of(&[0x81, 0x05, 0, 0, 0])).unwrap().unwrap();
        assert!(header.fin);
        assert_eq!(header.opcode, OpCode::Text);
        assert!(!header.masked);
        assert_eq!(header.payload_len, 5);
        assert_eq!(len, 2);
    }

    #[test]
    fn test_decode_header_extended_16() {
        let mut buf = vec![0x82, 126];
        buf.extend_from_slice(&[0x01, 0x00]); // 256
        let (header, len) = decode_header(&buf_of(&buf)).unwrap().unwrap();
        assert_eq!(header.opcode, OpCode::Binary);
        assert_eq!(header.payload_len, 256);
        assert_eq!(len, 4);
    }

    #[test]
    fn test_decode_header_extended_64() {
        let mut buf = vec![0x81, 127];
        buf.extend_from_slice(&70000u64.to_be_bytes());
        let (header, len) = decode_header(&buf_of(&buf)).unwrap().unwrap();
        assert_eq!(header.payload_len, 70000);
        assert_eq!(len, 10);
    }

    #[test]
    fn test_decode_header_rejects_masked_server_frame_is_flagged() {
        let (header, _) = decode_header(&buf_of(&[0x81, 0x80, 0, 0, 0, 0])).unwrap().unwrap();
        assert!(header.masked);
    }

    #[test]
    fn test_decode_header_rejects_unknown_opcode() {
        let err = decode_header(&buf_of(&[0x83, 0x00])).unwrap_err();
        assert_eq!(err.kind(), "NOT_SUPPORT");
        assert!(matches!(err, WsError::UnknownOpcode(0x3)));
    }

    #[test]
    fn test_encode_sets_mask_bit_and_fin() {
        let frame = encode(OpCode::Text, b"hi");
        assert_eq!(frame[0], 0x80 | 0x1);
        assert_eq!(frame[1] & 0x80, 0x80);
        assert_eq!(frame[1] & 0x7F, 2);
    }

    #[test]
    fn test_encode_roundtrip_unmasks_to_original() {
        let payload = b"round trip payload";
        let frame = encode(OpCode::Binary, payload);

        let (header, header_len) = decode_header(&buf_of(&frame)).unwrap().unwrap();
        assert_eq!(header.payload_len as usize, payload.len());

        let mask_start = header_len;
        let key: MaskKey = frame[mask_start..mask_start + 4].try_into().unwrap();
        let mut body = frame[mask_start + 4..].to_vec();
        mask::apply(&key, &mut body);

        assert_eq!(body, payload);
    }

    #[test]
    fn test_encode_close_payload_layout() {
        let frame = encode_close(1000, b"bye");
        let (header, header_len) = decode_header(&buf_of(&frame)).unwrap().unwrap();
        assert_eq!(header.opcode, OpCode::Close);

        let mask_start = header_len;
        let key: MaskKey = frame[mask_start..mask_start + 4].try_into().unwrap();
        let mut body = frame[mask_start + 4..].to_vec();
        mask::apply(&key, &mut body);

        assert_eq!(body, [0x03, 0xE8, b'b', b'y', b'e']);
    }

    #[test]
    fn test_encode_uses_extended_length_at_boundaries() {
        let small = encode(OpCode::Binary, &vec![0u8; 125]);
        assert_eq!(small[1] & 0x7F, 125);

        let mid = encode(OpCode::Binary, &vec![0u8; 126]);
        assert_eq!(mid[1] & 0x7F, 126);

        let large = encode(OpCode::Binary, &vec![0u8; 70000]);
        assert_eq!(large[1] & 0x7F, 127);
    }
}
