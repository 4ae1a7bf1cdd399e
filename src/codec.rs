//! Fixed-endianness integer codec.
//!
//! Encodes a `u64` as 8 little-endian bytes regardless of the host byte
//! order, so encoded values are portable between machines. The tree itself
//! does not use this; it is a convenience for callers that store counters
//! or sizes as values.

use bytes::{Buf, BufMut};

/// Encodes `value` as 8 little-endian bytes.
pub fn encode_u64(value: u64) -> [u8; 8] {
    let mut buf = [0u8; 8];
    (&mut buf[..]).put_u64_le(value);
    buf
}

/// Decodes 8 little-endian bytes into a `u64`.
///
/// Returns `None` unless `bytes` is exactly 8 bytes long.
pub fn decode_u64(mut bytes: &[u8]) -> Option<u64> {
    if bytes.len() != 8 {
        return None;
    }
    Some(bytes.get_u64_le())
}
