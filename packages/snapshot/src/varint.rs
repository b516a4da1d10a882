//! Little-endian base-128 integers with a continuation bit (LEB128 style).

use crate::error::{SnapshotError, SnapshotResult};

const CONTINUATION: u8 = 0x80;
const PAYLOAD: u8 = 0x7f;

pub fn encode(values: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 2);
    for &value in values {
        encode_one(value, &mut out);
    }
    out
}

fn encode_one(mut value: u32, out: &mut Vec<u8>) {
    loop {
        let byte = (value as u8) & PAYLOAD;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | CONTINUATION);
    }
}

/// Decode a packed stream. Every value must end with a byte whose
/// continuation bit is clear.
pub fn decode(bytes: &[u8]) -> SnapshotResult<Vec<u32>> {
    let mut values = Vec::new();
    let mut value: u64 = 0;
    let mut shift = 0u32;
    let mut start = 0usize;

    for (offset, &byte) in bytes.iter().enumerate() {
        if shift == 0 {
            start = offset;
        }
        value |= u64::from(byte & PAYLOAD) << shift;
        if value > u64::from(u32::MAX) || shift > 28 {
            return Err(SnapshotError::VarintOverflow { offset: start });
        }

        if byte & CONTINUATION == 0 {
            values.push(value as u32);
            value = 0;
            shift = 0;
        } else {
            shift += 7;
        }
    }

    if shift != 0 {
        return Err(SnapshotError::UnterminatedVarint { offset: start });
    }
    Ok(values)
}
