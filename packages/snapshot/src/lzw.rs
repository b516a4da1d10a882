//! Incremental-dictionary (LZW) compression over bytes.
//!
//! The dictionary starts with every single-byte value (codes 0..=255) and
//! grows by one entry per emitted code. It is never reset.

use crate::error::{SnapshotError, SnapshotResult};
use std::collections::HashMap;

/// First code assigned past the single-byte seed
pub const FIRST_DYNAMIC_CODE: u32 = 256;

pub fn compress(input: &[u8]) -> Vec<u32> {
    let mut bytes = input.iter().copied();
    let Some(first) = bytes.next() else {
        return Vec::new();
    };

    // (prefix code, next byte) -> code
    let mut dictionary: HashMap<(u32, u8), u32> = HashMap::new();
    let mut next_code = FIRST_DYNAMIC_CODE;
    let mut current = u32::from(first);
    let mut codes = Vec::new();

    for byte in bytes {
        match dictionary.get(&(current, byte)) {
            Some(&code) => current = code,
            None => {
                codes.push(current);
                dictionary.insert((current, byte), next_code);
                next_code += 1;
                current = u32::from(byte);
            }
        }
    }
    codes.push(current);
    codes
}

/// Dictionary entry stored as a back-chain: prefix code plus last byte
#[derive(Clone, Copy)]
struct Entry {
    prefix: Option<u32>,
    byte: u8,
}

fn expand(entries: &[Entry], code: u32, out: &mut Vec<u8>) {
    let start = out.len();
    let mut current = Some(code);
    while let Some(code) = current {
        let entry = entries[code as usize];
        out.push(entry.byte);
        current = entry.prefix;
    }
    out[start..].reverse();
}

pub fn decompress(codes: &[u32]) -> SnapshotResult<Vec<u8>> {
    let Some((&first, rest)) = codes.split_first() else {
        return Ok(Vec::new());
    };
    if first >= FIRST_DYNAMIC_CODE {
        return Err(SnapshotError::InvalidCode {
            code: first,
            position: 0,
            next: FIRST_DYNAMIC_CODE,
        });
    }

    let mut entries: Vec<Entry> = (0..=u8::MAX)
        .map(|byte| Entry { prefix: None, byte })
        .collect();
    let mut out = vec![first as u8];
    let mut previous = first;

    for (offset, &code) in rest.iter().enumerate() {
        let next = entries.len() as u32;
        let start = out.len();

        if code < next {
            expand(&entries, code, &mut out);
        } else if code == next {
            // The code being defined right now: previous string + its own first byte
            expand(&entries, previous, &mut out);
            let first_byte = out[start];
            out.push(first_byte);
        } else {
            return Err(SnapshotError::InvalidCode {
                code,
                position: offset + 1,
                next,
            });
        }

        entries.push(Entry {
            prefix: Some(previous),
            byte: out[start],
        });
        previous = code;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classic_example() {
        let input = b"TOBEORNOTTOBEORTOBEORNOT";
        let codes = compress(input);

        // Repetition is folded into dictionary codes
        assert!(codes.len() < input.len());
        assert!(codes.iter().any(|code| *code >= FIRST_DYNAMIC_CODE));
        assert_eq!(decompress(&codes).unwrap(), input.to_vec());
    }

    #[test]
    fn test_kwkwk_case() {
        // "aaaa..." forces codes that reference the entry being defined
        let input = vec![b'a'; 64];
        let codes = compress(&input);
        assert_eq!(codes[..3], [97, 256, 257]);
        assert_eq!(decompress(&codes).unwrap(), input);
    }

    #[test]
    fn test_empty() {
        assert!(compress(&[]).is_empty());
        assert!(decompress(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_code_past_next() {
        let err = decompress(&[97, 300]).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::InvalidCode {
                code: 300,
                position: 1,
                next: 256
            }
        ));
    }

    #[test]
    fn test_rejects_dynamic_first_code() {
        assert!(matches!(
            decompress(&[256]),
            Err(SnapshotError::InvalidCode { position: 0, .. })
        ));
    }
}
