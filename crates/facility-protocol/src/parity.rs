//! Single-byte even-parity tag.
//!
//! Every frame ends with one byte that is `1` when the bytes before it carry
//! an odd number of set bits and `0` otherwise. This catches any single bit
//! flip and nothing stronger; two flips cancel out.

use crate::error::{WireError, WireResult};

/// Computes the parity bit of `bytes` as a `0` or `1` byte.
pub fn compute(bytes: &[u8]) -> u8 {
    let folded = bytes.iter().fold(0u8, |acc, b| acc ^ b);
    (folded.count_ones() & 1) as u8
}

/// Returns true when `tag` is the parity of `bytes`.
pub fn verify(bytes: &[u8], tag: u8) -> bool {
    compute(bytes) == tag
}

/// Appends the parity tag to an outgoing frame.
pub fn seal(mut frame: Vec<u8>) -> Vec<u8> {
    let tag = compute(&frame);
    frame.push(tag);
    frame
}

/// Checks and strips the trailing tag of an incoming frame.
pub fn open(frame: &[u8]) -> WireResult<&[u8]> {
    let (&found, body) = frame.split_last().ok_or(WireError::EmptyInput)?;
    let expected = compute(body);
    if expected != found {
        return Err(WireError::IntegrityViolation { expected, found });
    }
    Ok(body)
}
