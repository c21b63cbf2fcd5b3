// MIT License - Copyright (c) 2026 Peter Wright
// Frame checksum

use crate::constants::CHECKSUM_OFFSET;
use tracing::debug;

const TWELVE_BITS: u32 = 0x0FFF;
const SIX_BITS: u16 = 0x3F;

/// Compute the 2-byte frame checksum.
///
/// Sums every byte modulo 4096, takes the 12-bit one's complement, and
/// splits the result into two 6-bit halves (most significant first), each
/// offset by `0x40` so both bytes are printable ASCII in `0x40..=0x7F`.
pub fn compute(body: &[u8]) -> [u8; 2] {
    let sum = body
        .iter()
        .fold(0u32, |acc, &b| acc.wrapping_add(u32::from(b)))
        & TWELVE_BITS;
    let inverted = (!sum & TWELVE_BITS) as u16;
    [
        ((inverted >> 6) & SIX_BITS) as u8 + CHECKSUM_OFFSET,
        (inverted & SIX_BITS) as u8 + CHECKSUM_OFFSET,
    ]
}

/// Recompute the checksum for `body` and compare it byte-for-byte.
pub fn validate(body: &[u8], checksum: [u8; 2]) -> bool {
    let expected = compute(body);
    let valid = expected == checksum;
    if !valid {
        debug!(
            "Checksum Not Ok (expected {:02X?}, got {:02X?})",
            expected, checksum
        );
    }
    valid
}
