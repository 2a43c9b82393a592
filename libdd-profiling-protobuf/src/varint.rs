// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Base 128 [`varint`] helpers.
//!
//! [`varint`]: https://protobuf.dev/programming-guides/encoding/#varints

use crate::DecodeError;

/// A 64-bit varint never takes more than 10 bytes to encode.
pub const MAX_VARINT_LEN: usize = 10;

/// The number of bytes it takes to encode `value`.
#[must_use]
#[inline]
pub const fn proto_len(value: u64) -> usize {
    // https://github.com/google/protobuf/blob/3.3.x/src/google/protobuf/io/coded_stream.h#L1301-L1309
    ((((value | 1).leading_zeros() ^ 63) * 9 + 73) / 64) as usize
}

/// Appends the varint encoding of `value` to `buf`.
#[inline]
pub fn encode(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        if value < 0x80 {
            buf.push(value as u8);
            return;
        }
        buf.push(((value & 0x7F) | 0x80) as u8);
        value >>= 7;
    }
}

/// Writes the varint encoding of `value` to the front of `out`, returning the
/// number of bytes written. The output is truncated if `out` is shorter than
/// [`proto_len`] of the value.
#[inline]
pub fn encode_to_slice(mut value: u64, out: &mut [u8]) -> usize {
    let mut written = 0;
    for slot in out.iter_mut() {
        written += 1;
        if value < 0x80 {
            *slot = value as u8;
            break;
        }
        *slot = ((value & 0x7F) | 0x80) as u8;
        value >>= 7;
    }
    written
}

/// Decodes a varint from the front of `buf`, returning the value and the
/// number of bytes consumed.
///
/// # Errors
/// Fails if the buffer ends before the varint does, or if the varint does not
/// fit in 64 bits.
#[inline]
pub fn decode(buf: &[u8]) -> Result<(u64, usize), DecodeError> {
    let mut value = 0u64;
    for (i, byte) in buf.iter().copied().take(MAX_VARINT_LEN).enumerate() {
        // The tenth byte may only contribute the single remaining bit.
        if i == MAX_VARINT_LEN - 1 && byte > 1 {
            return Err(DecodeError::VarintOverflow);
        }
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte < 0x80 {
            return Ok((value, i + 1));
        }
    }
    if buf.len() >= MAX_VARINT_LEN {
        Err(DecodeError::VarintOverflow)
    } else {
        Err(DecodeError::UnexpectedEof)
    }
}
