// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::WireType;

/// Errors produced while reading protobuf wire data. Any of these means the
/// input is malformed; there is no partial recovery.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// The buffer ended in the middle of a value.
    #[error("unexpected end of buffer")]
    UnexpectedEof,
    /// A varint was longer than 10 bytes or overflowed 64 bits.
    #[error("varint overflows 64 bits")]
    VarintOverflow,
    #[error("invalid wire type {0}")]
    InvalidWireType(u8),
    #[error("invalid field number {0}")]
    InvalidFieldNumber(u64),
    /// The field number is not part of the message's schema.
    #[error("unknown field {field} in message {message}")]
    UnknownField { message: &'static str, field: u32 },
    /// A known field was encoded with a wire type its schema doesn't allow.
    #[error("field {field} in message {message} has wire type {actual:?}, expected {expected:?}")]
    UnexpectedWireType {
        message: &'static str,
        field: u32,
        expected: WireType,
        actual: WireType,
    },
    /// A length prefix doesn't fit in the address space.
    #[error("length prefix {0} is too large")]
    LengthOverflow(u64),
    /// A string table index was negative or larger than 32 bits.
    #[error("string offset {0} is out of range")]
    StringOffsetOverflow(u64),
}
