// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

//! This crate implements a streaming reader and writer for [`profiles`]
//! without materializing the whole message. It provides:
//!
//! - a forward-only [Decoder] over wire bytes,
//! - an append-only [Encoder] that backpatches length prefixes,
//! - typed messages for every nested kind: [Function], [Label], [Line],
//!   [Location], [Mapping], [Sample] and [ValueType],
//! - [ProfileDecoder], which walks the top-level Profile fields selected by a
//!   [FieldMask] and yields them as [ProfileField]s.
//!
//! The top-level Profile message has no length prefix, so a profile can be
//! written one field at a time in any order. Consumers of the format must not
//! depend on field order, so re-ordering while re-encoding is allowed.
//!
//! Indices into the string table are represented by [StringOffset], which uses
//! a 32-bit number. ID fields are still 64-bit, since runtimes often use
//! addresses as ids.
//!
//! [`profiles`]: https://github.com/google/pprof/blob/main/proto/profile.proto

mod decoder;
mod encoder;
mod error;
mod function;
mod label;
mod location;
mod mapping;
mod message;
mod profile;
mod sample;
mod string;
mod value_type;
pub mod varint;

#[cfg(feature = "prost_impls")]
pub mod prost_impls;

pub use decoder::*;
pub use encoder::*;
pub use error::*;
pub use function::*;
pub use label::*;
pub use location::*;
pub use mapping::*;
pub use message::*;
pub use profile::*;
pub use sample::*;
pub use string::*;
pub use value_type::*;

/// Represents the wire type for the in-wire protobuf encoding. Groups (3 and
/// 4) are deprecated and not used by pprof, so they are rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    Fixed32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            5 => Ok(WireType::Fixed32),
            other => Err(DecodeError::InvalidWireType(other)),
        }
    }
}

/// The smallest possible protobuf field number.
pub const MIN_FIELD: u32 = 1;

/// The largest possible protobuf field number.
pub const MAX_FIELD: u32 = (1 << 29) - 1;

/// A tag is a combination of a wire_type, stored in the least significant
/// three bits, and the field number that is defined in the .proto file.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Tag(u32);

impl Tag {
    #[cfg_attr(debug_assertions, track_caller)]
    #[inline]
    pub const fn new(field: u32, wire_type: WireType) -> Self {
        debug_assert!(field >= MIN_FIELD && field <= MAX_FIELD);
        Self((field << 3) | wire_type as u32)
    }

    /// Splits a decoded key into its field number and wire type.
    pub fn parse(key: u64) -> Result<(u32, WireType), DecodeError> {
        let wire_type = WireType::try_from((key & 0x7) as u8)?;
        let field = key >> 3;
        if field < u64::from(MIN_FIELD) || field > u64::from(MAX_FIELD) {
            return Err(DecodeError::InvalidFieldNumber(field));
        }
        Ok((field as u32, wire_type))
    }

    /// The key as it is written on the wire, before varint encoding.
    #[inline]
    pub const fn value(self) -> u64 {
        self.0 as u64
    }

    #[inline]
    pub const fn proto_len(self) -> usize {
        varint::proto_len(self.0 as u64)
    }

    #[inline]
    pub fn encode(self, buf: &mut Vec<u8>) {
        varint::encode(u64::from(self.0), buf)
    }
}
