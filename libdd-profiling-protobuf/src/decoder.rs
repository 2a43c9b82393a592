// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{varint, DecodeError, StringOffset, Tag, WireType};

/// A minimal forward-only reader over protobuf wire data. It never allocates;
/// length-delimited values are returned as sub-slices of the input.
#[derive(Clone, Debug)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    #[inline]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Returns true once every byte has been consumed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    fn remaining(&self) -> &'a [u8] {
        self.buf.get(self.pos..).unwrap_or_default()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(DecodeError::LengthOverflow(len as u64))?;
        let bytes = self
            .buf
            .get(self.pos..end)
            .ok_or(DecodeError::UnexpectedEof)?;
        self.pos = end;
        Ok(bytes)
    }

    /// Moves the cursor to the end so that nothing more is read.
    #[inline]
    pub(crate) fn exhaust(&mut self) {
        self.pos = self.buf.len();
    }

    pub fn decode_tag(&mut self) -> Result<(u32, WireType), DecodeError> {
        let key = self.decode_varint()?;
        Tag::parse(key)
    }

    #[inline]
    pub fn decode_varint(&mut self) -> Result<u64, DecodeError> {
        let (value, len) = varint::decode(self.remaining())?;
        self.pos += len;
        Ok(value)
    }

    pub fn decode_fixed32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.take(4)?;
        let array = <[u8; 4]>::try_from(bytes).map_err(|_| DecodeError::UnexpectedEof)?;
        Ok(u32::from_le_bytes(array))
    }

    pub fn decode_fixed64(&mut self) -> Result<u64, DecodeError> {
        let bytes = self.take(8)?;
        let array = <[u8; 8]>::try_from(bytes).map_err(|_| DecodeError::UnexpectedEof)?;
        Ok(u64::from_le_bytes(array))
    }

    /// Reads a length-delimited value, borrowing it from the input.
    pub fn decode_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.decode_varint()?;
        let len = usize::try_from(len).map_err(|_| DecodeError::LengthOverflow(len))?;
        self.take(len)
    }

    /// Reads a length-delimited value into an owned buffer, for callers that
    /// need it to outlive the input.
    pub fn decode_bytes_owned(&mut self) -> Result<Vec<u8>, DecodeError> {
        self.decode_bytes().map(<[u8]>::to_vec)
    }

    /// Reads one whole field: its tag and its payload.
    pub fn decode_field(&mut self) -> Result<ProtoField<'a>, DecodeError> {
        let (number, wire_type) = self.decode_tag()?;
        let value = match wire_type {
            WireType::Varint => FieldValue::Varint(self.decode_varint()?),
            WireType::Fixed64 => FieldValue::Fixed64(self.decode_fixed64()?),
            WireType::LengthDelimited => FieldValue::Bytes(self.decode_bytes()?),
            WireType::Fixed32 => FieldValue::Fixed32(self.decode_fixed32()?),
        };
        Ok(ProtoField { number, value })
    }
}

/// Yields fields until the buffer is exhausted. After an error is yielded,
/// iteration stops.
impl<'a> Iterator for Decoder<'a> {
    type Item = Result<ProtoField<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_empty() {
            return None;
        }
        let result = self.decode_field();
        if result.is_err() {
            self.exhaust();
        }
        Some(result)
    }
}

/// The payload of a single field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldValue<'a> {
    Varint(u64),
    Fixed64(u64),
    Bytes(&'a [u8]),
    Fixed32(u32),
}

impl FieldValue<'_> {
    pub const fn wire_type(&self) -> WireType {
        match self {
            FieldValue::Varint(_) => WireType::Varint,
            FieldValue::Fixed64(_) => WireType::Fixed64,
            FieldValue::Bytes(_) => WireType::LengthDelimited,
            FieldValue::Fixed32(_) => WireType::Fixed32,
        }
    }
}

/// An ephemeral decoded field: its number and its payload. The accessors
/// check the wire type against what the message schema expects and name the
/// message in the error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ProtoField<'a> {
    pub number: u32,
    pub value: FieldValue<'a>,
}

impl<'a> ProtoField<'a> {
    #[cold]
    pub(crate) fn mismatch(&self, message: &'static str, expected: WireType) -> DecodeError {
        DecodeError::UnexpectedWireType {
            message,
            field: self.number,
            expected,
            actual: self.value.wire_type(),
        }
    }

    /// The error for a field number the message doesn't know about.
    #[cold]
    pub fn unknown(&self, message: &'static str) -> DecodeError {
        DecodeError::UnknownField {
            message,
            field: self.number,
        }
    }

    pub fn as_u64(&self, message: &'static str) -> Result<u64, DecodeError> {
        match self.value {
            FieldValue::Varint(value) => Ok(value),
            _ => Err(self.mismatch(message, WireType::Varint)),
        }
    }

    /// Protobuf int64 is the two's complement of the varint.
    pub fn as_i64(&self, message: &'static str) -> Result<i64, DecodeError> {
        self.as_u64(message).map(|value| value as i64)
    }

    pub fn as_bool(&self, message: &'static str) -> Result<bool, DecodeError> {
        self.as_u64(message).map(|value| value != 0)
    }

    pub fn as_string_offset(&self, message: &'static str) -> Result<StringOffset, DecodeError> {
        let value = self.as_u64(message)?;
        StringOffset::try_from(value).map_err(|_| DecodeError::StringOffsetOverflow(value))
    }

    pub fn as_bytes(&self, message: &'static str) -> Result<&'a [u8], DecodeError> {
        match self.value {
            FieldValue::Bytes(bytes) => Ok(bytes),
            _ => Err(self.mismatch(message, WireType::LengthDelimited)),
        }
    }

    /// Visits each element of a repeated varint field. Both the packed form
    /// (one length-delimited run of varints) and the unpacked form (one
    /// varint per field) are accepted, since encoders may use either.
    pub fn for_each_varint<F>(&self, message: &'static str, mut f: F) -> Result<(), DecodeError>
    where
        F: FnMut(u64),
    {
        match self.value {
            FieldValue::Varint(value) => {
                f(value);
                Ok(())
            }
            FieldValue::Bytes(packed) => {
                let mut decoder = Decoder::new(packed);
                while !decoder.is_empty() {
                    f(decoder.decode_varint()?);
                }
                Ok(())
            }
            _ => Err(self.mismatch(message, WireType::Varint)),
        }
    }
}
