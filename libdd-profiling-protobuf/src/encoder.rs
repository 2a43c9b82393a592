// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::varint::{self, MAX_VARINT_LEN};
use crate::{Message, Tag, WireType};

/// Repeated numeric fields with more elements than this are written in the
/// packed form. With one or two elements, the packed form's length prefix
/// makes it no smaller than writing each element with its own tag.
pub const PACKED_THRESHOLD: usize = 2;

/// An append-only protobuf writer over a growable buffer.
///
/// Nested messages are written with [`Encoder::encode_message`], which writes
/// the body first and then shifts it forward to make room for the tag and
/// length prefix. This avoids walking the message twice to compute its
/// length up front.
///
/// The buffer is kept across [`Encoder::clear`] so that a long-lived encoder
/// reaches a steady state without reallocating.
#[derive(Clone, Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Truncates the output, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.buf.as_slice()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    #[inline]
    fn key(&mut self, field: u32, wire_type: WireType) {
        Tag::new(field, wire_type).encode(&mut self.buf)
    }

    #[inline]
    pub fn encode_uint64(&mut self, field: u32, value: u64) {
        self.key(field, WireType::Varint);
        varint::encode(value, &mut self.buf);
    }

    #[inline]
    pub fn encode_int64(&mut self, field: u32, value: i64) {
        self.encode_uint64(field, value as u64)
    }

    #[inline]
    pub fn encode_bool(&mut self, field: u32, value: bool) {
        self.encode_uint64(field, u64::from(value))
    }

    #[inline]
    pub fn encode_bytes(&mut self, field: u32, value: &[u8]) {
        self.key(field, WireType::LengthDelimited);
        varint::encode(value.len() as u64, &mut self.buf);
        self.buf.extend_from_slice(value);
    }

    #[inline]
    pub fn encode_uint64_nonzero(&mut self, field: u32, value: u64) {
        if value != 0 {
            self.encode_uint64(field, value)
        }
    }

    #[inline]
    pub fn encode_int64_nonzero(&mut self, field: u32, value: i64) {
        if value != 0 {
            self.encode_int64(field, value)
        }
    }

    #[inline]
    pub fn encode_bool_nonzero(&mut self, field: u32, value: bool) {
        if value {
            self.encode_bool(field, value)
        }
    }

    #[inline]
    pub fn encode_bytes_nonzero(&mut self, field: u32, value: &[u8]) {
        if !value.is_empty() {
            self.encode_bytes(field, value)
        }
    }

    /// Writes a repeated varint field, choosing the smaller of the packed
    /// and unpacked forms. Nothing is written for an empty slice.
    pub fn encode_repeated_uint64(&mut self, field: u32, values: &[u64]) {
        self.encode_repeated(field, values.iter().copied())
    }

    /// Same as [`Encoder::encode_repeated_uint64`], for int64 fields.
    pub fn encode_repeated_int64(&mut self, field: u32, values: &[i64]) {
        self.encode_repeated(field, values.iter().map(|value| *value as u64))
    }

    fn encode_repeated<I>(&mut self, field: u32, values: I)
    where
        I: ExactSizeIterator<Item = u64> + Clone,
    {
        if values.len() > PACKED_THRESHOLD {
            let len: usize = values.clone().map(varint::proto_len).sum();
            self.key(field, WireType::LengthDelimited);
            varint::encode(len as u64, &mut self.buf);
            for value in values {
                varint::encode(value, &mut self.buf);
            }
        } else {
            for value in values {
                self.encode_uint64(field, value);
            }
        }
    }

    /// Writes `message` as a length-delimited field. The body is encoded in
    /// place at the end of the buffer; afterwards it is moved forward by the
    /// size of the tag and length prefix, which are then written in front.
    pub fn encode_message<M: Message + ?Sized>(&mut self, field: u32, message: &M) {
        let start = self.buf.len();
        message.encode(self);
        let len = self.buf.len() - start;

        let mut header = [0u8; 2 * MAX_VARINT_LEN];
        let tag = Tag::new(field, WireType::LengthDelimited);
        let tag_len = varint::encode_to_slice(tag.value(), &mut header);
        let header_len = match header.get_mut(tag_len..) {
            Some(rest) => tag_len + varint::encode_to_slice(len as u64, rest),
            None => tag_len,
        };
        let header = header.get(..header_len).unwrap_or_default();

        self.buf.extend_from_slice(header);
        self.buf.copy_within(start..start + len, start + header_len);
        if let Some(prefix) = self.buf.get_mut(start..start + header_len) {
            prefix.copy_from_slice(header);
        }
    }
}
