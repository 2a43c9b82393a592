// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{DecodeError, Decoder, Encoder, ProtoField};

/// A nested pprof message that can decode itself from wire bytes and write
/// itself back out.
///
/// Decoding goes through [`Message::decode_from`] on an existing value so that
/// repeated fields reuse their allocations; long-lived scratch messages reach
/// a steady state where decoding doesn't allocate.
pub trait Message: Default {
    /// Message name used in error reports.
    const NAME: &'static str;

    /// Resets every field to its default, keeping allocations.
    fn clear(&mut self);

    /// Applies one field to the message. Field numbers outside the schema are
    /// rejected.
    fn merge_field(&mut self, field: ProtoField<'_>) -> Result<(), DecodeError>;

    /// Writes the message body, without its own tag and length prefix.
    fn encode(&self, encoder: &mut Encoder);

    /// Replaces the contents of `self` with the message encoded in `bytes`.
    fn decode_from(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
        self.clear();
        for field in Decoder::new(bytes) {
            self.merge_field(field?)?;
        }
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut message = Self::default();
        message.decode_from(bytes)?;
        Ok(message)
    }
}
