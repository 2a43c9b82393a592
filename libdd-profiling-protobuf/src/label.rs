// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{DecodeError, Encoder, Message, ProtoField, StringOffset};

/// Label includes additional context for this sample. It can include things
/// like a thread id, allocation size, etc.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Label {
    /// An annotation for a sample, e.g. "allocation_size".
    pub key: StringOffset,
    /// At most, one of the str and num should be used.
    pub str: StringOffset,
    /// At most, one of the str and num should be used.
    pub num: i64,
    /// Should only be present when num is present.
    /// Specifies the units of num.
    pub num_unit: StringOffset,
}

impl Label {
    pub const KEY: u32 = 1;
    pub const STR: u32 = 2;
    pub const NUM: u32 = 3;
    pub const NUM_UNIT: u32 = 4;
}

impl Message for Label {
    const NAME: &'static str = "Label";

    fn clear(&mut self) {
        *self = Self::default();
    }

    fn merge_field(&mut self, field: ProtoField<'_>) -> Result<(), DecodeError> {
        match field.number {
            Self::KEY => self.key = field.as_string_offset(Self::NAME)?,
            Self::STR => self.str = field.as_string_offset(Self::NAME)?,
            Self::NUM => self.num = field.as_i64(Self::NAME)?,
            Self::NUM_UNIT => self.num_unit = field.as_string_offset(Self::NAME)?,
            _ => return Err(field.unknown(Self::NAME)),
        }
        Ok(())
    }

    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_uint64_nonzero(Self::KEY, self.key.into());
        encoder.encode_uint64_nonzero(Self::STR, self.str.into());
        encoder.encode_int64_nonzero(Self::NUM, self.num);
        encoder.encode_uint64_nonzero(Self::NUM_UNIT, self.num_unit.into());
    }
}

#[cfg(feature = "prost_impls")]
impl From<&Label> for crate::prost_impls::Label {
    fn from(label: &Label) -> Self {
        Self {
            key: label.key.into(),
            str: label.str.into(),
            num: label.num,
            num_unit: label.num_unit.into(),
        }
    }
}
