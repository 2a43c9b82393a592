// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{DecodeError, Encoder, Message, ProtoField, StringOffset};

/// ValueType describes the semantics and measurement units of a value.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct ValueType {
    pub r#type: StringOffset,
    pub unit: StringOffset,
}

impl ValueType {
    pub const TYPE: u32 = 1;
    pub const UNIT: u32 = 2;
}

impl Message for ValueType {
    const NAME: &'static str = "ValueType";

    fn clear(&mut self) {
        *self = Self::default();
    }

    fn merge_field(&mut self, field: ProtoField<'_>) -> Result<(), DecodeError> {
        match field.number {
            Self::TYPE => self.r#type = field.as_string_offset(Self::NAME)?,
            Self::UNIT => self.unit = field.as_string_offset(Self::NAME)?,
            _ => return Err(field.unknown(Self::NAME)),
        }
        Ok(())
    }

    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_uint64_nonzero(Self::TYPE, self.r#type.into());
        encoder.encode_uint64_nonzero(Self::UNIT, self.unit.into());
    }
}

#[cfg(feature = "prost_impls")]
impl From<ValueType> for crate::prost_impls::ValueType {
    fn from(value: ValueType) -> Self {
        Self {
            r#type: value.r#type.into(),
            unit: value.unit.into(),
        }
    }
}
