// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{DecodeError, Encoder, Message, ProtoField, StringOffset};

/// Represents a function in a profile.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Function {
    /// Unique nonzero id for the function.
    pub id: u64,
    /// Name of the function, in human-readable form if available.
    pub name: StringOffset,
    /// Name of the function, as identified by the system. For instance,
    /// it can be a C++ mangled name.
    pub system_name: StringOffset,
    /// Source file containing the function.
    pub filename: StringOffset,
    /// Line number in source file.
    pub start_line: i64,
}

impl Function {
    pub const ID: u32 = 1;
    pub const NAME_FIELD: u32 = 2;
    pub const SYSTEM_NAME: u32 = 3;
    pub const FILENAME: u32 = 4;
    pub const START_LINE: u32 = 5;
}

impl Message for Function {
    const NAME: &'static str = "Function";

    fn clear(&mut self) {
        *self = Self::default();
    }

    fn merge_field(&mut self, field: ProtoField<'_>) -> Result<(), DecodeError> {
        match field.number {
            Self::ID => self.id = field.as_u64(Self::NAME)?,
            Self::NAME_FIELD => self.name = field.as_string_offset(Self::NAME)?,
            Self::SYSTEM_NAME => self.system_name = field.as_string_offset(Self::NAME)?,
            Self::FILENAME => self.filename = field.as_string_offset(Self::NAME)?,
            Self::START_LINE => self.start_line = field.as_i64(Self::NAME)?,
            _ => return Err(field.unknown(Self::NAME)),
        }
        Ok(())
    }

    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_uint64(Self::ID, self.id);
        encoder.encode_uint64_nonzero(Self::NAME_FIELD, self.name.into());
        encoder.encode_uint64_nonzero(Self::SYSTEM_NAME, self.system_name.into());
        encoder.encode_uint64_nonzero(Self::FILENAME, self.filename.into());
        encoder.encode_int64_nonzero(Self::START_LINE, self.start_line);
    }
}

#[cfg(feature = "prost_impls")]
impl From<&Function> for crate::prost_impls::Function {
    fn from(function: &Function) -> Self {
        Self {
            id: function.id,
            name: function.name.into(),
            system_name: function.system_name.into(),
            filename: function.filename.into(),
            start_line: function.start_line,
        }
    }
}
