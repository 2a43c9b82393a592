// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{DecodeError, Encoder, Message, ProtoField};

/// Describes function and line table debug information.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Location {
    /// Unique nonzero id for the location. A profile could use instruction
    /// addresses or any integer sequence as ids.
    pub id: u64,
    /// The id of the corresponding profile.Mapping for this location.
    /// It can be unset if the mapping is unknown or not applicable for
    /// this profile type.
    pub mapping_id: u64,
    /// The instruction address for this location, if available. It should be
    /// within `Mapping.memory_start..Mapping.memory_limit` for the
    /// corresponding mapping. A non-leaf address may be in the middle of a
    /// call instruction. It is up to display tools to find the beginning of
    /// the instruction if necessary.
    pub address: u64,
    /// Multiple line indicates this location has inlined functions, where the
    /// last entry represents the caller into which the preceding entries
    /// were inlined.
    pub lines: Vec<Line>,
    /// Provides an indication that multiple symbols map to this location's
    /// address, for example due to identical code folding by the linker.
    pub is_folded: bool,
}

impl Location {
    pub const ID: u32 = 1;
    pub const MAPPING_ID: u32 = 2;
    pub const ADDRESS: u32 = 3;
    pub const LINE: u32 = 4;
    pub const IS_FOLDED: u32 = 5;
}

/// Represents function and line number information.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Line {
    /// The id of the corresponding profile.Function for this line.
    pub function_id: u64,
    /// Line number in source code.
    pub line: i64,
    /// Column number in source code.
    pub column: i64,
}

impl Line {
    pub const FUNCTION_ID: u32 = 1;
    pub const LINE: u32 = 2;
    pub const COLUMN: u32 = 3;
}

impl Message for Line {
    const NAME: &'static str = "Line";

    fn clear(&mut self) {
        *self = Self::default();
    }

    fn merge_field(&mut self, field: ProtoField<'_>) -> Result<(), DecodeError> {
        match field.number {
            Self::FUNCTION_ID => self.function_id = field.as_u64(Self::NAME)?,
            Self::LINE => self.line = field.as_i64(Self::NAME)?,
            Self::COLUMN => self.column = field.as_i64(Self::NAME)?,
            _ => return Err(field.unknown(Self::NAME)),
        }
        Ok(())
    }

    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_uint64_nonzero(Self::FUNCTION_ID, self.function_id);
        encoder.encode_int64_nonzero(Self::LINE, self.line);
        encoder.encode_int64_nonzero(Self::COLUMN, self.column);
    }
}

impl Message for Location {
    const NAME: &'static str = "Location";

    fn clear(&mut self) {
        self.id = 0;
        self.mapping_id = 0;
        self.address = 0;
        self.lines.clear();
        self.is_folded = false;
    }

    fn merge_field(&mut self, field: ProtoField<'_>) -> Result<(), DecodeError> {
        match field.number {
            Self::ID => self.id = field.as_u64(Self::NAME)?,
            Self::MAPPING_ID => self.mapping_id = field.as_u64(Self::NAME)?,
            Self::ADDRESS => self.address = field.as_u64(Self::NAME)?,
            Self::LINE => {
                let line = Line::decode(field.as_bytes(Self::NAME)?)?;
                self.lines.push(line);
            }
            Self::IS_FOLDED => self.is_folded = field.as_bool(Self::NAME)?,
            _ => return Err(field.unknown(Self::NAME)),
        }
        Ok(())
    }

    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_uint64(Self::ID, self.id);
        encoder.encode_uint64_nonzero(Self::MAPPING_ID, self.mapping_id);
        encoder.encode_uint64_nonzero(Self::ADDRESS, self.address);
        for line in &self.lines {
            encoder.encode_message(Self::LINE, line);
        }
        encoder.encode_bool_nonzero(Self::IS_FOLDED, self.is_folded);
    }
}

#[cfg(feature = "prost_impls")]
impl From<&Line> for crate::prost_impls::Line {
    fn from(line: &Line) -> Self {
        Self {
            function_id: line.function_id,
            line: line.line,
            column: line.column,
        }
    }
}

#[cfg(feature = "prost_impls")]
impl From<&Location> for crate::prost_impls::Location {
    fn from(location: &Location) -> Self {
        Self {
            id: location.id,
            mapping_id: location.mapping_id,
            address: location.address,
            lines: location
                .lines
                .iter()
                .map(crate::prost_impls::Line::from)
                .collect(),
            is_folded: location.is_folded,
        }
    }
}
