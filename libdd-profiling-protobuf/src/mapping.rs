// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{DecodeError, Encoder, Message, ProtoField, StringOffset};

/// Describes the mapping of a binary in memory, including its address range,
/// file offset, and metadata like build ID.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Mapping {
    /// Unique nonzero id for the mapping.
    pub id: u64,
    /// Address at which the binary (or DLL) is loaded into memory.
    pub memory_start: u64,
    /// The limit of the address range occupied by this mapping.
    pub memory_limit: u64,
    /// Offset in the binary that corresponds to the first mapped address.
    pub file_offset: u64,
    /// The object this entry is loaded from. This can be a filename on
    /// disk for the main binary and shared libraries, or virtual
    /// abstractions like "[vdso]".
    pub filename: StringOffset,
    /// A string that uniquely identifies a particular program version
    /// with high probability. E.g., for binaries generated by GNU tools,
    /// it could be the contents of the .note.gnu.build-id field.
    pub build_id: StringOffset,
    pub has_functions: bool,
    pub has_filenames: bool,
    pub has_line_numbers: bool,
    pub has_inline_frames: bool,
}

impl Mapping {
    pub const ID: u32 = 1;
    pub const MEMORY_START: u32 = 2;
    pub const MEMORY_LIMIT: u32 = 3;
    pub const FILE_OFFSET: u32 = 4;
    pub const FILENAME: u32 = 5;
    pub const BUILD_ID: u32 = 6;
    pub const HAS_FUNCTIONS: u32 = 7;
    pub const HAS_FILENAMES: u32 = 8;
    pub const HAS_LINE_NUMBERS: u32 = 9;
    pub const HAS_INLINE_FRAMES: u32 = 10;
}

impl Message for Mapping {
    const NAME: &'static str = "Mapping";

    fn clear(&mut self) {
        *self = Self::default();
    }

    fn merge_field(&mut self, field: ProtoField<'_>) -> Result<(), DecodeError> {
        match field.number {
            Self::ID => self.id = field.as_u64(Self::NAME)?,
            Self::MEMORY_START => self.memory_start = field.as_u64(Self::NAME)?,
            Self::MEMORY_LIMIT => self.memory_limit = field.as_u64(Self::NAME)?,
            Self::FILE_OFFSET => self.file_offset = field.as_u64(Self::NAME)?,
            Self::FILENAME => self.filename = field.as_string_offset(Self::NAME)?,
            Self::BUILD_ID => self.build_id = field.as_string_offset(Self::NAME)?,
            Self::HAS_FUNCTIONS => self.has_functions = field.as_bool(Self::NAME)?,
            Self::HAS_FILENAMES => self.has_filenames = field.as_bool(Self::NAME)?,
            Self::HAS_LINE_NUMBERS => self.has_line_numbers = field.as_bool(Self::NAME)?,
            Self::HAS_INLINE_FRAMES => self.has_inline_frames = field.as_bool(Self::NAME)?,
            _ => return Err(field.unknown(Self::NAME)),
        }
        Ok(())
    }

    fn encode(&self, encoder: &mut Encoder) {
        // The id is not zero-optimized; consumers need it to match locations.
        encoder.encode_uint64(Self::ID, self.id);
        encoder.encode_uint64_nonzero(Self::MEMORY_START, self.memory_start);
        encoder.encode_uint64_nonzero(Self::MEMORY_LIMIT, self.memory_limit);
        encoder.encode_uint64_nonzero(Self::FILE_OFFSET, self.file_offset);
        encoder.encode_uint64_nonzero(Self::FILENAME, self.filename.into());
        encoder.encode_uint64_nonzero(Self::BUILD_ID, self.build_id.into());
        encoder.encode_bool_nonzero(Self::HAS_FUNCTIONS, self.has_functions);
        encoder.encode_bool_nonzero(Self::HAS_FILENAMES, self.has_filenames);
        encoder.encode_bool_nonzero(Self::HAS_LINE_NUMBERS, self.has_line_numbers);
        encoder.encode_bool_nonzero(Self::HAS_INLINE_FRAMES, self.has_inline_frames);
    }
}

#[cfg(feature = "prost_impls")]
impl From<&Mapping> for crate::prost_impls::Mapping {
    fn from(mapping: &Mapping) -> Self {
        Self {
            id: mapping.id,
            memory_start: mapping.memory_start,
            memory_limit: mapping.memory_limit,
            file_offset: mapping.file_offset,
            filename: mapping.filename.into(),
            build_id: mapping.build_id.into(),
            has_functions: mapping.has_functions,
            has_filenames: mapping.has_filenames,
            has_line_numbers: mapping.has_line_numbers,
            has_inline_frames: mapping.has_inline_frames,
        }
    }
}

#[cfg(all(test, feature = "prost_impls"))]
mod tests {
    use super::*;
    use crate::prost_impls;
    use prost::Message as _;

    #[test]
    fn roundtrip() {
        bolero::check!()
            .with_type::<(u64, u64, u64, u64, u32, u32, bool, bool)>()
            .for_each(|(id, start, limit, offset, filename, build_id, funcs, lines)| {
                let mapping = Mapping {
                    id: *id,
                    memory_start: *start,
                    memory_limit: *limit,
                    file_offset: *offset,
                    filename: StringOffset::new(*filename),
                    build_id: StringOffset::new(*build_id),
                    has_functions: *funcs,
                    has_filenames: *funcs,
                    has_line_numbers: *lines,
                    has_inline_frames: *lines,
                };
                let mut encoder = Encoder::new();
                mapping.encode(&mut encoder);

                let prost_mapping = prost_impls::Mapping::decode(encoder.as_slice()).unwrap();
                assert_eq!(prost_impls::Mapping::from(&mapping), prost_mapping);

                let roundtrip = Mapping::decode(&prost_mapping.encode_to_vec()).unwrap();
                assert_eq!(mapping, roundtrip);
            });
    }
}
