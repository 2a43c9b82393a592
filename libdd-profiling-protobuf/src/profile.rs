// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{DecodeError, Decoder, Encoder, FieldValue, ProtoField, StringOffset, WireType};

/// The fields of the top-level Profile message, by field number.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u32)]
pub enum ProfileFieldKind {
    SampleType = 1,
    Sample = 2,
    Mapping = 3,
    Location = 4,
    Function = 5,
    StringTable = 6,
    DropFrames = 7,
    KeepFrames = 8,
    TimeNanos = 9,
    DurationNanos = 10,
    PeriodType = 11,
    Period = 12,
    Comment = 13,
    DefaultSampleType = 14,
}

impl ProfileFieldKind {
    #[inline]
    pub const fn number(self) -> u32 {
        self as u32
    }

    pub const fn from_number(number: u32) -> Option<Self> {
        Some(match number {
            1 => Self::SampleType,
            2 => Self::Sample,
            3 => Self::Mapping,
            4 => Self::Location,
            5 => Self::Function,
            6 => Self::StringTable,
            7 => Self::DropFrames,
            8 => Self::KeepFrames,
            9 => Self::TimeNanos,
            10 => Self::DurationNanos,
            11 => Self::PeriodType,
            12 => Self::Period,
            13 => Self::Comment,
            14 => Self::DefaultSampleType,
            _ => return None,
        })
    }
}

/// Selects which top-level fields a [`ProfileDecoder`] yields. Fields outside
/// the mask are skipped over without decoding their payloads.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FieldMask(u32);

impl FieldMask {
    pub const EMPTY: Self = Self(0);

    /// Builds a mask from a list of kinds; usable in constants.
    pub const fn of(kinds: &[ProfileFieldKind]) -> Self {
        let mut mask = Self::EMPTY;
        let mut i = 0;
        while i < kinds.len() {
            mask = mask.with(kinds[i]);
            i += 1;
        }
        mask
    }

    #[inline]
    pub const fn with(self, kind: ProfileFieldKind) -> Self {
        Self(self.0 | (1 << kind.number()))
    }

    #[inline]
    pub const fn contains(self, kind: ProfileFieldKind) -> bool {
        self.0 & (1 << kind.number()) != 0
    }
}

/// One decoded top-level field of a Profile. Nested messages are left as
/// their raw bytes, so a caller decodes only what it needs and can re-emit a
/// field verbatim with [`ProfileField::encode`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProfileField<'a> {
    /// A raw [`crate::ValueType`].
    SampleType(&'a [u8]),
    /// A raw [`crate::Sample`].
    Sample(&'a [u8]),
    /// A raw [`crate::Mapping`].
    Mapping(&'a [u8]),
    /// A raw [`crate::Location`].
    Location(&'a [u8]),
    /// A raw [`crate::Function`].
    Function(&'a [u8]),
    /// One entry of the string table.
    StringTable(&'a [u8]),
    DropFrames(StringOffset),
    KeepFrames(StringOffset),
    TimeNanos(i64),
    DurationNanos(i64),
    /// A raw [`crate::ValueType`].
    PeriodType(&'a [u8]),
    Period(i64),
    /// One or more comments (string table offsets); packed or unpacked.
    Comment(ProtoField<'a>),
    DefaultSampleType(StringOffset),
}

const PROFILE: &str = "Profile";

impl<'a> ProfileField<'a> {
    /// Interprets a raw field of the Profile message, checking its wire type.
    pub fn from_proto(field: ProtoField<'a>) -> Result<Self, DecodeError> {
        use ProfileFieldKind as Kind;
        let Some(kind) = ProfileFieldKind::from_number(field.number) else {
            return Err(field.unknown(PROFILE));
        };
        Ok(match kind {
            Kind::SampleType => Self::SampleType(field.as_bytes(PROFILE)?),
            Kind::Sample => Self::Sample(field.as_bytes(PROFILE)?),
            Kind::Mapping => Self::Mapping(field.as_bytes(PROFILE)?),
            Kind::Location => Self::Location(field.as_bytes(PROFILE)?),
            Kind::Function => Self::Function(field.as_bytes(PROFILE)?),
            Kind::StringTable => Self::StringTable(field.as_bytes(PROFILE)?),
            Kind::DropFrames => Self::DropFrames(field.as_string_offset(PROFILE)?),
            Kind::KeepFrames => Self::KeepFrames(field.as_string_offset(PROFILE)?),
            Kind::TimeNanos => Self::TimeNanos(field.as_i64(PROFILE)?),
            Kind::DurationNanos => Self::DurationNanos(field.as_i64(PROFILE)?),
            Kind::PeriodType => Self::PeriodType(field.as_bytes(PROFILE)?),
            Kind::Period => Self::Period(field.as_i64(PROFILE)?),
            Kind::Comment => match field.value {
                FieldValue::Varint(_) | FieldValue::Bytes(_) => Self::Comment(field),
                FieldValue::Fixed32(_) | FieldValue::Fixed64(_) => {
                    return Err(field.mismatch(PROFILE, WireType::Varint))
                }
            },
            Kind::DefaultSampleType => {
                Self::DefaultSampleType(field.as_string_offset(PROFILE)?)
            }
        })
    }

    pub const fn kind(&self) -> ProfileFieldKind {
        match self {
            Self::SampleType(_) => ProfileFieldKind::SampleType,
            Self::Sample(_) => ProfileFieldKind::Sample,
            Self::Mapping(_) => ProfileFieldKind::Mapping,
            Self::Location(_) => ProfileFieldKind::Location,
            Self::Function(_) => ProfileFieldKind::Function,
            Self::StringTable(_) => ProfileFieldKind::StringTable,
            Self::DropFrames(_) => ProfileFieldKind::DropFrames,
            Self::KeepFrames(_) => ProfileFieldKind::KeepFrames,
            Self::TimeNanos(_) => ProfileFieldKind::TimeNanos,
            Self::DurationNanos(_) => ProfileFieldKind::DurationNanos,
            Self::PeriodType(_) => ProfileFieldKind::PeriodType,
            Self::Period(_) => ProfileFieldKind::Period,
            Self::Comment(_) => ProfileFieldKind::Comment,
            Self::DefaultSampleType(_) => ProfileFieldKind::DefaultSampleType,
        }
    }

    /// Visits the string table offsets of a [`ProfileField::Comment`]; does
    /// nothing for other kinds.
    pub fn for_each_comment<F>(&self, mut f: F) -> Result<(), DecodeError>
    where
        F: FnMut(i64),
    {
        match self {
            Self::Comment(field) => field.for_each_varint(PROFILE, |value| f(value as i64)),
            _ => Ok(()),
        }
    }

    /// Re-emits the field as it was read. Scalars equal to zero are omitted,
    /// matching proto3 implicit presence; string table entries and nested
    /// messages are always written.
    pub fn encode(&self, encoder: &mut Encoder) {
        let number = self.kind().number();
        match *self {
            Self::SampleType(bytes)
            | Self::Sample(bytes)
            | Self::Mapping(bytes)
            | Self::Location(bytes)
            | Self::Function(bytes)
            | Self::StringTable(bytes)
            | Self::PeriodType(bytes) => encoder.encode_bytes(number, bytes),
            Self::DropFrames(offset)
            | Self::KeepFrames(offset)
            | Self::DefaultSampleType(offset) => {
                encoder.encode_uint64_nonzero(number, offset.into())
            }
            Self::TimeNanos(value) | Self::DurationNanos(value) | Self::Period(value) => {
                encoder.encode_int64_nonzero(number, value)
            }
            Self::Comment(field) => match field.value {
                FieldValue::Bytes(packed) => encoder.encode_bytes(number, packed),
                FieldValue::Varint(value) => encoder.encode_uint64(number, value),
                FieldValue::Fixed32(_) | FieldValue::Fixed64(_) => {}
            },
        }
    }
}

/// Walks the top-level fields of an encoded Profile, yielding the ones in the
/// mask. Every field is still tokenized, so a field number that isn't part of
/// the Profile schema is an error even when it falls outside the mask.
#[derive(Clone, Debug)]
pub struct ProfileDecoder<'a> {
    decoder: Decoder<'a>,
    mask: FieldMask,
}

impl<'a> ProfileDecoder<'a> {
    pub const fn new(profile: &'a [u8], mask: FieldMask) -> Self {
        Self {
            decoder: Decoder::new(profile),
            mask,
        }
    }
}

impl<'a> Iterator for ProfileDecoder<'a> {
    type Item = Result<ProfileField<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let field = match self.decoder.next()? {
                Ok(field) => field,
                Err(err) => return Some(Err(err)),
            };
            let Some(kind) = ProfileFieldKind::from_number(field.number) else {
                // Nothing more is read after a malformed field.
                self.decoder.exhaust();
                return Some(Err(field.unknown(PROFILE)));
            };
            if self.mask.contains(kind) {
                return Some(ProfileField::from_proto(field));
            }
        }
    }
}
