// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// Represents an offset into the Profile's string table. Note that it cannot
/// exceed u32 because an entire protobuf message must not be larger than or
/// equal to 2 GiB. By the time you encode the tag and length prefix for each
/// string, there's no way to get this many unique-ish strings without first
/// exceeding the protobuf 2 GiB limit.
///
/// The schema declares these as int64, so a negative offset on the wire is
/// rejected while decoding rather than being treated as a huge index.
///
/// A value of 0 means "no string" or "empty string" (they are synonymous).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StringOffset(u32);

impl fmt::Display for StringOffset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<usize> for StringOffset {
    type Error = <u32 as TryFrom<usize>>::Error;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Ok(StringOffset(u32::try_from(value)?))
    }
}

impl TryFrom<u64> for StringOffset {
    type Error = <u32 as TryFrom<u64>>::Error;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Ok(StringOffset(u32::try_from(value)?))
    }
}

impl TryFrom<i64> for StringOffset {
    type Error = <u32 as TryFrom<i64>>::Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Ok(StringOffset(u32::try_from(value)?))
    }
}

impl From<u32> for StringOffset {
    fn from(value: u32) -> Self {
        StringOffset(value)
    }
}

impl From<StringOffset> for usize {
    fn from(s: StringOffset) -> Self {
        s.0 as usize
    }
}

impl From<StringOffset> for u64 {
    fn from(s: StringOffset) -> Self {
        u64::from(s.0)
    }
}

impl From<StringOffset> for i64 {
    fn from(s: StringOffset) -> Self {
        i64::from(s.0)
    }
}

impl StringOffset {
    pub const ZERO: Self = Self(0);

    #[inline]
    pub const fn new(offset: u32) -> Self {
        Self(offset)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}
