// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{DecodeError, Encoder, Label, Message, ProtoField};

/// Each Sample records values encountered in some program context. The
/// program context is typically a stack trace, perhaps augmented with
/// auxiliary information like the thread-id, some indicator of a higher level
/// request being handled, etc.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Sample {
    /// The ids recorded here correspond to a Profile.location.id.
    /// The leaf is at location_id\[0\].
    pub location_ids: Vec<u64>,
    /// The type and unit of each value is defined by the corresponding entry
    /// in Profile.sample_type. All samples must have the same number of
    /// values, the same as the length of Profile.sample_type. When
    /// aggregating multiple samples into a single sample, the result has a
    /// list of values that is the element-wise sum of the original lists.
    pub values: Vec<i64>,
    pub labels: Vec<Label>,
}

impl Sample {
    pub const LOCATION_ID: u32 = 1;
    pub const VALUE: u32 = 2;
    pub const LABEL: u32 = 3;
}

impl Message for Sample {
    const NAME: &'static str = "Sample";

    fn clear(&mut self) {
        self.location_ids.clear();
        self.values.clear();
        self.labels.clear();
    }

    fn merge_field(&mut self, field: ProtoField<'_>) -> Result<(), DecodeError> {
        match field.number {
            Self::LOCATION_ID => {
                let location_ids = &mut self.location_ids;
                field.for_each_varint(Self::NAME, |id| location_ids.push(id))?;
            }
            Self::VALUE => {
                let values = &mut self.values;
                field.for_each_varint(Self::NAME, |value| values.push(value as i64))?;
            }
            Self::LABEL => {
                let label = Label::decode(field.as_bytes(Self::NAME)?)?;
                self.labels.push(label);
            }
            _ => return Err(field.unknown(Self::NAME)),
        }
        Ok(())
    }

    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_repeated_uint64(Self::LOCATION_ID, &self.location_ids);
        encoder.encode_repeated_int64(Self::VALUE, &self.values);
        for label in &self.labels {
            encoder.encode_message(Self::LABEL, label);
        }
    }
}

#[cfg(feature = "prost_impls")]
impl From<&Sample> for crate::prost_impls::Sample {
    fn from(sample: &Sample) -> Self {
        Self {
            location_ids: sample.location_ids.clone(),
            values: sample.values.clone(),
            labels: sample
                .labels
                .iter()
                .map(crate::prost_impls::Label::from)
                .collect(),
        }
    }
}
