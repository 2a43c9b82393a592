// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{DeltaError, DeltaProfiler, DeltaValueType};
use hashbrown::HashMap;
use libdd_profiling_protobuf::prost_impls::{
    Function, Label, Line, Location, Mapping, Profile, Sample, ValueType,
};
use prost::Message;
use std::hash::BuildHasherDefault;

type Hasher = BuildHasherDefault<rustc_hash::FxHasher>;
type FxIndexMap<K, V> = indexmap::IndexMap<K, V, Hasher>;
type FxIndexSet<K> = indexmap::IndexSet<K, Hasher>;
type IdMap = HashMap<u64, u64, Hasher>;

/// Computes deltas by decoding whole profiles, negating the previous one's
/// delta columns and merging it into the current one.
///
/// Unlike [`crate::DeltaComputer`] this keeps the entire previous profile and
/// doesn't drop unused locations, functions or strings, but it is simple
/// enough to serve as a reference when testing.
#[derive(Debug, Default)]
pub struct ReferenceDeltaComputer {
    delta_value_types: Vec<DeltaValueType>,
    previous: Option<Profile>,
    output: Vec<u8>,
}

impl ReferenceDeltaComputer {
    pub fn new(delta_value_types: Vec<DeltaValueType>) -> Self {
        Self {
            delta_value_types,
            previous: None,
            output: Vec::new(),
        }
    }

    /// # Errors
    ///
    /// Fails if either profile can't be decoded or merged. The previous
    /// profile is only replaced on success.
    pub fn delta(&mut self, profile: &[u8]) -> Result<&[u8], DeltaError> {
        let current = Profile::decode(profile)?;
        self.output.clear();
        match &self.previous {
            None => self.output.extend_from_slice(profile),
            Some(previous) => {
                let factors = delta_factors(previous, &self.delta_value_types)?;
                let negated = scale(previous, &factors)?;
                let mut merged = merge(&[negated, current.clone()])?;
                merged.time_nanos = current.time_nanos;
                merged.duration_nanos = if previous.time_nanos == 0 {
                    0
                } else {
                    current.time_nanos - previous.time_nanos
                };
                self.output = merged.encode_to_vec();
            }
        }
        self.previous = Some(current);
        Ok(self.output.as_slice())
    }
}

impl DeltaProfiler for ReferenceDeltaComputer {
    fn delta(&mut self, profile: &[u8]) -> Result<&[u8], DeltaError> {
        ReferenceDeltaComputer::delta(self, profile)
    }
}

fn string(table: &[String], index: i64) -> Result<&str, DeltaError> {
    usize::try_from(index)
        .ok()
        .and_then(|index| table.get(index))
        .map(String::as_str)
        .ok_or(DeltaError::StringIndexOutOfRange {
            index: index as u64,
            len: table.len(),
        })
}

fn sample_type_names<'a>(profile: &'a Profile) -> Result<Vec<(&'a str, &'a str)>, DeltaError> {
    profile
        .sample_types
        .iter()
        .map(|value_type| -> Result<_, DeltaError> {
            Ok((
                string(&profile.string_table, value_type.r#type)?,
                string(&profile.string_table, value_type.unit)?,
            ))
        })
        .collect()
}

/// The factor for each sample type that turns the previous profile into
/// what gets subtracted: -1 for delta columns, 0 for the rest, which are
/// reported as they are in the current profile.
pub fn delta_factors(
    profile: &Profile,
    delta_value_types: &[DeltaValueType],
) -> Result<Vec<i64>, DeltaError> {
    Ok(sample_type_names(profile)?
        .into_iter()
        .map(|(r#type, unit)| {
            let is_delta = delta_value_types
                .iter()
                .any(|delta| delta.r#type == r#type && delta.unit == unit);
            if is_delta {
                -1
            } else {
                0
            }
        })
        .collect())
}

/// Multiplies each sample's values by the factor of their sample type.
pub fn scale(profile: &Profile, factors: &[i64]) -> Result<Profile, DeltaError> {
    if factors.len() != profile.sample_types.len() {
        return Err(DeltaError::IncompatibleProfiles);
    }
    let mut scaled = profile.clone();
    for sample in &mut scaled.samples {
        if sample.values.len() != factors.len() {
            return Err(DeltaError::SampleValueCount {
                expected: factors.len(),
                actual: sample.values.len(),
            });
        }
        for (value, factor) in sample.values.iter_mut().zip(factors) {
            *value = value.wrapping_mul(*factor);
        }
    }
    Ok(scaled)
}

/// Adds profiles together. Samples with the same stack and label set are
/// summed; stacks are compared by content (addresses, mappings, functions,
/// lines), not ids. Samples that sum to zero are dropped.
///
/// Metadata such as the period comes from the first profile; the time is
/// the earliest nonzero one and the durations are added up.
///
/// # Errors
///
/// Fails if the profiles have different sample types, or if a profile
/// refers to a string, mapping, function or location it doesn't have.
pub fn merge(profiles: &[Profile]) -> Result<Profile, DeltaError> {
    let Some((first, rest)) = profiles.split_first() else {
        return Ok(Profile::default());
    };
    let sample_types = sample_type_names(first)?;
    for profile in rest {
        if sample_type_names(profile)? != sample_types {
            return Err(DeltaError::IncompatibleProfiles);
        }
    }

    let mut merger = Merger::new(sample_types.len());
    for profile in profiles {
        merger.add(profile)?;
    }
    merger.finish(first, profiles)
}

/// Accumulates the merged profile. Entities are interned by content and get
/// new ids, their index plus one.
struct Merger {
    sample_type_count: usize,
    strings: FxIndexSet<String>,
    mappings: FxIndexSet<Mapping>,
    functions: FxIndexSet<Function>,
    locations: FxIndexSet<Location>,
    samples: FxIndexMap<(Vec<u64>, Vec<Label>), Vec<i64>>,
}

impl Merger {
    fn new(sample_type_count: usize) -> Self {
        let mut strings = FxIndexSet::default();
        strings.insert(String::new());
        Self {
            sample_type_count,
            strings,
            mappings: FxIndexSet::default(),
            functions: FxIndexSet::default(),
            locations: FxIndexSet::default(),
            samples: FxIndexMap::default(),
        }
    }

    fn string(&mut self, table: &[String], index: i64) -> Result<i64, DeltaError> {
        let value = string(table, index)?;
        let offset = match self.strings.get_index_of(value) {
            Some(offset) => offset,
            None => self.strings.insert_full(value.to_string()).0,
        };
        Ok(offset as i64)
    }

    fn add(&mut self, profile: &Profile) -> Result<(), DeltaError> {
        let table = profile.string_table.as_slice();

        let mut mapping_ids = IdMap::default();
        for mapping in &profile.mappings {
            let key = Mapping {
                id: 0,
                filename: self.string(table, mapping.filename)?,
                build_id: self.string(table, mapping.build_id)?,
                ..*mapping
            };
            let (index, _) = self.mappings.insert_full(key);
            mapping_ids.insert(mapping.id, index as u64 + 1);
        }

        let mut function_ids = IdMap::default();
        for function in &profile.functions {
            let key = Function {
                id: 0,
                name: self.string(table, function.name)?,
                system_name: self.string(table, function.system_name)?,
                filename: self.string(table, function.filename)?,
                start_line: function.start_line,
            };
            let (index, _) = self.functions.insert_full(key);
            function_ids.insert(function.id, index as u64 + 1);
        }

        let mut location_ids = IdMap::default();
        for location in &profile.locations {
            let mapping_id = match location.mapping_id {
                0 => 0,
                id => *mapping_ids.get(&id).ok_or(DeltaError::UnknownMapping(id))?,
            };
            let lines = location
                .lines
                .iter()
                .map(|line| -> Result<Line, DeltaError> {
                    let function_id = match line.function_id {
                        0 => 0,
                        id => *function_ids
                            .get(&id)
                            .ok_or(DeltaError::UnknownFunction(id))?,
                    };
                    Ok(Line {
                        function_id,
                        ..*line
                    })
                })
                .collect::<Result<Vec<_>, DeltaError>>()?;
            let key = Location {
                id: 0,
                mapping_id,
                address: location.address,
                lines,
                is_folded: location.is_folded,
            };
            let (index, _) = self.locations.insert_full(key);
            location_ids.insert(location.id, index as u64 + 1);
        }

        for sample in &profile.samples {
            if sample.values.len() != self.sample_type_count {
                return Err(DeltaError::SampleValueCount {
                    expected: self.sample_type_count,
                    actual: sample.values.len(),
                });
            }
            let stack = sample
                .location_ids
                .iter()
                .map(|id| {
                    location_ids
                        .get(id)
                        .copied()
                        .ok_or(DeltaError::UnknownLocation(*id))
                })
                .collect::<Result<Vec<_>, DeltaError>>()?;
            let mut labels = Vec::with_capacity(sample.labels.len());
            for label in &sample.labels {
                labels.push(Label {
                    key: self.string(table, label.key)?,
                    str: self.string(table, label.str)?,
                    num: label.num,
                    num_unit: self.string(table, label.num_unit)?,
                });
            }
            labels.sort_unstable();

            let count = self.sample_type_count;
            let sums = self
                .samples
                .entry((stack, labels))
                .or_insert_with(|| vec![0; count]);
            for (sum, value) in sums.iter_mut().zip(&sample.values) {
                *sum = sum.wrapping_add(*value);
            }
        }
        Ok(())
    }

    fn finish(mut self, first: &Profile, profiles: &[Profile]) -> Result<Profile, DeltaError> {
        let table = first.string_table.as_slice();
        let sample_types = first
            .sample_types
            .iter()
            .map(|value_type| -> Result<ValueType, DeltaError> {
                Ok(ValueType {
                    r#type: self.string(table, value_type.r#type)?,
                    unit: self.string(table, value_type.unit)?,
                })
            })
            .collect::<Result<Vec<_>, DeltaError>>()?;
        let period_type = match first.period_type {
            Some(period_type) => Some(ValueType {
                r#type: self.string(table, period_type.r#type)?,
                unit: self.string(table, period_type.unit)?,
            }),
            None => None,
        };
        let comment = first
            .comment
            .iter()
            .map(|offset| self.string(table, *offset))
            .collect::<Result<Vec<_>, DeltaError>>()?;
        let drop_frames = self.string(table, first.drop_frames)?;
        let keep_frames = self.string(table, first.keep_frames)?;
        let default_sample_type = self.string(table, first.default_sample_type)?;

        let samples = self
            .samples
            .into_iter()
            .filter(|(_, values)| values.iter().any(|value| *value != 0))
            .map(|((location_ids, labels), values)| Sample {
                location_ids,
                values,
                labels,
            })
            .collect();

        Ok(Profile {
            sample_types,
            samples,
            mappings: with_ids(self.mappings, |mapping, id| Mapping { id, ..mapping }),
            locations: with_ids(self.locations, |location, id| Location { id, ..location }),
            functions: with_ids(self.functions, |function, id| Function { id, ..function }),
            string_table: self.strings.into_iter().collect(),
            drop_frames,
            keep_frames,
            time_nanos: profiles
                .iter()
                .map(|profile| profile.time_nanos)
                .filter(|nanos| *nanos != 0)
                .min()
                .unwrap_or_default(),
            duration_nanos: profiles
                .iter()
                .fold(0i64, |sum, profile| sum.wrapping_add(profile.duration_nanos)),
            period_type,
            period: first.period,
            comment,
            default_sample_type,
        })
    }
}

fn with_ids<T, F>(set: FxIndexSet<T>, mut f: F) -> Vec<T>
where
    F: FnMut(T, u64) -> T,
{
    set.into_iter()
        .zip(1u64..)
        .map(|(item, id)| f(item, id))
        .collect()
}
