// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Builds synthetic profiles the way a runtime profiler lays them out: one
//! function and one location per frame, with stable addresses so the same
//! frame gets the same address in every round.

#![allow(dead_code)]

use libdd_profiling_delta::DeltaValueType;
use libdd_profiling_protobuf::prost_impls::{
    Function, Label, Line, Location, Profile, Sample, ValueType,
};
use prost::Message;
use std::collections::HashMap;

pub const HEAP_SAMPLE_TYPES: [(&str, &str); 4] = [
    ("alloc_objects", "count"),
    ("alloc_space", "bytes"),
    ("inuse_objects", "count"),
    ("inuse_space", "bytes"),
];

pub fn heap_delta_types() -> Vec<DeltaValueType> {
    vec![
        DeltaValueType::new("alloc_objects", "count"),
        DeltaValueType::new("alloc_space", "bytes"),
    ]
}

/// FNV-1a, so addresses depend only on the frame name.
fn frame_address(name: &str) -> u64 {
    name.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

pub struct ProfileBuilder {
    profile: Profile,
    strings: HashMap<String, i64>,
    frames: HashMap<String, u64>,
}

impl ProfileBuilder {
    pub fn new(sample_types: &[(&str, &str)]) -> Self {
        let mut builder = Self {
            profile: Profile::default(),
            strings: HashMap::new(),
            frames: HashMap::new(),
        };
        builder.string("");
        for (r#type, unit) in sample_types {
            let value_type = ValueType {
                r#type: builder.string(r#type),
                unit: builder.string(unit),
            };
            builder.profile.sample_types.push(value_type);
        }
        builder
    }

    pub fn heap() -> Self {
        Self::new(&HEAP_SAMPLE_TYPES)
    }

    pub fn string(&mut self, s: &str) -> i64 {
        if let Some(offset) = self.strings.get(s) {
            return *offset;
        }
        let offset = self.profile.string_table.len() as i64;
        self.profile.string_table.push(s.to_string());
        self.strings.insert(s.to_string(), offset);
        offset
    }

    fn frame(&mut self, name: &str) -> u64 {
        if let Some(id) = self.frames.get(name) {
            return *id;
        }
        let id = self.frames.len() as u64 + 1;
        let function = Function {
            id,
            name: self.string(name),
            filename: self.string(&format!("{name}.go")),
            ..Default::default()
        };
        self.profile.functions.push(function);
        self.profile.locations.push(Location {
            id,
            address: frame_address(name),
            lines: vec![Line {
                function_id: id,
                line: 10,
                column: 0,
            }],
            ..Default::default()
        });
        self.frames.insert(name.to_string(), id);
        id
    }

    /// Adds a sample; `stack` is leaf first.
    pub fn sample(&mut self, stack: &[&str], values: &[i64]) -> &mut Self {
        self.sample_with_labels(stack, &[], values)
    }

    pub fn sample_with_labels(
        &mut self,
        stack: &[&str],
        labels: &[(&str, &str)],
        values: &[i64],
    ) -> &mut Self {
        let labels = labels
            .iter()
            .map(|(key, value)| Label {
                key: self.string(key),
                str: self.string(value),
                ..Default::default()
            })
            .collect();
        self.push_sample(stack, labels, values)
    }

    /// Adds a sample with numeric labels, given as (key, num, num_unit).
    pub fn sample_with_num_labels(
        &mut self,
        stack: &[&str],
        labels: &[(&str, i64, &str)],
        values: &[i64],
    ) -> &mut Self {
        let labels = labels
            .iter()
            .map(|(key, num, num_unit)| Label {
                key: self.string(key),
                num: *num,
                num_unit: self.string(num_unit),
                ..Default::default()
            })
            .collect();
        self.push_sample(stack, labels, values)
    }

    fn push_sample(&mut self, stack: &[&str], labels: Vec<Label>, values: &[i64]) -> &mut Self {
        let location_ids = stack.iter().map(|frame| self.frame(frame)).collect();
        self.profile.samples.push(Sample {
            location_ids,
            values: values.to_vec(),
            labels,
        });
        self
    }

    pub fn time_nanos(&mut self, time_nanos: i64) -> &mut Self {
        self.profile.time_nanos = time_nanos;
        self
    }

    pub fn build(&self) -> Profile {
        self.profile.clone()
    }

    pub fn encode(&self) -> Vec<u8> {
        self.profile.encode_to_vec()
    }
}

#[track_caller]
pub fn decode(bytes: &[u8]) -> Profile {
    Profile::decode(bytes).unwrap()
}

/// The function names of a sample's stack, leaf first.
#[track_caller]
pub fn stack_names(profile: &Profile, sample: &Sample) -> Vec<String> {
    sample
        .location_ids
        .iter()
        .map(|id| {
            let location = profile
                .locations
                .iter()
                .find(|location| location.id == *id)
                .unwrap_or_else(|| panic!("location {id} not found"));
            let function = profile
                .functions
                .iter()
                .find(|function| function.id == location.lines[0].function_id)
                .unwrap_or_else(|| panic!("function for location {id} not found"));
            profile.string_table[function.name as usize].clone()
        })
        .collect()
}

/// The values of the sample with the given stack, if there is one.
#[track_caller]
pub fn values_of(profile: &Profile, stack: &[&str]) -> Option<Vec<i64>> {
    let matching: Vec<_> = profile
        .samples
        .iter()
        .filter(|sample| stack_names(profile, sample) == stack)
        .collect();
    assert!(matching.len() <= 1, "stack {stack:?} emitted more than once");
    matching.first().map(|sample| sample.values.clone())
}
