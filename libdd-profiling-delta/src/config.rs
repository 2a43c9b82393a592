// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Names a sample type whose values are cumulative since process start and
/// need to be converted into per-interval deltas. Sample types which aren't
/// configured pass through unchanged.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct DeltaValueType {
    pub r#type: String,
    pub unit: String,
}

impl DeltaValueType {
    pub fn new(r#type: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            r#type: r#type.into(),
            unit: unit.into(),
        }
    }
}

impl fmt::Display for DeltaValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.r#type, self.unit)
    }
}

/// The runtime profile types a scheduler collects.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    Cpu,
    Heap,
    Mutex,
    Block,
    Goroutine,
}

impl ProfileKind {
    pub const ALL: [ProfileKind; 5] = [
        ProfileKind::Cpu,
        ProfileKind::Heap,
        ProfileKind::Mutex,
        ProfileKind::Block,
        ProfileKind::Goroutine,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ProfileKind::Cpu => "cpu",
            ProfileKind::Heap => "heap",
            ProfileKind::Mutex => "mutex",
            ProfileKind::Block => "block",
            ProfileKind::Goroutine => "goroutine",
        }
    }

    /// The cumulative sample types of this kind of profile. CPU profiles
    /// already cover a single window and goroutine profiles are snapshots, so
    /// neither has any.
    pub fn delta_value_types(self) -> Vec<DeltaValueType> {
        match self {
            ProfileKind::Heap => vec![
                DeltaValueType::new("alloc_objects", "count"),
                DeltaValueType::new("alloc_space", "bytes"),
            ],
            ProfileKind::Mutex | ProfileKind::Block => vec![
                DeltaValueType::new("contentions", "count"),
                DeltaValueType::new("delay", "nanoseconds"),
            ],
            ProfileKind::Cpu | ProfileKind::Goroutine => Vec::new(),
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown profile kind `{0}`")]
pub struct UnknownProfileKind(String);

impl FromStr for ProfileKind {
    type Err = UnknownProfileKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProfileKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownProfileKind(s.to_string()))
    }
}

/// The delta configuration of one [`crate::DeltaComputer`].
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct DeltaConfig {
    pub value_types: Vec<DeltaValueType>,
}

impl DeltaConfig {
    pub fn for_kind(kind: ProfileKind) -> Self {
        Self {
            value_types: kind.delta_value_types(),
        }
    }

    /// Parses a configuration such as
    /// `{"value_types": [{"type": "alloc_space", "unit": "bytes"}]}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<ProfileKind> for DeltaConfig {
    fn from(kind: ProfileKind) -> Self {
        Self::for_kind(kind)
    }
}
