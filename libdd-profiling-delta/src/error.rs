// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use libdd_profiling_protobuf::DecodeError;
use std::io;

/// Errors returned by a [`crate::DeltaProfiler`]. Every variant aborts the
/// call that produced it; the computer stays usable and resets its series
/// state at the start of the next call.
#[derive(Debug, thiserror::Error)]
pub enum DeltaError {
    /// The input is not valid pprof wire data.
    #[error("malformed profile: {0}")]
    Decode(#[from] DecodeError),
    #[error("profile declares {count} sample types, at most {max} are supported")]
    TooManySampleTypes { count: usize, max: usize },
    #[error("{count} delta value types are configured, at most {max} are supported")]
    TooManyDeltaValues { count: usize, max: usize },
    /// A sample's value count differs from the number of sample types.
    #[error("sample has {actual} values, but the profile declares {expected} sample types")]
    SampleValueCount { expected: usize, actual: usize },
    #[error("string table index {index} is out of range, the table has {len} entries")]
    StringIndexOutOfRange { index: u64, len: usize },
    /// A sample references a location id that the profile doesn't define.
    #[error("sample references unknown location id {0}")]
    UnknownLocation(u64),
    /// A sample's series wasn't seen while aggregating. This only happens if
    /// the input changes between passes.
    #[error("sample series was not found in the aggregated series")]
    UnknownSeries,
    #[error("location references unknown function id {0}")]
    UnknownFunction(u64),
    #[error("location references unknown mapping id {0}")]
    UnknownMapping(u64),
    /// Two profiles with different sample types can't be merged.
    #[error("profiles have incompatible sample types")]
    IncompatibleProfiles,
    /// An internal fault was caught while computing the delta.
    #[error("delta computation panicked: {0}")]
    Panicked(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("reference decoder failed: {0}")]
    Oracle(#[from] prost::DecodeError),
}

impl DeltaError {
    /// Converts the payload of a caught panic into an error.
    #[cold]
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panicked(message)
    }
}
