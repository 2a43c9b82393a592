// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

//! Delta profiles for pprof.
//!
//! Some profile types, such as heap allocations or mutex contention, report
//! values which are cumulative since the process started. A profiler in the
//! process snapshots them periodically, and what the backend wants is how
//! much each value grew since the previous snapshot. The computers in this
//! crate take the stream of snapshots and produce that:
//!
//! - [DeltaComputer] works on the encoded bytes directly. It never builds the
//!   whole profile in memory, drops samples whose delta is zero, and removes
//!   the locations, functions and strings only those samples used.
//! - [CompressingDeltaComputer] wraps it for gzip-compressed profiles.
//! - [ReferenceDeltaComputer] decodes both profiles fully and merges them.
//!   It is slower and keeps unused entities, and exists to check the others.
//!
//! Which sample types are cumulative is configured with [DeltaValueType]s;
//! see [ProfileKind::delta_value_types] for the usual ones. Others pass
//! through unchanged.
//!
//! A computer holds the previous round's values, so each profile kind needs
//! its own, and calls to one computer must not overlap.

mod compressing;
mod computer;
mod config;
mod error;
mod hash;
mod index;
mod reference;
mod series;

pub use compressing::*;
pub use computer::*;
pub use config::*;
pub use error::*;
pub use reference::*;

/// The most sample types a profile may declare.
pub const MAX_SAMPLE_TYPES: usize = 4;

/// The most delta columns a profile may have.
pub const MAX_DELTA_VALUES: usize = 2;

/// Converts successive cumulative profiles into deltas.
pub trait DeltaProfiler {
    /// Returns the delta between `profile` and the profile given to the
    /// previous call. The first call returns every value as is.
    ///
    /// The output borrows a buffer owned by the profiler. When an error is
    /// returned, nothing the call produced may be used.
    fn delta(&mut self, profile: &[u8]) -> Result<&[u8], DeltaError>;
}
