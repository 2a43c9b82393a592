// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::hash::SeriesKey;
use crate::{MAX_DELTA_VALUES, MAX_SAMPLE_TYPES};
use hashbrown::HashMap;
use std::hash::BuildHasherDefault;

/// Series keys are already uniformly distributed, so a fast non-keyed hasher
/// is enough.
pub type SeriesMap = HashMap<SeriesKey, SeriesState, BuildHasherDefault<rustc_hash::FxHasher>>;

/// The state of one series across rounds. Fixed-size, so tracking a series
/// doesn't allocate beyond its map slot.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SeriesState {
    /// The cumulative values of the delta columns as of the last round.
    pub last: [i64; MAX_DELTA_VALUES],
    /// The values of this round, summed over duplicate samples.
    pub sum: [i64; MAX_SAMPLE_TYPES],
    /// The round in which the series was last resolved into an output
    /// sample; 0 if never.
    pub resolved_round: u64,
}

impl SeriesState {
    /// Adds one physical sample's values to the round's sum.
    #[inline]
    pub fn add(&mut self, values: &[i64]) {
        for (sum, value) in self.sum.iter_mut().zip(values) {
            *sum = sum.wrapping_add(*value);
        }
    }

    /// Overwrites `values` with the round's output: the difference to the
    /// last round for delta columns (`delta_index[i]` names the column's
    /// slot in `last`), the plain sum for the others. The sum is reset for
    /// the next round.
    pub fn resolve(&mut self, values: &mut [i64], delta_index: &[Option<usize>]) {
        let SeriesState { last, sum, .. } = self;
        for ((value, sum), slot) in values.iter_mut().zip(sum.iter_mut()).zip(delta_index) {
            let previous = match *slot {
                Some(j) => last.get_mut(j),
                None => None,
            };
            *value = match previous {
                Some(previous) => {
                    let delta = sum.wrapping_sub(*previous);
                    *previous = *sum;
                    delta
                }
                None => *sum,
            };
            *sum = 0;
        }
    }
}
