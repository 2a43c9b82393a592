// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-call lookup structures. All of them are cleared between calls without
//! releasing their memory.

use hashbrown::{HashMap, HashSet};
use std::hash::BuildHasherDefault;

type Hasher = BuildHasherDefault<rustc_hash::FxHasher>;

/// Ids below this are stored in dense vectors indexed by id. Runtimes usually
/// number locations and functions sequentially from 1, but ids may be any
/// u64, so larger ones go into a hash map.
const DENSE_ID_LIMIT: u64 = 1 << 16;

#[inline]
fn dense_index(id: u64) -> Option<usize> {
    if id < DENSE_ID_LIMIT {
        usize::try_from(id).ok()
    } else {
        None
    }
}

/// Maps location ids to their addresses.
#[derive(Clone, Debug, Default)]
pub struct LocationIndex {
    dense: Vec<Option<u64>>,
    sparse: HashMap<u64, u64, Hasher>,
}

impl LocationIndex {
    pub fn clear(&mut self) {
        self.dense.clear();
        self.sparse.clear();
    }

    /// Records a location. A repeated id replaces the earlier address.
    pub fn insert(&mut self, id: u64, address: u64) {
        match dense_index(id) {
            Some(index) => {
                if self.dense.len() <= index {
                    self.dense.resize(index + 1, None);
                }
                if let Some(slot) = self.dense.get_mut(index) {
                    *slot = Some(address);
                }
            }
            None => {
                self.sparse.insert(id, address);
            }
        }
    }

    #[inline]
    pub fn address(&self, id: u64) -> Option<u64> {
        match dense_index(id) {
            Some(index) => self.dense.get(index).copied().flatten(),
            None => self.sparse.get(&id).copied(),
        }
    }
}

/// A growable set of small integers.
#[derive(Clone, Debug, Default)]
pub struct DenseBitSet {
    words: Vec<u64>,
}

impl DenseBitSet {
    #[inline]
    pub fn clear(&mut self) {
        self.words.clear();
    }

    pub fn insert(&mut self, index: usize) {
        let word = index / 64;
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        if let Some(bits) = self.words.get_mut(word) {
            *bits |= 1u64 << (index % 64);
        }
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.words
            .get(index / 64)
            .is_some_and(|bits| *bits & (1u64 << (index % 64)) != 0)
    }
}

/// A set of 64-bit ids: a bitset for small ids and a hash set for the rest.
#[derive(Clone, Debug, Default)]
pub struct IdSet {
    dense: DenseBitSet,
    sparse: HashSet<u64, Hasher>,
}

impl IdSet {
    pub fn clear(&mut self) {
        self.dense.clear();
        self.sparse.clear();
    }

    pub fn insert(&mut self, id: u64) {
        match dense_index(id) {
            Some(index) => self.dense.insert(index),
            None => {
                self.sparse.insert(id);
            }
        }
    }

    #[inline]
    pub fn contains(&self, id: u64) -> bool {
        match dense_index(id) {
            Some(index) => self.dense.contains(index),
            None => self.sparse.contains(&id),
        }
    }
}
