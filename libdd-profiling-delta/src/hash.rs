// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::index::LocationIndex;
use crate::DeltaError;
use libdd_profiling_protobuf::{Label, Sample, StringOffset};
use sha2::{Digest, Sha256};

/// A 128-bit digest: the first half of a SHA-256.
pub type Hash128 = [u8; 16];

/// Identifies one logical series, a call stack plus a label set, across
/// rounds.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SeriesKey(pub Hash128);

/// Computes string and series hashes, reusing its hasher state and label
/// scratch space between samples.
#[derive(Clone, Debug, Default)]
pub struct SeriesHasher {
    hasher: Sha256,
    label_hashes: Vec<Hash128>,
}

impl SeriesHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards any partially hashed input.
    pub fn reset(&mut self) {
        Digest::reset(&mut self.hasher);
        self.label_hashes.clear();
    }

    fn finish(&mut self) -> Hash128 {
        let digest = self.hasher.finalize_reset();
        let mut hash = Hash128::default();
        for (dst, src) in hash.iter_mut().zip(digest.iter()) {
            *dst = *src;
        }
        hash
    }

    pub fn hash_bytes(&mut self, bytes: &[u8]) -> Hash128 {
        self.hasher.update(bytes);
        self.finish()
    }

    fn label_hash(&mut self, label: &Label, strings: &[Hash128]) -> Result<Hash128, DeltaError> {
        let key = string_hash(strings, label.key)?;
        let num_unit = string_hash(strings, label.num_unit)?;
        let str = string_hash(strings, label.str)?;
        self.hasher.update(key);
        self.hasher.update(num_unit);
        self.hasher.update(label.num.to_be_bytes());
        self.hasher.update(str);
        Ok(self.finish())
    }

    /// Hashes the sample's stack, in order, and its labels, in canonical
    /// order. `strings` holds the hash of every string table entry.
    ///
    /// # Errors
    ///
    /// Fails if a label refers past the end of the string table, or if a
    /// location id isn't in `locations`.
    pub fn series_key(
        &mut self,
        sample: &Sample,
        strings: &[Hash128],
        locations: &LocationIndex,
    ) -> Result<SeriesKey, DeltaError> {
        self.label_hashes.clear();
        for label in &sample.labels {
            let hash = self.label_hash(label, strings)?;
            self.label_hashes.push(hash);
        }
        if self.label_hashes.len() > 1 {
            self.label_hashes.sort_unstable();
        }

        for &id in &sample.location_ids {
            let Some(address) = locations.address(id) else {
                self.reset();
                return Err(DeltaError::UnknownLocation(id));
            };
            self.hasher.update(address.to_le_bytes());
        }
        for hash in &self.label_hashes {
            self.hasher.update(hash);
        }
        Ok(SeriesKey(self.finish()))
    }
}

fn string_hash(strings: &[Hash128], offset: StringOffset) -> Result<Hash128, DeltaError> {
    let index = usize::from(offset);
    strings
        .get(index)
        .copied()
        .ok_or(DeltaError::StringIndexOutOfRange {
            index: u64::from(offset),
            len: strings.len(),
        })
}
