// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::hash::{Hash128, SeriesHasher};
use crate::index::{DenseBitSet, IdSet, LocationIndex};
use crate::series::SeriesMap;
use crate::{DeltaError, DeltaProfiler, DeltaValueType, MAX_DELTA_VALUES, MAX_SAMPLE_TYPES};
use arrayvec::ArrayVec;
use libdd_profiling_protobuf::{
    Encoder, FieldMask, Function, Location, Mapping, Message, ProfileDecoder, ProfileField,
    ProfileFieldKind as Kind, Sample, StringOffset, ValueType,
};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, warn};

const INDEX_FIELDS: FieldMask =
    FieldMask::of(&[Kind::SampleType, Kind::Location, Kind::StringTable]);
const SAMPLE_FIELDS: FieldMask = FieldMask::of(&[Kind::Sample]);
const REMAINING_FIELDS: FieldMask = FieldMask::of(&[
    Kind::SampleType,
    Kind::Mapping,
    Kind::Location,
    Kind::DropFrames,
    Kind::KeepFrames,
    Kind::TimeNanos,
    Kind::DurationNanos,
    Kind::PeriodType,
    Kind::Period,
    Kind::Comment,
    Kind::DefaultSampleType,
]);
const FUNCTION_FIELDS: FieldMask = FieldMask::of(&[Kind::Function]);
const STRING_FIELDS: FieldMask = FieldMask::of(&[Kind::StringTable]);

/// What one successful call did, for logging.
#[derive(Clone, Copy, Debug, Default)]
struct RoundStats {
    emitted: usize,
    dropped_zero: usize,
    dropped_duplicate: usize,
}

/// The entities referenced by emitted samples, directly or transitively.
#[derive(Debug, Default)]
struct Referenced {
    locations: IdSet,
    functions: IdSet,
    strings: DenseBitSet,
    string_count: usize,
}

impl Referenced {
    fn clear(&mut self, string_count: usize) {
        self.locations.clear();
        self.functions.clear();
        self.strings.clear();
        self.string_count = string_count;
    }

    /// Offsets past the end of the table are ignored; they can't keep an
    /// entry alive.
    #[inline]
    fn string(&mut self, offset: StringOffset) {
        let index = usize::from(offset);
        if index < self.string_count {
            self.strings.insert(index);
        }
    }

    fn comment(&mut self, offset: i64) {
        if let Ok(index) = usize::try_from(offset) {
            if index < self.string_count {
                self.strings.insert(index);
            }
        }
    }
}

/// Converts a stream of cumulative pprof profiles into per-interval deltas.
///
/// Each call to [`DeltaComputer::delta`] scans the raw input several times,
/// each time looking only at the top-level fields it needs:
///
/// 1. sample types, locations and the string table are indexed;
/// 2. sample values are summed per series (stack plus label set);
/// 3. each series is resolved into one output sample, with delta columns
///    diffed against the previous round; all-zero samples are dropped;
/// 4. the remaining fields are copied, keeping only locations referenced by
///    an emitted sample, and the time and duration are derived;
/// 5. functions referenced by an emitted location are copied;
/// 6. the string table is copied with the same length, emptying every entry
///    nothing references.
///
/// The series state persists between calls. All scratch space is kept, so a
/// computer that has seen a few rounds stops allocating.
///
/// If a call fails, its partial updates are discarded at the start of the
/// next call by forgetting all series, so the next round is reported with
/// its full cumulative values.
#[derive(Debug)]
pub struct DeltaComputer {
    delta_value_types: Vec<DeltaValueType>,
    /// Type and unit hashes of `delta_value_types`.
    delta_hashes: Vec<(Hash128, Hash128)>,
    hasher: SeriesHasher,
    series: SeriesMap,
    round: u64,
    time_nanos: i64,
    broken: bool,

    sample_types: ArrayVec<ValueType, MAX_SAMPLE_TYPES>,
    delta_index: ArrayVec<Option<usize>, MAX_SAMPLE_TYPES>,
    locations: LocationIndex,
    string_hashes: Vec<Hash128>,
    referenced: Referenced,
    comments: Vec<i64>,
    sample: Sample,
    location: Location,
    encoder: Encoder,
}

impl DeltaComputer {
    pub fn new(delta_value_types: Vec<DeltaValueType>) -> Self {
        let mut hasher = SeriesHasher::new();
        let delta_hashes = delta_value_types
            .iter()
            .map(|value_type| {
                (
                    hasher.hash_bytes(value_type.r#type.as_bytes()),
                    hasher.hash_bytes(value_type.unit.as_bytes()),
                )
            })
            .collect();
        Self {
            delta_value_types,
            delta_hashes,
            hasher,
            series: SeriesMap::default(),
            round: 0,
            time_nanos: 0,
            broken: false,
            sample_types: ArrayVec::new(),
            delta_index: ArrayVec::new(),
            locations: LocationIndex::default(),
            string_hashes: Vec::new(),
            referenced: Referenced::default(),
            comments: Vec::new(),
            sample: Sample::default(),
            location: Location::default(),
            encoder: Encoder::new(),
        }
    }

    pub fn delta_value_types(&self) -> &[DeltaValueType] {
        &self.delta_value_types
    }

    /// The number of series whose state is kept between rounds.
    pub fn tracked_series(&self) -> usize {
        self.series.len()
    }

    /// Computes the delta of `profile` against the previous call and returns
    /// the encoded result, which is valid until the next call.
    ///
    /// # Errors
    ///
    /// Fails on malformed input, on more than [`MAX_SAMPLE_TYPES`] sample
    /// types or [`MAX_DELTA_VALUES`] delta columns, on references to strings
    /// or locations that don't exist, and if the computation panics. After an
    /// error, the next call starts from an empty series state.
    pub fn delta(&mut self, profile: &[u8]) -> Result<&[u8], DeltaError> {
        if self.broken {
            warn!(
                tracked_series = self.series.len(),
                "Previous delta computation failed, resetting series state"
            );
            self.reset();
        }

        // Cleared only once every pass has succeeded.
        self.broken = true;
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.compute(profile)))
            .unwrap_or_else(|payload| Err(DeltaError::from_panic(payload)));

        match result {
            Ok(stats) => {
                self.broken = false;
                debug!(
                    input_bytes = profile.len(),
                    output_bytes = self.encoder.len(),
                    emitted_samples = stats.emitted,
                    dropped_zero_samples = stats.dropped_zero,
                    dropped_duplicate_samples = stats.dropped_duplicate,
                    tracked_series = self.series.len(),
                    "Computed profile delta"
                );
                Ok(self.encoder.as_slice())
            }
            Err(err) => {
                error!(
                    error = %err,
                    input_bytes = profile.len(),
                    "Failed to compute profile delta"
                );
                Err(err)
            }
        }
    }

    /// Makes the next call start from an empty series state, as it does
    /// after a failed call.
    pub(crate) fn mark_broken(&mut self) {
        self.broken = true;
    }

    fn reset(&mut self) {
        self.series.clear();
        self.time_nanos = 0;
        self.hasher.reset();
        self.broken = false;
    }

    fn compute(&mut self, profile: &[u8]) -> Result<RoundStats, DeltaError> {
        self.round += 1;
        self.encoder.clear();
        self.comments.clear();

        self.build_index(profile)?;
        self.referenced.clear(self.string_hashes.len());
        self.aggregate_samples(profile)?;
        let stats = self.emit_samples(profile)?;
        self.write_remaining(profile)?;
        self.write_functions(profile)?;
        self.write_strings(profile)?;
        Ok(stats)
    }

    /// Pass 1: sample types, location addresses and string hashes, then the
    /// delta slot of each sample type.
    fn build_index(&mut self, profile: &[u8]) -> Result<(), DeltaError> {
        self.sample_types.clear();
        self.locations.clear();
        self.string_hashes.clear();

        let mut sample_type_count = 0;
        for field in ProfileDecoder::new(profile, INDEX_FIELDS) {
            match field? {
                ProfileField::SampleType(bytes) => {
                    sample_type_count += 1;
                    let value_type = ValueType::decode(bytes)?;
                    // Counted past the limit so the error reports the total.
                    _ = self.sample_types.try_push(value_type);
                }
                ProfileField::Location(bytes) => {
                    self.location.decode_from(bytes)?;
                    self.locations.insert(self.location.id, self.location.address);
                }
                ProfileField::StringTable(bytes) => {
                    let hash = self.hasher.hash_bytes(bytes);
                    self.string_hashes.push(hash);
                }
                _ => {}
            }
        }
        if sample_type_count > MAX_SAMPLE_TYPES {
            return Err(DeltaError::TooManySampleTypes {
                count: sample_type_count,
                max: MAX_SAMPLE_TYPES,
            });
        }
        if self.delta_hashes.len() > MAX_DELTA_VALUES {
            return Err(DeltaError::TooManyDeltaValues {
                count: self.delta_hashes.len(),
                max: MAX_DELTA_VALUES,
            });
        }

        self.delta_index.clear();
        let mut next_slot = 0;
        for value_type in &self.sample_types {
            let r#type = self.string_hash(value_type.r#type)?;
            let unit = self.string_hash(value_type.unit)?;
            let is_delta = self
                .delta_hashes
                .iter()
                .any(|(delta_type, delta_unit)| *delta_type == r#type && *delta_unit == unit);
            let slot = if is_delta {
                // A sample type may be declared twice, so a match can still
                // exceed the limit.
                if next_slot >= MAX_DELTA_VALUES {
                    return Err(DeltaError::TooManyDeltaValues {
                        count: next_slot + 1,
                        max: MAX_DELTA_VALUES,
                    });
                }
                next_slot += 1;
                Some(next_slot - 1)
            } else {
                None
            };
            _ = self.delta_index.try_push(slot);
        }
        Ok(())
    }

    fn string_hash(&self, offset: StringOffset) -> Result<Hash128, DeltaError> {
        self.string_hashes
            .get(usize::from(offset))
            .copied()
            .ok_or(DeltaError::StringIndexOutOfRange {
                index: u64::from(offset),
                len: self.string_hashes.len(),
            })
    }

    fn decode_sample(&mut self, bytes: &[u8]) -> Result<(), DeltaError> {
        self.sample.decode_from(bytes)?;
        if self.sample.values.len() != self.sample_types.len() {
            return Err(DeltaError::SampleValueCount {
                expected: self.sample_types.len(),
                actual: self.sample.values.len(),
            });
        }
        Ok(())
    }

    /// Pass 2: sums the values of every series, so duplicate samples of one
    /// series are counted together.
    fn aggregate_samples(&mut self, profile: &[u8]) -> Result<(), DeltaError> {
        for field in ProfileDecoder::new(profile, SAMPLE_FIELDS) {
            let ProfileField::Sample(bytes) = field? else {
                continue;
            };
            self.decode_sample(bytes)?;
            let key = self
                .hasher
                .series_key(&self.sample, &self.string_hashes, &self.locations)?;
            self.series.entry(key).or_default().add(&self.sample.values);
        }
        Ok(())
    }

    /// Pass 3: resolves each series once and writes the samples with a
    /// nonzero value.
    fn emit_samples(&mut self, profile: &[u8]) -> Result<RoundStats, DeltaError> {
        let mut stats = RoundStats::default();
        for field in ProfileDecoder::new(profile, SAMPLE_FIELDS) {
            let ProfileField::Sample(bytes) = field? else {
                continue;
            };
            self.decode_sample(bytes)?;
            let key = self
                .hasher
                .series_key(&self.sample, &self.string_hashes, &self.locations)?;
            let state = self.series.get_mut(&key).ok_or(DeltaError::UnknownSeries)?;
            if state.resolved_round == self.round {
                stats.dropped_duplicate += 1;
                continue;
            }
            state.resolved_round = self.round;
            state.resolve(&mut self.sample.values, &self.delta_index);

            if self.sample.values.iter().all(|value| *value == 0) {
                stats.dropped_zero += 1;
                continue;
            }
            for &id in &self.sample.location_ids {
                self.referenced.locations.insert(id);
            }
            for label in &self.sample.labels {
                self.referenced.string(label.key);
                self.referenced.string(label.str);
                self.referenced.string(label.num_unit);
            }
            self.encoder.encode_message(Kind::Sample.number(), &self.sample);
            stats.emitted += 1;
        }
        Ok(stats)
    }

    /// Pass 4: every other field except functions and strings. Locations are
    /// kept only if an emitted sample uses them. The input's time and
    /// duration are replaced by ones derived from the previous round.
    fn write_remaining(&mut self, profile: &[u8]) -> Result<(), DeltaError> {
        let mut time_nanos = 0;
        for field in ProfileDecoder::new(profile, REMAINING_FIELDS) {
            let field = field?;
            match field {
                ProfileField::SampleType(bytes) | ProfileField::PeriodType(bytes) => {
                    let value_type = ValueType::decode(bytes)?;
                    self.referenced.string(value_type.r#type);
                    self.referenced.string(value_type.unit);
                }
                ProfileField::Mapping(bytes) => {
                    let mapping = Mapping::decode(bytes)?;
                    self.referenced.string(mapping.filename);
                    self.referenced.string(mapping.build_id);
                }
                ProfileField::Location(bytes) => {
                    self.location.decode_from(bytes)?;
                    if !self.referenced.locations.contains(self.location.id) {
                        continue;
                    }
                    for line in &self.location.lines {
                        self.referenced.functions.insert(line.function_id);
                    }
                }
                ProfileField::DropFrames(offset)
                | ProfileField::KeepFrames(offset)
                | ProfileField::DefaultSampleType(offset) => self.referenced.string(offset),
                ProfileField::TimeNanos(nanos) => {
                    time_nanos = nanos;
                    continue;
                }
                ProfileField::DurationNanos(_) => continue,
                ProfileField::Comment(_) => {
                    let comments = &mut self.comments;
                    field.for_each_comment(|offset| comments.push(offset))?;
                    continue;
                }
                _ => {}
            }
            field.encode(&mut self.encoder);
        }

        for &offset in &self.comments {
            self.referenced.comment(offset);
        }
        self.encoder
            .encode_repeated_int64(Kind::Comment.number(), &self.comments);

        // A clock that stands still or goes backwards keeps the last time.
        let previous = self.time_nanos;
        let current = time_nanos.max(previous);
        let duration = if previous == 0 { 0 } else { current - previous };
        self.encoder.encode_int64_nonzero(Kind::TimeNanos.number(), current);
        self.encoder
            .encode_int64_nonzero(Kind::DurationNanos.number(), duration);
        self.time_nanos = current;
        Ok(())
    }

    /// Pass 5: functions used by an emitted location.
    fn write_functions(&mut self, profile: &[u8]) -> Result<(), DeltaError> {
        for field in ProfileDecoder::new(profile, FUNCTION_FIELDS) {
            let field = field?;
            let ProfileField::Function(bytes) = field else {
                continue;
            };
            let function = Function::decode(bytes)?;
            if self.referenced.functions.contains(function.id) {
                self.referenced.string(function.name);
                self.referenced.string(function.system_name);
                self.referenced.string(function.filename);
                field.encode(&mut self.encoder);
            }
        }
        Ok(())
    }

    /// Pass 6: the string table, same length and order, with unreferenced
    /// entries emptied. The first entry is always the empty string.
    fn write_strings(&mut self, profile: &[u8]) -> Result<(), DeltaError> {
        for (index, field) in ProfileDecoder::new(profile, STRING_FIELDS).enumerate() {
            let ProfileField::StringTable(bytes) = field? else {
                continue;
            };
            if index == 0 || self.referenced.strings.contains(index) {
                self.encoder.encode_bytes(Kind::StringTable.number(), bytes);
            } else {
                self.encoder.encode_bytes(Kind::StringTable.number(), &[]);
            }
        }
        Ok(())
    }
}

impl DeltaProfiler for DeltaComputer {
    fn delta(&mut self, profile: &[u8]) -> Result<&[u8], DeltaError> {
        DeltaComputer::delta(self, profile)
    }
}
