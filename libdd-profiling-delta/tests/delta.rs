// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod common;

use common::*;
use libdd_profiling_delta::{
    CompressingDeltaComputer, DeltaComputer, DeltaConfig, DeltaError, DeltaProfiler,
    DeltaValueType, ProfileKind, ReferenceDeltaComputer,
};
use libdd_profiling_protobuf::prost_impls::{Mapping, Profile, Sample, ValueType};
use libdd_profiling_protobuf::DecodeError;
use prost::Message;

fn heap_computer() -> DeltaComputer {
    DeltaComputer::new(DeltaConfig::for_kind(ProfileKind::Heap).value_types)
}

#[test]
fn heap_delta() {
    let mut computer = heap_computer();

    let round1 = ProfileBuilder::heap()
        .sample(&["main"], &[3, 6, 12, 24])
        .encode();
    let output = decode(computer.delta(&round1).unwrap());
    assert_eq!(Some(vec![3, 6, 12, 24]), values_of(&output, &["main"]));

    let round2 = ProfileBuilder::heap()
        .sample(&["main"], &[4, 8, 16, 32])
        .encode();
    let output = decode(computer.delta(&round2).unwrap());
    assert_eq!(Some(vec![1, 2, 16, 32]), values_of(&output, &["main"]));
    assert_eq!(1, output.samples.len());
}

#[test]
fn zero_samples_are_omitted() {
    let mut computer = DeltaComputer::new(vec![
        DeltaValueType::new("alloc_objects", "count"),
        DeltaValueType::new("alloc_space", "bytes"),
    ]);
    let sample_types = [("alloc_objects", "count"), ("alloc_space", "bytes")];

    let round1 = ProfileBuilder::new(&sample_types)
        .sample(&["idle", "main"], &[1, 100])
        .sample(&["busy", "main"], &[1, 100])
        .encode();
    computer.delta(&round1).unwrap();

    let round2 = ProfileBuilder::new(&sample_types)
        .sample(&["idle", "main"], &[1, 100])
        .sample(&["busy", "main"], &[3, 300])
        .encode();
    let output = decode(computer.delta(&round2).unwrap());

    assert_eq!(1, output.samples.len());
    assert_eq!(Some(vec![2, 200]), values_of(&output, &["busy", "main"]));

    // Only the frames of the emitted sample remain.
    assert_eq!(2, output.locations.len());
    assert_eq!(2, output.functions.len());
    assert!(!output.string_table.iter().any(|s| s == "idle"));
    assert!(!output.string_table.iter().any(|s| s == "idle.go"));
    assert!(output.string_table.iter().any(|s| s == "busy"));
    assert!(output.string_table.iter().any(|s| s == "main.go"));
}

#[test]
fn snapshot_columns_keep_samples_alive() {
    let mut computer = heap_computer();
    let round = ProfileBuilder::heap()
        .sample(&["main"], &[5, 50, 1, 10])
        .encode();
    computer.delta(&round).unwrap();

    // Nothing was allocated, but memory is still in use.
    let output = decode(computer.delta(&round).unwrap());
    assert_eq!(Some(vec![0, 0, 1, 10]), values_of(&output, &["main"]));
}

#[test]
fn duplicate_samples_are_aggregated() {
    let mut computer = heap_computer();

    let round1 = ProfileBuilder::heap()
        .sample(&["main"], &[1, 10, 1, 10])
        .sample(&["main"], &[2, 20, 2, 20])
        .encode();
    let output = decode(computer.delta(&round1).unwrap());
    assert_eq!(1, output.samples.len());
    assert_eq!(Some(vec![3, 30, 3, 30]), values_of(&output, &["main"]));

    let round2 = ProfileBuilder::heap()
        .sample(&["main"], &[2, 20, 0, 0])
        .sample(&["main"], &[2, 20, 1, 10])
        .encode();
    let output = decode(computer.delta(&round2).unwrap());
    assert_eq!(1, output.samples.len());
    assert_eq!(Some(vec![1, 10, 1, 10]), values_of(&output, &["main"]));
}

#[test]
fn labels_split_series() {
    let mut computer = heap_computer();

    let round1 = ProfileBuilder::heap()
        .sample_with_labels(&["main"], &[("thread", "1")], &[1, 1, 0, 0])
        .sample_with_labels(&["main"], &[("thread", "2")], &[5, 5, 0, 0])
        .encode();
    computer.delta(&round1).unwrap();

    // The same series in a different order, plus a new label set.
    let round2 = ProfileBuilder::heap()
        .sample_with_labels(&["main"], &[("thread", "2")], &[6, 6, 0, 0])
        .sample_with_labels(&["main"], &[("thread", "1")], &[1, 1, 0, 0])
        .sample_with_labels(
            &["main"],
            &[("span", "a"), ("thread", "1")],
            &[7, 7, 0, 0],
        )
        .encode();
    let output = decode(computer.delta(&round2).unwrap());

    let mut values: Vec<_> = output
        .samples
        .iter()
        .map(|sample| sample.values.clone())
        .collect();
    values.sort();
    assert_eq!(values, [vec![1, 1, 0, 0], vec![7, 7, 0, 0]]);

    // Label strings of emitted samples are kept.
    for key in ["thread", "2", "span", "a"] {
        assert!(output.string_table.iter().any(|s| s == key), "{key}");
    }
}

#[test]
fn numeric_labels_split_series() {
    let mut computer = heap_computer();
    let round = |small: i64, large: i64| {
        let mut builder = ProfileBuilder::heap();
        builder.string("unused");
        builder
            .sample_with_num_labels(&["main"], &[("size", 64, "B")], &[small, small, 1, 1])
            .sample_with_num_labels(&["main"], &[("size", 128, "B")], &[large, large, 2, 2]);
        builder.encode()
    };

    let output = decode(computer.delta(&round(1, 2)).unwrap());
    assert_eq!(2, output.samples.len());
    assert_eq!(2, computer.tracked_series());

    let output = decode(computer.delta(&round(3, 2)).unwrap());
    let mut values: Vec<_> = output
        .samples
        .iter()
        .map(|sample| (sample.labels[0].num, sample.values.clone()))
        .collect();
    values.sort();
    assert_eq!(values, [(64, vec![2, 2, 1, 1]), (128, vec![0, 0, 2, 2])]);

    // The unit is only referenced as a num_unit, and still kept.
    for label in output.samples.iter().flat_map(|sample| &sample.labels) {
        assert_eq!("size", output.string_table[label.key as usize]);
        assert_eq!("B", output.string_table[label.num_unit as usize]);
    }
    assert!(!output.string_table.iter().any(|s| s == "unused"));
}

#[test]
fn string_table_length_is_preserved() {
    let mut computer = heap_computer();
    let round1 = ProfileBuilder::heap()
        .sample(&["a"], &[1, 1, 0, 0])
        .sample(&["b"], &[1, 1, 0, 0])
        .encode();
    let input_len = decode(&round1).string_table.len();

    for _ in 0..3 {
        let output = decode(computer.delta(&round1).unwrap());
        assert_eq!(input_len, output.string_table.len());
        assert_eq!("", output.string_table[0]);
    }

    // Repeated rounds have no samples left, yet every sample type string is
    // still there.
    let output = decode(computer.delta(&round1).unwrap());
    assert!(output.samples.is_empty());
    for (r#type, unit) in HEAP_SAMPLE_TYPES {
        assert!(output.string_table.iter().any(|s| s == r#type));
        assert!(output.string_table.iter().any(|s| s == unit));
    }
    assert!(!output.string_table.iter().any(|s| s == "a"));
}

#[test]
fn duration_nanos() {
    let mut computer = heap_computer();
    let mut builder = ProfileBuilder::heap();
    builder.sample(&["main"], &[1, 1, 1, 1]);

    let output = decode(computer.delta(&builder.time_nanos(1_000).encode()).unwrap());
    assert_eq!(1_000, output.time_nanos);
    assert_eq!(0, output.duration_nanos);

    let output = decode(computer.delta(&builder.time_nanos(61_000).encode()).unwrap());
    assert_eq!(61_000, output.time_nanos);
    assert_eq!(60_000, output.duration_nanos);

    let output = decode(computer.delta(&builder.time_nanos(121_500).encode()).unwrap());
    assert_eq!(60_500, output.duration_nanos);
}

#[test]
fn metadata_is_kept() {
    let mut builder = ProfileBuilder::heap();
    builder.sample(&["main"], &[1, 1, 1, 1]);
    let period_type = ValueType {
        r#type: builder.string("space"),
        unit: builder.string("bytes"),
    };
    let comment = builder.string("a comment");
    let drop_frames = builder.string("runtime\\..*");
    let keep_frames = builder.string("main\\..*");
    let default_sample_type = builder.string("default_type");
    let mapping = Mapping {
        id: 1,
        filename: builder.string("/usr/bin/app"),
        build_id: builder.string("4f0e2b1c"),
        has_functions: true,
        ..Default::default()
    };
    let mut profile = builder.build();
    profile.period_type = Some(period_type);
    profile.period = 524_288;
    profile.comment = vec![comment];
    profile.drop_frames = drop_frames;
    profile.keep_frames = keep_frames;
    profile.default_sample_type = default_sample_type;
    profile.mappings = vec![mapping];
    profile.locations[0].mapping_id = 1;

    let mut computer = heap_computer();
    let output = decode(computer.delta(&profile.encode_to_vec()).unwrap());

    assert_eq!(output.period, 524_288);
    assert_eq!(output.period_type, Some(period_type));
    assert_eq!(output.comment, [comment]);
    assert_eq!(output.drop_frames, drop_frames);
    assert_eq!(output.keep_frames, keep_frames);
    assert_eq!(output.default_sample_type, default_sample_type);
    assert_eq!(output.mappings, [mapping]);
    assert_eq!(output.locations[0].mapping_id, 1);
    let string = |offset: i64| output.string_table[offset as usize].as_str();
    assert_eq!("space", string(period_type.r#type));
    assert_eq!("a comment", string(comment));
    assert_eq!("runtime\\..*", string(drop_frames));
    assert_eq!("main\\..*", string(keep_frames));
    assert_eq!("default_type", string(default_sample_type));
    assert_eq!("/usr/bin/app", string(mapping.filename));
    assert_eq!("4f0e2b1c", string(mapping.build_id));
}

#[test]
fn broken_round_resets_state() {
    let round1 = ProfileBuilder::heap()
        .sample(&["main"], &[1, 10, 1, 10])
        .time_nanos(100)
        .encode();
    let round3 = ProfileBuilder::heap()
        .sample(&["main"], &[4, 40, 2, 20])
        .sample(&["worker", "main"], &[1, 1, 1, 1])
        .time_nanos(300)
        .encode();

    // Truncated in the middle of the time varint, which comes last.
    let mut truncated = ProfileBuilder::heap()
        .sample(&["main"], &[2, 20, 1, 10])
        .time_nanos(200)
        .encode();
    truncated.pop();

    // Fails while aggregating, after "main" was already summed.
    let mut partial = ProfileBuilder::heap()
        .sample(&["main"], &[2, 20, 1, 10])
        .time_nanos(200)
        .build();
    partial.samples.push(Sample {
        location_ids: vec![1],
        values: vec![1, 2, 3],
        labels: vec![],
    });
    let partial = partial.encode_to_vec();

    for broken in [truncated, partial] {
        let mut computer = heap_computer();
        computer.delta(&round1).unwrap();
        assert!(computer.delta(&broken).is_err());

        let after_failure = computer.delta(&round3).unwrap().to_vec();
        let mut fresh = heap_computer();
        assert_eq!(after_failure, fresh.delta(&round3).unwrap());
        assert_eq!(2, computer.tracked_series());

        let output = decode(&after_failure);
        assert_eq!(Some(vec![4, 40, 2, 20]), values_of(&output, &["main"]));
        assert_eq!(0, output.duration_nanos);
    }
}

#[test]
fn errors() {
    let mut computer = heap_computer();

    let too_many_types = ProfileBuilder::new(&[
        ("a", "count"),
        ("b", "count"),
        ("c", "count"),
        ("d", "count"),
        ("e", "count"),
    ])
    .encode();
    assert!(matches!(
        computer.delta(&too_many_types),
        Err(DeltaError::TooManySampleTypes { count: 5, max: 4 })
    ));

    let mut too_many_deltas = DeltaComputer::new(vec![
        DeltaValueType::new("a", "count"),
        DeltaValueType::new("b", "count"),
        DeltaValueType::new("c", "count"),
    ]);
    assert!(matches!(
        too_many_deltas.delta(&ProfileBuilder::heap().encode()),
        Err(DeltaError::TooManyDeltaValues { count: 3, max: 2 })
    ));

    let mut bad_label = ProfileBuilder::heap()
        .sample_with_labels(&["main"], &[("k", "v")], &[1, 1, 1, 1])
        .build();
    bad_label.samples[0].labels[0].str = 1_000;
    assert!(matches!(
        computer.delta(&bad_label.encode_to_vec()),
        Err(DeltaError::StringIndexOutOfRange { index: 1_000, .. })
    ));

    assert!(matches!(
        computer.delta(&[0x0a, 0x05, 0x08]),
        Err(DeltaError::Decode(DecodeError::UnexpectedEof))
    ));

    // Field 15 isn't part of a profile.
    assert!(matches!(
        computer.delta(&[0x78, 0x01]),
        Err(DeltaError::Decode(DecodeError::UnknownField { field: 15, .. }))
    ));

    // The computer still works afterwards.
    let output = decode(
        computer
            .delta(&ProfileBuilder::heap().sample(&["main"], &[1, 1, 1, 1]).encode())
            .unwrap(),
    );
    assert_eq!(Some(vec![1, 1, 1, 1]), values_of(&output, &["main"]));
}

#[test]
fn arbitrary_input_leaves_computer_usable() {
    let valid = ProfileBuilder::heap()
        .sample(&["main"], &[1, 1, 1, 1])
        .encode();
    let expected = heap_computer().delta(&valid).unwrap().to_vec();

    bolero::check!()
        .with_type::<Vec<u8>>()
        .for_each(|bytes| {
            let mut computer = heap_computer();
            if computer.delta(bytes).is_err() {
                assert_eq!(expected, computer.delta(&valid).unwrap());
            }
        });
}

#[test]
fn unpacked_input() {
    // A sample with its location ids and values written one field each.
    let mut builder = ProfileBuilder::new(&[("alloc_space", "bytes")]);
    builder.sample(&["main"], &[0]);
    let mut profile = builder.build();
    profile.samples.clear();
    let mut bytes = profile.encode_to_vec();
    // Sample { location_id: 1, value: 42 }, unpacked.
    bytes.extend_from_slice(&[0x12, 0x04, 0x08, 0x01, 0x10, 0x2a]);

    let mut computer = DeltaComputer::new(vec![]);
    let output = decode(computer.delta(&bytes).unwrap());
    assert_eq!(Some(vec![42]), values_of(&output, &["main"]));
}

#[test]
fn gzip_adapter() {
    use flate2::read::GzDecoder;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Read, Write};

    let gunzip = |bytes: &[u8]| {
        let mut out = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut out).unwrap();
        decode(&out)
    };
    let gzip = |bytes: &[u8]| {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    };

    let mut computer = CompressingDeltaComputer::new(heap_delta_types());
    let round1 = ProfileBuilder::heap()
        .sample(&["main"], &[3, 6, 12, 24])
        .encode();
    let round2 = ProfileBuilder::heap()
        .sample(&["main"], &[4, 8, 16, 32])
        .encode();

    computer.delta(&gzip(&round1)).unwrap();
    // Uncompressed input is accepted too.
    let output = gunzip(computer.delta(&round2).unwrap());
    assert_eq!(Some(vec![1, 2, 16, 32]), values_of(&output, &["main"]));
}

#[test]
fn profilers_are_interchangeable() {
    let round1 = ProfileBuilder::heap()
        .sample(&["main"], &[3, 6, 12, 24])
        .encode();
    let round2 = ProfileBuilder::heap()
        .sample(&["main"], &[4, 8, 16, 32])
        .encode();

    let mut profilers: Vec<Box<dyn DeltaProfiler>> = vec![
        Box::new(DeltaComputer::new(heap_delta_types())),
        Box::new(ReferenceDeltaComputer::new(heap_delta_types())),
    ];
    for profiler in &mut profilers {
        profiler.delta(&round1).unwrap();
        let output = Profile::decode(profiler.delta(&round2).unwrap()).unwrap();
        assert_eq!(Some(vec![1, 2, 16, 32]), values_of(&output, &["main"]));
    }
}
