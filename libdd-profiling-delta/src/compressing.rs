// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{DeltaComputer, DeltaError, DeltaProfiler, DeltaValueType};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Read, Write};
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[inline]
fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// A [`DeltaComputer`] for gzip-compressed profiles, which is how runtimes
/// usually write them. Input is decompressed if it starts with the gzip
/// magic bytes and used as is otherwise; output is always compressed.
///
/// The decompression and output buffers are kept between calls.
#[derive(Debug)]
pub struct CompressingDeltaComputer {
    computer: DeltaComputer,
    compression: Compression,
    decompressed: Vec<u8>,
    output: Vec<u8>,
}

impl CompressingDeltaComputer {
    pub fn new(delta_value_types: Vec<DeltaValueType>) -> Self {
        Self::with_compression(delta_value_types, Compression::default())
    }

    pub fn with_compression(
        delta_value_types: Vec<DeltaValueType>,
        compression: Compression,
    ) -> Self {
        Self {
            computer: DeltaComputer::new(delta_value_types),
            compression,
            decompressed: Vec::new(),
            output: Vec::new(),
        }
    }

    pub fn computer(&self) -> &DeltaComputer {
        &self.computer
    }

    /// Same as [`DeltaComputer::delta`], with gzip on both ends.
    ///
    /// # Errors
    ///
    /// Fails if the input is gzip but can't be decompressed, if compression
    /// fails, or if the wrapped computer fails.
    pub fn delta(&mut self, profile: &[u8]) -> Result<&[u8], DeltaError> {
        let input = if is_gzip(profile) {
            self.decompressed.clear();
            GzDecoder::new(profile).read_to_end(&mut self.decompressed)?;
            self.decompressed.as_slice()
        } else {
            debug!(input_bytes = profile.len(), "Profile is not gzip compressed");
            profile
        };

        let delta = self.computer.delta(input)?;

        self.output.clear();
        if let Err(err) = compress(delta, &mut self.output, self.compression) {
            // The series baselines already include this round, whose output
            // is lost.
            self.computer.mark_broken();
            return Err(err.into());
        }
        Ok(self.output.as_slice())
    }
}

fn compress(bytes: &[u8], output: &mut Vec<u8>, compression: Compression) -> io::Result<()> {
    let mut encoder = GzEncoder::new(output, compression);
    encoder.write_all(bytes)?;
    encoder.finish()?;
    Ok(())
}

impl DeltaProfiler for CompressingDeltaComputer {
    fn delta(&mut self, profile: &[u8]) -> Result<&[u8], DeltaError> {
        CompressingDeltaComputer::delta(self, profile)
    }
}
