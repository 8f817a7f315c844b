//! WAV container builder.
//!
//! Serializes a raw PCM payload into a self-contained WAV byte stream for
//! download, independent of the playback engine. Deterministic: the same
//! payload always yields byte-identical output.

use crate::constants::{BIT_DEPTH, CHANNELS, SAMPLE_RATE};
use crate::decoder::RawAudioPayload;
use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use itertools::Itertools;
use std::io::Cursor;

/// A complete WAV file: the canonical 44-byte RIFF/WAVE/fmt/data header
/// followed by the PCM data, never mutated after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WavContainer {
    data: Vec<u8>,
}

impl WavContainer {
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Builds a WAV container around a payload: mono, 16-bit, 24000 Hz.
///
/// A trailing odd byte in the payload is discarded, exactly as the
/// decoder discards it.
pub fn create_wav(payload: &RawAudioPayload) -> Result<WavContainer> {
    let bytes = payload.decode_bytes().context("Invalid audio payload")?;

    let spec = WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: BIT_DEPTH,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());

    {
        let mut writer =
            WavWriter::new(&mut cursor, spec).context("Failed to start WAV container")?;

        for (lo, hi) in bytes.iter().copied().tuples() {
            writer.write_sample(i16::from_le_bytes([lo, hi]))?;
        }

        writer
            .finalize()
            .context("Failed to finalize WAV container")?;
    }

    Ok(WavContainer {
        data: cursor.into_inner(),
    })
}
