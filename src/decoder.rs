//! PCM decoder: base64 payloads of raw 16-bit little-endian mono samples
//! into normalized f32 buffers the transport can play.

use crate::engine::EngineContext;
use crate::error::DecodeError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use itertools::Itertools;
use std::sync::Arc;

/// Base64-encoded PCM as returned by the synthesis service.
/// Immutable once received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawAudioPayload(String);

impl RawAudioPayload {
    pub fn new(base64: impl Into<String>) -> Self {
        Self(base64.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the base64 form into raw PCM bytes.
    pub fn decode_bytes(&self) -> Result<Bytes, DecodeError> {
        if self.0.is_empty() {
            return Err(DecodeError::EmptyPayload);
        }

        let bytes = STANDARD.decode(&self.0)?;

        if bytes.is_empty() {
            return Err(DecodeError::EmptyPayload);
        }

        Ok(Bytes::from(bytes))
    }
}

/// Decoded, playable audio with samples normalized to [-1.0, 1.0].
/// Owned by the playback session that decoded it; replaced, never mutated.
#[derive(Clone, Debug)]
pub struct DecodedAudioBuffer {
    pub samples: Arc<Vec<f32>>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedAudioBuffer {
    /// Duration in source-audio seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decodes a payload into a playable buffer at the context's sample rate.
///
/// Every consecutive 2-byte group is one signed little-endian sample; a
/// trailing odd byte is discarded rather than treated as an error.
pub fn decode_audio_data(
    payload: &RawAudioPayload,
    context: &EngineContext,
) -> Result<DecodedAudioBuffer, DecodeError> {
    let bytes = payload.decode_bytes()?;

    let samples: Vec<f32> = bytes
        .iter()
        .copied()
        .tuples()
        .map(|(lo, hi)| i16::from_le_bytes([lo, hi]) as f32 / 32768.0)
        .collect();

    if samples.is_empty() {
        return Err(DecodeError::EmptyPayload);
    }

    Ok(DecodedAudioBuffer {
        samples: Arc::new(samples),
        channels: 1,
        sample_rate: context.sample_rate(),
    })
}
