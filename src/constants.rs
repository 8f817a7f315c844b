use std::time::Duration;

// Define some constants for the audio parameters
pub const SAMPLE_RATE: u32 = 24000; // 24 kHz, the synthesis service's fixed output rate
pub const BIT_DEPTH: u16 = 16; // 16 bits per sample
pub const CHANNELS: u16 = 1; // Mono channel

/// FFT size of the frequency analyser attached to the engine output.
/// Exposes FFT_SIZE / 2 frequency bins to the visualizer.
pub const ANALYSER_FFT_SIZE: usize = 256;

/// Upper bound the synthesis service places on a single request.
pub const MAX_TEXT_LEN: usize = 500;

/// Rolling generation history keeps at most this many entries.
pub const HISTORY_CAPACITY: usize = 10;

/// How often the transport checks whether playback ran past the end of
/// the loaded buffer.
pub const FINISH_POLL_INTERVAL: Duration = Duration::from_millis(200);

// Playback rate slider bounds
pub const MIN_PLAYBACK_RATE: f64 = 0.5;
pub const MAX_PLAYBACK_RATE: f64 = 2.0;

/// Target number of samples per output chunk (~21ms at 24 kHz).
pub const TARGET_CHUNK_SIZE: usize = 512;
